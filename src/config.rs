// src/config.rs
use std::path::PathBuf;

use clap::Parser;

use crate::error::AppError;
use crate::types::{ApiKey, NotionId};

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Directory the extracted workspace is written to.
    #[arg(short = 'o', long, default_value = ".notion-vault")]
    pub workspace: String,

    /// Explicit database id or URL to extract (repeatable). When neither
    /// this nor `--page` is given, every database/page the API key can see
    /// is discovered via search.
    #[arg(long = "database")]
    pub database_ids: Vec<String>,

    /// Explicit page id or URL to extract (repeatable).
    #[arg(long = "page")]
    pub page_ids: Vec<String>,

    /// Maximum block recursion depth for standalone pages (unset = unlimited).
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Skip fetching and rendering each page's block content; only the
    /// node manifest and database records are written.
    #[arg(long, default_value_t = false)]
    pub no_content: bool,

    /// Discover and report what would be extracted without writing anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Path to a YAML manifest of per-database presentation views.
    #[arg(long)]
    pub view_manifest: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Number of concurrent API workers (default: auto, max 32).
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Resolved, validated configuration driving one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub api_key: ApiKey,
    pub workspace: PathBuf,
    pub database_ids: Vec<NotionId>,
    pub page_ids: Vec<NotionId>,
    pub max_depth: Option<u32>,
    pub include_content: bool,
    pub dry_run: bool,
    pub view_manifest: Option<PathBuf>,
    #[allow(dead_code)] // read by the bin target's logging setup
    pub verbose: bool,
    pub concurrency: Option<usize>,
}

impl ExtractConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let api_key_str = std::env::var("NOTION_API_KEY").map_err(|_| {
            AppError::MissingConfiguration("NOTION_API_KEY environment variable not set".to_string())
        })?;
        let api_key = ApiKey::new(api_key_str)?;

        let database_ids = cli
            .database_ids
            .iter()
            .map(|raw| NotionId::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let page_ids = cli
            .page_ids
            .iter()
            .map(|raw| NotionId::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            api_key,
            workspace: PathBuf::from(cli.workspace),
            database_ids,
            page_ids,
            max_depth: cli.max_depth,
            include_content: !cli.no_content,
            dry_run: cli.dry_run,
            view_manifest: cli.view_manifest.map(PathBuf::from),
            verbose: cli.verbose,
            concurrency: cli.concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(workspace: &str) -> CommandLineInput {
        CommandLineInput {
            workspace: workspace.to_string(),
            database_ids: Vec::new(),
            page_ids: Vec::new(),
            max_depth: None,
            no_content: false,
            dry_run: false,
            view_manifest: None,
            verbose: false,
            concurrency: None,
        }
    }

    #[test]
    fn resolve_requires_api_key_env_var() {
        std::env::remove_var("NOTION_API_KEY");
        let result = ExtractConfig::resolve(cli(".out"));
        assert!(matches!(result, Err(AppError::MissingConfiguration(_))));
    }

    #[test]
    fn resolve_parses_explicit_ids() {
        std::env::set_var("NOTION_API_KEY", "secret_abcdefghijklmnopqrs");
        let mut input = cli(".out");
        input.database_ids = vec!["550e8400e29b41d4a716446655440000".to_string()];
        let config = ExtractConfig::resolve(input).unwrap();
        assert_eq!(config.database_ids.len(), 1);
        std::env::remove_var("NOTION_API_KEY");
    }
}
