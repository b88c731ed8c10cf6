// src/main.rs
use std::fs;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use tokio_util::sync::CancellationToken;

use notion_vault_extractor::{
    CommandLineInput, ExtractConfig, ExtractOptions, ExtractorOrchestrator, FsSink, LoggingProgress,
    NotionHttpClient, NullViewManifest, ProgressReporter, Sink, ViewManifest, YamlViewManifest,
};

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("notion_vault_extractor.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn load_view_manifest(config: &ExtractConfig) -> Result<Arc<dyn ViewManifest>, Box<dyn std::error::Error>> {
    match &config.view_manifest {
        Some(path) => Ok(Arc::new(YamlViewManifest::load(path)?)),
        None => Ok(Arc::new(NullViewManifest)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();
    setup_logging(cli.verbose)?;

    let config = ExtractConfig::resolve(cli)?;
    let cancel = CancellationToken::new();

    let client = NotionHttpClient::new(&config.api_key)?;
    let sink: Arc<dyn Sink> = Arc::new(FsSink::new(&config.workspace));
    let progress: Arc<dyn ProgressReporter> = Arc::new(LoggingProgress);
    let view_manifest = load_view_manifest(&config)?;

    let mut orchestrator =
        ExtractorOrchestrator::new(client, sink, progress, view_manifest, &config.workspace)?;

    let options = ExtractOptions {
        database_ids: config.database_ids.clone(),
        page_ids: config.page_ids.clone(),
        include_content: config.include_content,
        max_depth: config.max_depth,
    };

    if config.dry_run {
        let report = orchestrator.dry_run(&cancel, &options).await?;
        println!(
            "Would extract {} database(s) and {} page(s):",
            report.databases.len(),
            report.pages.len()
        );
        for db in &report.databases {
            println!("  [database] {} — {}", db.notion_id, db.title);
        }
        for page in &report.pages {
            println!("  [page] {} — {}", page.notion_id, page.title);
        }
        return Ok(());
    }

    let stats = orchestrator.run(&cancel, &options).await?;
    println!(
        "Extracted {} page(s), {} database(s), {} record(s), {} asset(s) in {:.2}s ({} error(s))",
        stats.pages, stats.databases, stats.records, stats.assets, stats.duration_secs, stats.errors
    );

    Ok(())
}
