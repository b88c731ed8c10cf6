// src/lib.rs
//! notion-vault-extractor — a one-shot importer that turns a Notion
//! workspace into a local, durable, Notion-independent store of markdown
//! pages and database records.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `AppError`, `ValidationError`, `NotionErrorCode`
//! - **Configuration** — `ExtractConfig`, `CommandLineInput`
//! - **Domain model** — `Node`, `Record`, `Property`, `Block`, etc.
//! - **Domain types** — `NotionId`, `NodeId`, `ApiKey`, `BlockId`, `PageId`, etc.
//! - **API client** — `NotionHttpClient`
//! - **Orchestration** — `ExtractorOrchestrator`, `ExtractOptions`, `ExtractStats`
//! - **Collaborator traits** — `Sink`, `ProgressReporter`, `ViewManifest`

mod api;
mod assets;
mod config;
mod error;
mod mapper;
mod markdown;
mod model;
mod orchestrator;
mod progress;
mod sink;
mod types;
mod view_manifest;

// --- Error handling ---
pub use crate::error::{AppError, DatabaseFetchFailure, NotionErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, ExtractConfig};

// --- Domain model ---
pub use crate::model::{
    Block, BlockPayload, CalloutBlock, ChildRefBlock, CodeBlock, EquationBlock, FormulaConfig,
    FormulaValue, LinkBlock, MediaBlock, Node, NodeKind, Property, PropertyType, PropertyValue,
    Record, RelationConfig, RollupArrayItem, RollupConfig, RollupValue, SyncedBlockPayload,
    TableBlock, TableRowBlock, TextBlock, ToDoBlock, View, ViewType,
};

// --- Domain types ---
pub use crate::types::{
    ApiKey, BlockId, Color, DatabaseId, NodeId, NodeIdGenerator, NotionId, PageId, PropertyName,
    RichTextSpan, SelectOption,
};

// --- API client ---
pub use crate::api::{NotionHttpClient, QueryOptions, SearchFilter};

// --- Asset downloading ---
pub use crate::assets::{AssetDownloader, AssetStats};

// --- Block-to-markdown conversion ---
pub use crate::markdown::{render_rich_text, MarkdownRenderer};

// --- ID mapping ---
pub use crate::mapper::IdMapper;

// --- Orchestration ---
pub use crate::orchestrator::{DiscoveredEntity, DryRunReport, ExtractOptions, ExtractStats, ExtractorOrchestrator};

// --- Collaborator traits ---
pub use crate::progress::{LoggingProgress, NoOpProgress, ProgressReporter};
pub use crate::sink::{FsSink, Sink};
pub use crate::view_manifest::{NullViewManifest, ViewManifest, YamlViewManifest};
