//! Extractor orchestrator: composes the client, mapper, downloader, and
//! converter into the end-to-end import, in the strict phase order bootstrap
//! → discover → pre-assign ids → materialize databases → materialize pages →
//! finalize (spec §4.5).

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::api::types::{
    RawDatabase, RawFormulaConfig, RawNumberFormat, RawPage, RawParent, RawPropertySchema,
    RawPropertyValue, RawSelectConfig,
};
use crate::api::{NotionHttpClient, QueryOptions, SearchFilter};
use crate::assets::AssetDownloader;
use crate::error::{classify_database_fetch_failure, AppError, DatabaseFetchFailure};
use crate::mapper::{page_title, plain_text, IdMapper};
use crate::markdown::MarkdownRenderer;
use crate::model::{Block, BlockPayload};
use crate::progress::ProgressReporter;
use crate::sink::Sink;
use crate::types::{BlockId, DatabaseId, NotionId, PageId};
use crate::view_manifest::ViewManifest;

/// What to extract and how deep to go (spec §4.5 input).
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Explicit database ids. Empty means "discover via search".
    pub database_ids: Vec<NotionId>,
    /// Explicit page ids. Empty means "discover via search".
    pub page_ids: Vec<NotionId>,
    /// Whether to fetch and render each standalone page's block tree.
    pub include_content: bool,
    /// `None` means unlimited recursion depth.
    pub max_depth: Option<u32>,
}

/// Output stats (spec §4.5 output).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStats {
    pub pages: u64,
    pub databases: u64,
    pub records: u64,
    pub assets: u64,
    pub errors: u64,
    pub duration_secs: f64,
}

/// One entity `dry_run` discovered but did not materialize.
#[derive(Debug, Clone)]
pub struct DiscoveredEntity {
    pub notion_id: NotionId,
    pub title: String,
}

/// Structured report for the dry-run variant (spec §4.5, supplemented per
/// SPEC_FULL.md §B — no filesystem writes, no asset downloads).
#[derive(Debug, Clone, Default)]
pub struct DryRunReport {
    pub databases: Vec<DiscoveredEntity>,
    pub pages: Vec<DiscoveredEntity>,
}

pub struct ExtractorOrchestrator {
    client: NotionHttpClient,
    sink: Arc<dyn Sink>,
    progress: Arc<dyn ProgressReporter>,
    view_manifest: Arc<dyn ViewManifest>,
    downloader: Arc<AssetDownloader>,
    mapper: IdMapper,
    imported: HashSet<String>,
    #[allow(dead_code)]
    workspace_root: PathBuf,
}

impl ExtractorOrchestrator {
    pub fn new(
        client: NotionHttpClient,
        sink: Arc<dyn Sink>,
        progress: Arc<dyn ProgressReporter>,
        view_manifest: Arc<dyn ViewManifest>,
        workspace_root: impl Into<PathBuf>,
    ) -> Result<Self, AppError> {
        let workspace_root = workspace_root.into();
        let downloader = Arc::new(AssetDownloader::new(&workspace_root)?);
        Ok(Self {
            client,
            sink,
            progress,
            view_manifest,
            downloader,
            mapper: IdMapper::new(),
            imported: HashSet::new(),
            workspace_root,
        })
    }

    /// Phase 2 only, no writes, no downloads (spec §4.5 dry-run variant).
    pub async fn dry_run(
        &self,
        cancel: &CancellationToken,
        options: &ExtractOptions,
    ) -> Result<DryRunReport, AppError> {
        let (databases, pages) = self.discover(cancel, options).await?;
        let databases = databases
            .iter()
            .map(|db| {
                Ok(DiscoveredEntity {
                    notion_id: NotionId::parse(&db.id)?,
                    title: plain_text(&db.title),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        let pages = pages
            .iter()
            .map(|page| {
                Ok(DiscoveredEntity {
                    notion_id: NotionId::parse(&page.id)?,
                    title: page_title(page),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(DryRunReport { databases, pages })
    }

    /// Runs the full six-phase extraction.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        options: &ExtractOptions,
    ) -> Result<ExtractStats, AppError> {
        let start = Instant::now();
        let mut stats = ExtractStats::default();

        // 1. Bootstrap.
        self.sink.ensure_workspace().await?;
        let persisted = self.sink.load_id_mapping().await?;
        self.mapper.seed(persisted);
        self.sink.clear_nodes_manifest().await?;
        self.imported.clear();

        // 2. Discover.
        let (databases, pages) = self.discover(cancel, options).await?;
        self.progress.on_start(databases.len() + pages.len());

        // 3. Pre-assign IDs.
        for db in &databases {
            let notion_id = NotionId::parse(&db.id)?;
            self.mapper.assign_node_id(&notion_id);
        }
        for page in &pages {
            let notion_id = NotionId::parse(&page.id)?;
            self.mapper.assign_node_id(&notion_id);
        }

        // 4. Materialize databases.
        self.materialize_databases(cancel, databases, &mut stats).await?;

        // 5. Materialize standalone pages.
        for page in &pages {
            let notion_id = NotionId::parse(&page.id)?;
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            self.materialize_page_recursive(cancel, &notion_id, options, &mut stats)
                .await?;
        }

        // 6. Finalize.
        let asset_stats = self.downloader.stats();
        stats.assets = asset_stats.downloaded;
        self.sink.save_id_mapping(&self.mapper.mapping_snapshot()).await?;
        stats.duration_secs = start.elapsed().as_secs_f64();
        self.progress.on_complete(&stats);

        Ok(stats)
    }

    async fn discover(
        &self,
        cancel: &CancellationToken,
        options: &ExtractOptions,
    ) -> Result<(Vec<RawDatabase>, Vec<RawPage>), AppError> {
        if !options.database_ids.is_empty() || !options.page_ids.is_empty() {
            return self.discover_explicit(cancel, options).await;
        }
        self.discover_via_search(cancel).await
    }

    /// Explicit IDs: fetch failures here are fatal (spec §7 propagation policy).
    async fn discover_explicit(
        &self,
        cancel: &CancellationToken,
        options: &ExtractOptions,
    ) -> Result<(Vec<RawDatabase>, Vec<RawPage>), AppError> {
        let mut databases = Vec::with_capacity(options.database_ids.len());
        for notion_id in &options.database_ids {
            let db_id = DatabaseId::parse(notion_id.as_str())?;
            databases.push(self.fetch_database_with_fallback(cancel, &db_id).await?);
        }

        let mut pages = Vec::with_capacity(options.page_ids.len());
        for notion_id in &options.page_ids {
            let page_id = PageId::parse(notion_id.as_str())?;
            pages.push(self.client.get_page(cancel, &page_id).await?);
        }

        Ok((databases, pages))
    }

    /// Broad search: per-item failures are warnings, extraction continues
    /// (spec §7 propagation policy).
    async fn discover_via_search(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Vec<RawDatabase>, Vec<RawPage>), AppError> {
        let mut databases = Vec::new();
        let database_hits = self.client.search_all(cancel, None, SearchFilter::Database).await?;
        for hit in database_hits {
            let db_id = match DatabaseId::parse(&hit.id) {
                Ok(id) => id,
                Err(e) => {
                    self.progress.on_warning(&format!("skipping database {}: {}", hit.id, e));
                    continue;
                }
            };
            match self.fetch_database_with_fallback(cancel, &db_id).await {
                Ok(db) => databases.push(db),
                Err(e) => self.progress.on_warning(&format!("database {} fetch failed: {}", hit.id, e)),
            }
        }

        let mut pages = Vec::new();
        let page_hits = self.client.search_all(cancel, None, SearchFilter::Page).await?;
        for hit in page_hits {
            let page_id = match PageId::parse(&hit.id) {
                Ok(id) => id,
                Err(e) => {
                    self.progress.on_warning(&format!("skipping page {}: {}", hit.id, e));
                    continue;
                }
            };
            match self.client.get_page(cancel, &page_id).await {
                Ok(page) => {
                    // Pages whose parent is a database are rows, processed
                    // as part of that database's materialization instead.
                    if !matches!(page.parent, RawParent::DatabaseId { .. }) {
                        pages.push(page);
                    }
                }
                Err(e) => self.progress.on_warning(&format!("page {} fetch failed: {}", hit.id, e)),
            }
        }

        Ok((databases, pages))
    }

    /// `GET /databases/{id}`, falling back to inferring a schema from
    /// `query_database_all` when Notion reports the id as a linked database
    /// (SPEC_FULL.md §B).
    async fn fetch_database_with_fallback(
        &self,
        cancel: &CancellationToken,
        id: &DatabaseId,
    ) -> Result<RawDatabase, AppError> {
        match self.client.get_database(cancel, id).await {
            Ok(db) => Ok(db),
            Err(e) => match classify_database_fetch_failure(&e) {
                DatabaseFetchFailure::LinkedDatabase => self.infer_linked_database(cancel, id).await,
                _ => Err(e),
            },
        }
    }

    async fn infer_linked_database(
        &self,
        cancel: &CancellationToken,
        id: &DatabaseId,
    ) -> Result<RawDatabase, AppError> {
        let rows = self
            .client
            .query_database_all(cancel, id, &QueryOptions::default())
            .await?;

        let mut properties = IndexMap::new();
        if let Some(first) = rows.first() {
            for (name, value) in &first.properties {
                properties.insert(name.clone(), infer_schema_from_value(value));
            }
        }

        let (created_time, last_edited_time, parent) = match rows.first() {
            Some(row) => (row.created_time.clone(), row.last_edited_time.clone(), row.parent.clone()),
            None => (
                "1970-01-01T00:00:00.000Z".to_string(),
                "1970-01-01T00:00:00.000Z".to_string(),
                RawParent::Workspace,
            ),
        };

        log::warn!("database {} is a linked database; inferring schema from {} row(s)", id, rows.len());

        Ok(RawDatabase {
            id: id.as_str().to_string(),
            created_time,
            last_edited_time,
            icon: None,
            cover: None,
            parent,
            title: Vec::new(),
            properties,
        })
    }

    /// Loop 1 fetches every database's rows and pre-assigns row-level
    /// NodeIds across *all* databases before loop 2 maps any of them. This
    /// avoids a same-named relation property in a later database clobbering
    /// `pending_relations` before an earlier database's `resolve_relations`
    /// call runs (see DESIGN.md).
    async fn materialize_databases(
        &mut self,
        cancel: &CancellationToken,
        databases: Vec<RawDatabase>,
        stats: &mut ExtractStats,
    ) -> Result<(), AppError> {
        let mut staged = Vec::with_capacity(databases.len());
        for db in databases {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            let db_id = DatabaseId::parse(&db.id)?;
            let rows = match self
                .client
                .query_database_all(cancel, &db_id, &QueryOptions::default())
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    self.progress.on_error(&e);
                    stats.errors += 1;
                    continue;
                }
            };
            for row in &rows {
                let notion_id = NotionId::parse(&row.id)?;
                self.mapper.assign_node_id(&notion_id);
            }
            staged.push((db, rows));
        }

        for (db, rows) in staged {
            self.materialize_one_database(cancel, db, rows, stats).await?;
        }

        Ok(())
    }

    async fn materialize_one_database(
        &mut self,
        cancel: &CancellationToken,
        db: RawDatabase,
        rows: Vec<RawPage>,
        stats: &mut ExtractStats,
    ) -> Result<(), AppError> {
        let notion_id = NotionId::parse(&db.id)?;
        if self.imported.contains(notion_id.as_str()) {
            return Ok(());
        }

        self.mapper.clear_pending_relations();
        let mut node = self.mapper.map_database(&db)?;

        if let Some(icon) = &db.icon {
            node.icon = self.downloader.process_icon(cancel, node.id, icon).await.ok().flatten();
        }
        if let Some(cover) = &db.cover {
            node.cover = self.downloader.process_cover(cancel, node.id, cover).await.ok();
        }
        node.views = self.view_manifest.views_for(&notion_id);

        self.mapper.resolve_relations(&mut node);

        self.sink.write_node(&node, None).await?;
        self.sink.write_node_entry(&node).await?;

        self.mapper.set_asset_context(self.downloader.clone(), node.id);
        self.sink.clear_node_data(node.id).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match self.mapper.map_database_page(cancel, row, &node.properties).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    // Per-row failures are non-critical warnings (spec §7):
                    // they do not count toward stats.errors.
                    self.progress.on_warning(&format!("row {} in database {} failed: {}", row.id, db.id, e));
                }
            }
        }
        self.mapper.clear_asset_context();

        self.sink.write_records(node.id, &node.properties, &records).await?;

        self.imported.insert(notion_id.as_str().to_string());
        stats.databases += 1;
        stats.records += records.len() as u64;
        self.progress.on_progress(stats.databases as usize, &node.title);

        Ok(())
    }

    /// Recursively materializes a standalone page and any child page/database
    /// references discovered in its block tree (spec §4.5 phase 5).
    fn materialize_page_recursive<'a>(
        &'a mut self,
        cancel: &'a CancellationToken,
        notion_id: &'a NotionId,
        options: &'a ExtractOptions,
        stats: &'a mut ExtractStats,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), AppError>> + Send + 'a>> {
        Box::pin(async move {
            if self.imported.contains(notion_id.as_str()) {
                return Ok(());
            }
            self.imported.insert(notion_id.as_str().to_string());

            let page_id = PageId::parse(notion_id.as_str())?;
            let page = self.client.get_page(cancel, &page_id).await?;
            let mut node = self.mapper.map_page(&page)?;

            if let Some(icon) = &page.icon {
                node.icon = self.downloader.process_icon(cancel, node.id, icon).await.ok().flatten();
            }
            if let Some(cover) = &page.cover {
                node.cover = self.downloader.process_cover(cancel, node.id, cover).await.ok();
            }

            let mut markdown = None;
            let mut child_refs = Vec::new();
            if options.include_content {
                let block_id = BlockId::parse(notion_id.as_str())?;
                let blocks = self
                    .client
                    .get_block_children_recursive(cancel, &block_id, options.max_depth, 0)
                    .await?;

                // Pre-assign child refs' ids before rendering so markdown
                // links resolve to a local id rather than falling back to a
                // bare title (spec §4.5 phase 5).
                child_refs = collect_child_refs(&blocks);
                for (child_id, _is_database) in &child_refs {
                    self.mapper.assign_node_id(child_id);
                }

                let renderer =
                    MarkdownRenderer::new(cancel, Some(self.downloader.clone()), node.id, Some(&self.mapper));
                markdown = Some(renderer.render_blocks(&blocks).await);
            }

            self.sink.write_node(&node, markdown.as_deref()).await?;
            self.sink.write_node_entry(&node).await?;

            stats.pages += 1;
            self.progress.on_progress((stats.pages + stats.databases) as usize, &node.title);

            for (child_id, is_database) in child_refs {
                if cancel.is_cancelled() {
                    return Err(AppError::Cancelled);
                }
                if is_database {
                    self.materialize_child_database(cancel, &child_id, stats).await?;
                } else {
                    self.materialize_page_recursive(cancel, &child_id, options, stats).await?;
                }
            }

            Ok(())
        })
    }

    /// A `child_database` reference discovered mid-page-recursion that wasn't
    /// already covered by phase 4's top-level discovery.
    async fn materialize_child_database(
        &mut self,
        cancel: &CancellationToken,
        notion_id: &NotionId,
        stats: &mut ExtractStats,
    ) -> Result<(), AppError> {
        if self.imported.contains(notion_id.as_str()) {
            return Ok(());
        }
        let db_id = DatabaseId::parse(notion_id.as_str())?;
        let db = match self.fetch_database_with_fallback(cancel, &db_id).await {
            Ok(db) => db,
            Err(e) => {
                self.progress.on_warning(&format!("child database {} fetch failed: {}", notion_id, e));
                return Ok(());
            }
        };
        let rows = self
            .client
            .query_database_all(cancel, &db_id, &QueryOptions::default())
            .await?;
        for row in &rows {
            let row_id = NotionId::parse(&row.id)?;
            self.mapper.assign_node_id(&row_id);
        }
        self.materialize_one_database(cancel, db, rows, stats).await
    }
}

/// Walks a block tree (including already-fetched children) collecting every
/// `child_page`/`child_database` reference, tagged with whether it is a
/// database.
fn collect_child_refs(blocks: &[Block]) -> Vec<(NotionId, bool)> {
    let mut refs = Vec::new();
    for block in blocks {
        match &block.payload {
            BlockPayload::ChildPage(child) => refs.push((child.notion_id.clone(), false)),
            BlockPayload::ChildDatabase(child) => refs.push((child.notion_id.clone(), true)),
            _ => {}
        }
        refs.extend(collect_child_refs(&block.children));
    }
    refs
}

/// Approximates a database column schema from one row's property values,
/// used only for the linked-database fallback (SPEC_FULL.md §B). Relation
/// and rollup values carry no schema-level information on a row, so they
/// fall back to `Unsupported` (mapped to plain text) rather than guessing a
/// target database id.
fn infer_schema_from_value(value: &RawPropertyValue) -> RawPropertySchema {
    match value {
        RawPropertyValue::Title { .. } => RawPropertySchema::Title,
        RawPropertyValue::RichText { .. } => RawPropertySchema::RichText,
        RawPropertyValue::Number { .. } => RawPropertySchema::Number {
            number: RawNumberFormat::default(),
        },
        RawPropertyValue::Select { select } => RawPropertySchema::Select {
            select: RawSelectConfig {
                options: select.iter().cloned().collect(),
            },
        },
        RawPropertyValue::Status { status } => RawPropertySchema::Status {
            status: RawSelectConfig {
                options: status.iter().cloned().collect(),
            },
        },
        RawPropertyValue::MultiSelect { multi_select } => RawPropertySchema::MultiSelect {
            multi_select: RawSelectConfig {
                options: multi_select.clone(),
            },
        },
        RawPropertyValue::Date { .. } => RawPropertySchema::Date,
        RawPropertyValue::Checkbox { .. } => RawPropertySchema::Checkbox,
        RawPropertyValue::Url { .. } => RawPropertySchema::Url,
        RawPropertyValue::Email { .. } => RawPropertySchema::Email,
        RawPropertyValue::PhoneNumber { .. } => RawPropertySchema::PhoneNumber,
        RawPropertyValue::People { .. } => RawPropertySchema::People,
        RawPropertyValue::Files { .. } => RawPropertySchema::Files,
        RawPropertyValue::Formula { .. } => RawPropertySchema::Formula {
            formula: RawFormulaConfig {
                expression: String::new(),
            },
        },
        RawPropertyValue::Relation { .. } | RawPropertyValue::Rollup { .. } => RawPropertySchema::Unsupported,
        RawPropertyValue::CreatedTime { .. } => RawPropertySchema::CreatedTime,
        RawPropertyValue::CreatedBy { .. } => RawPropertySchema::CreatedBy,
        RawPropertyValue::LastEditedTime { .. } => RawPropertySchema::LastEditedTime,
        RawPropertyValue::LastEditedBy { .. } => RawPropertySchema::LastEditedBy,
        RawPropertyValue::UniqueId { .. } => RawPropertySchema::UniqueId,
        RawPropertyValue::Unsupported => RawPropertySchema::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_text_schema_for_title_and_rich_text() {
        assert!(matches!(
            infer_schema_from_value(&RawPropertyValue::Title { title: Vec::new() }),
            RawPropertySchema::Title
        ));
        assert!(matches!(
            infer_schema_from_value(&RawPropertyValue::RichText { rich_text: Vec::new() }),
            RawPropertySchema::RichText
        ));
    }

    #[test]
    fn infers_unsupported_for_relation_and_rollup_values() {
        assert!(matches!(
            infer_schema_from_value(&RawPropertyValue::Relation { relation: Vec::new() }),
            RawPropertySchema::Unsupported
        ));
        assert!(matches!(
            infer_schema_from_value(&RawPropertyValue::Rollup {
                rollup: crate::api::types::RawRollupValue::Unsupported
            }),
            RawPropertySchema::Unsupported
        ));
    }

    #[test]
    fn collects_nested_child_refs_including_database_flag() {
        let leaf = Block {
            id: BlockId::parse("550e8400e29b41d4a716446655440000").unwrap(),
            has_children: false,
            children: Vec::new(),
            payload: BlockPayload::ChildDatabase(crate::model::ChildRefBlock {
                title: "Tasks".to_string(),
                notion_id: NotionId::parse("660e8400e29b41d4a716446655440000").unwrap(),
            }),
        };
        let root = Block {
            id: BlockId::parse("770e8400e29b41d4a716446655440000").unwrap(),
            has_children: true,
            children: vec![leaf],
            payload: BlockPayload::Paragraph(crate::model::TextBlock { rich_text: Vec::new() }),
        };
        let refs = collect_child_refs(&[root]);
        assert_eq!(refs.len(), 1);
        assert!(refs[0].1, "child_database ref should be tagged is_database = true");
    }
}
