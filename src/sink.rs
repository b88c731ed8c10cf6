//! The workspace writer: the external storage collaborator the orchestrator
//! writes through (spec §6). Out of core scope as an *implementation* — the
//! core only depends on the `Sink` trait — but `FsSink` ships a concrete
//! filesystem realization so the crate is runnable end to end.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::AppError;
use crate::model::{Node, NodeKind, Property, Record};
use crate::types::NodeId;

/// Everything the orchestrator needs from durable storage. Implementations
/// own the on-disk (or otherwise persisted) representation entirely; the
/// core only calls through this interface.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn ensure_workspace(&self) -> Result<(), AppError>;
    async fn clear_nodes_manifest(&self) -> Result<(), AppError>;
    async fn write_node(&self, node: &Node, markdown_content: Option<&str>) -> Result<(), AppError>;
    async fn write_node_entry(&self, node: &Node) -> Result<(), AppError>;
    async fn clear_node_data(&self, node_id: NodeId) -> Result<(), AppError>;
    async fn write_records(
        &self,
        node_id: NodeId,
        properties: &[Property],
        records: &[Record],
    ) -> Result<(), AppError>;
    async fn load_id_mapping(&self) -> Result<HashMap<String, NodeId>, AppError>;
    async fn save_id_mapping(&self, mapping: &HashMap<String, NodeId>) -> Result<(), AppError>;
}

const MAPPING_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct MappingFile {
    version: u32,
    ids: HashMap<String, NodeId>,
}

#[derive(Debug, Serialize)]
struct NodeManifestEntry<'a> {
    id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<NodeId>,
    title: &'a str,
    kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<&'a str>,
    created: Option<f64>,
    modified: Option<f64>,
}

#[derive(Debug, Serialize)]
struct NodeMetadata<'a> {
    views: &'a [crate::model::View],
}

#[derive(Debug, Serialize)]
struct IndexFrontMatter<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct RecordsSchemaHeader<'a> {
    properties: &'a [Property],
}

#[derive(Debug, Serialize)]
struct RecordRow<'a> {
    id: NodeId,
    data: &'a HashMap<crate::types::PropertyName, crate::model::PropertyValue>,
    created: Option<f64>,
    modified: Option<f64>,
}

/// Filesystem realization of [`Sink`] producing the layout documented in
/// spec §6:
///
/// ```text
/// <workspace>/
///   nodes.jsonl
///   notion_id_mapping.json
///   <node_id>/
///     index.md
///     metadata.json
///     data.jsonl
/// ```
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn nodes_manifest_path(&self) -> PathBuf {
        self.root.join("nodes.jsonl")
    }

    fn mapping_path(&self) -> PathBuf {
        self.root.join("notion_id_mapping.json")
    }

    fn node_dir(&self, node_id: NodeId) -> PathBuf {
        self.root.join(node_id.to_string())
    }

    async fn append_line(path: &Path, line: &str) -> Result<(), AppError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink for FsSink {
    async fn ensure_workspace(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn clear_nodes_manifest(&self) -> Result<(), AppError> {
        tokio::fs::write(self.nodes_manifest_path(), b"").await?;
        Ok(())
    }

    async fn write_node(&self, node: &Node, markdown_content: Option<&str>) -> Result<(), AppError> {
        let dir = self.node_dir(node.id);
        tokio::fs::create_dir_all(&dir).await?;

        if matches!(node.kind, NodeKind::Document | NodeKind::Hybrid) {
            let front_matter = serde_yaml::to_string(&IndexFrontMatter { title: &node.title })
                .map_err(|e| AppError::ManifestError(e.to_string()))?;
            let body = markdown_content.unwrap_or_default();
            let contents = format!("---\n{}---\n\n{}", front_matter, body);
            tokio::fs::write(dir.join("index.md"), contents).await?;
        }

        if matches!(node.kind, NodeKind::Table | NodeKind::Hybrid) {
            let metadata = NodeMetadata { views: &node.views };
            let json = serde_json::to_string_pretty(&metadata)?;
            tokio::fs::write(dir.join("metadata.json"), json).await?;
        }

        Ok(())
    }

    async fn write_node_entry(&self, node: &Node) -> Result<(), AppError> {
        let entry = NodeManifestEntry {
            id: node.id,
            parent_id: node.parent_id,
            title: &node.title,
            kind: node.kind,
            icon: node.icon.as_deref(),
            cover: node.cover.as_deref(),
            created: node.created,
            modified: node.modified,
        };
        let line = serde_json::to_string(&entry)?;
        Self::append_line(&self.nodes_manifest_path(), &line).await
    }

    async fn clear_node_data(&self, node_id: NodeId) -> Result<(), AppError> {
        let path = self.node_dir(node_id).join("data.jsonl");
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_records(
        &self,
        node_id: NodeId,
        properties: &[Property],
        records: &[Record],
    ) -> Result<(), AppError> {
        let dir = self.node_dir(node_id);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("data.jsonl");

        let header = serde_json::to_string(&RecordsSchemaHeader { properties })?;
        Self::append_line(&path, &header).await?;

        for record in records {
            let row = RecordRow {
                id: record.id,
                data: &record.data,
                created: record.created,
                modified: record.modified,
            };
            let line = serde_json::to_string(&row)?;
            Self::append_line(&path, &line).await?;
        }
        Ok(())
    }

    async fn load_id_mapping(&self) -> Result<HashMap<String, NodeId>, AppError> {
        let path = self.mapping_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let parsed: MappingFile = serde_json::from_slice(&bytes)?;
        if parsed.version != MAPPING_VERSION {
            return Err(AppError::ManifestError(format!(
                "unsupported id mapping version {} (expected {})",
                parsed.version, MAPPING_VERSION
            )));
        }
        Ok(parsed.ids)
    }

    async fn save_id_mapping(&self, mapping: &HashMap<String, NodeId>) -> Result<(), AppError> {
        let file = MappingFile {
            version: MAPPING_VERSION,
            ids: mapping.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        tokio::fs::write(self.mapping_path(), json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn temp_workspace() -> PathBuf {
        std::env::temp_dir().join(format!(
            "notion-vault-extractor-sink-test-{}",
            crate::types::NodeId::from_raw(rand_seed()).as_str()
        ))
    }

    fn rand_seed() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    }

    #[tokio::test]
    async fn round_trips_the_id_mapping_file() {
        let root = temp_workspace();
        let sink = FsSink::new(&root);
        sink.ensure_workspace().await.unwrap();

        let mut mapping = HashMap::new();
        mapping.insert("abc123".to_string(), NodeId::from_raw(42));
        sink.save_id_mapping(&mapping).await.unwrap();

        let loaded = sink.load_id_mapping().await.unwrap();
        assert_eq!(loaded.get("abc123"), Some(&NodeId::from_raw(42)));

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn missing_mapping_file_loads_as_empty() {
        let root = temp_workspace();
        let sink = FsSink::new(&root);
        sink.ensure_workspace().await.unwrap();
        let loaded = sink.load_id_mapping().await.unwrap();
        assert!(loaded.is_empty());
        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn write_node_produces_index_md_with_front_matter_for_documents() {
        let root = temp_workspace();
        let sink = FsSink::new(&root);
        sink.ensure_workspace().await.unwrap();

        let node = Node::new(NodeId::from_raw(1), "My Page", NodeKind::Document);
        sink.write_node(&node, Some("Hello\n\n")).await.unwrap();

        let contents = tokio::fs::read_to_string(root.join(NodeId::from_raw(1).to_string()).join("index.md"))
            .await
            .unwrap();
        assert!(contents.starts_with("---\n"));
        assert!(contents.contains("title: My Page"));
        assert!(contents.ends_with("Hello\n\n"));

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn write_node_produces_metadata_json_for_tables() {
        let root = temp_workspace();
        let sink = FsSink::new(&root);
        sink.ensure_workspace().await.unwrap();

        let node = Node::new(NodeId::from_raw(2), "My Table", NodeKind::Table);
        sink.write_node(&node, None).await.unwrap();

        let dir = root.join(NodeId::from_raw(2).to_string());
        assert!(dir.join("metadata.json").exists());
        assert!(!dir.join("index.md").exists());

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
