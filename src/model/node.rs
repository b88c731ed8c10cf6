//! `Node` — a materialized Notion page or database in the local store.

use crate::model::Property;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// What shape of content a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A standalone page rendered to markdown.
    Document,
    /// A database: a schema plus rows stored as records.
    Table,
    /// A database page (a row) that also carries its own block content.
    Hybrid,
}

/// A presentation view injected from the (out-of-scope) view manifest.
/// Opaque to the core beyond these fields — it is carried through to the
/// sink untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(rename = "type")]
    pub view_type: ViewType,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub sorts: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Table,
    Board,
    Gallery,
    List,
    Calendar,
}

/// A unit of materialized content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub title: String,
    pub kind: NodeKind,
    pub icon: Option<String>,
    pub cover: Option<String>,
    /// Epoch-seconds float, matching record timestamps (spec §3).
    pub created: Option<f64>,
    pub modified: Option<f64>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub views: Vec<View>,
}

impl Node {
    pub fn new(id: NodeId, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            parent_id: None,
            title: title.into(),
            kind,
            icon: None,
            cover: None,
            created: None,
            modified: None,
            properties: Vec::new(),
            views: Vec::new(),
        }
    }
}
