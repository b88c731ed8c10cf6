//! `Property` — column schema for a table node, and the coerced value types
//! a `Record` stores for each column (spec §3, §4.3).

use crate::types::{NodeId, NotionId, PropertyName, SelectOption};
use serde::{Deserialize, Serialize};

/// The internal property type vocabulary. Every Notion property type is
/// coerced into one of these (the mapping table lives in `mapper`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Text,
    Markdown,
    Number,
    Checkbox,
    Date,
    Select,
    MultiSelect,
    Url,
    Email,
    Phone,
    Files,
    Formula,
    Relation,
    Rollup,
}

/// Column schema for a table-kind node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: PropertyName,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_config: Option<FormulaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_config: Option<RelationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollup_config: Option<RollupConfig>,
}

impl Property {
    pub fn new(name: PropertyName, property_type: PropertyType) -> Self {
        Self {
            name,
            property_type,
            options: None,
            formula_config: None,
            relation_config: None,
            rollup_config: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaConfig {
    pub expression: String,
}

/// A relation column's target. `target_node_id` starts `None` and is filled
/// in by `IdMapper::resolve_relations` once every database in the run has
/// been mapped; `target_notion_database_id` is the raw pointer used to
/// perform that lookup and is kept even after resolution for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationConfig {
    pub target_notion_database_id: NotionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<NodeId>,
    pub is_dual_link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupConfig {
    pub relation_property_name: String,
    pub rollup_property_name: String,
    pub function: String,
}

/// A coerced value stored in one `Record` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Markdown(String),
    Number(Option<f64>),
    Checkbox(bool),
    Date(Option<f64>),
    /// Option id, not the display name (spec invariant — rename-safe).
    Select(Option<String>),
    MultiSelect(Vec<String>),
    Url(Option<String>),
    Email(Option<String>),
    Phone(Option<String>),
    /// Newline-joined local paths or passthrough URLs.
    Files(String),
    Formula(FormulaValue),
    /// Each entry is a local node id string, or `notion:<id>` if unresolved.
    Relation(Vec<String>),
    Rollup(RollupValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormulaValue {
    StringValue(String),
    NumberValue(f64),
    BooleanValue(bool),
    DateValue(Option<f64>),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RollupValue {
    Number(Option<f64>),
    Date(Option<f64>),
    Array(Vec<RollupArrayItem>),
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RollupArrayItem {
    Text(String),
    Number(f64),
    Date(Option<f64>),
}
