//! Wire-format types mirroring Notion's JSON shapes.
//!
//! These are deliberately closer to Notion's actual API responses than to
//! the internal `model` types — the id mapper is what normalizes a
//! `RawPage`/`RawDatabase`/`RawBlock` into a `Node`/`Record`.

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawRichText {
    pub plain_text: String,
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: RawAnnotations,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAnnotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawIcon {
    Emoji { emoji: String },
    File { file: RawFileRef },
    External { external: RawExternalRef },
}

impl RawIcon {
    /// Emoji icons pass through as the emoji string itself; file/external
    /// icons carry a URL the asset downloader must resolve (spec §4.2).
    pub fn as_emoji(&self) -> Option<&str> {
        match self {
            RawIcon::Emoji { emoji } => Some(emoji.as_str()),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            RawIcon::File { file } => Some(file.url.as_str()),
            RawIcon::External { external } => Some(external.url.as_str()),
            RawIcon::Emoji { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawFile {
    File { file: RawFileRef },
    External { external: RawExternalRef },
}

impl RawFile {
    pub fn url(&self) -> &str {
        match self {
            RawFile::File { file } => &file.url,
            RawFile::External { external } => &external.url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFileRef {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawExternalRef {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawParent {
    PageId { page_id: String },
    DatabaseId { database_id: String },
    BlockId { block_id: String },
    Workspace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSelectOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

/// A database's column schema (the `properties` map of `GET /databases/{id}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPropertySchema {
    Title,
    RichText,
    Number {
        #[serde(default)]
        number: RawNumberFormat,
    },
    Select {
        select: RawSelectConfig,
    },
    MultiSelect {
        multi_select: RawSelectConfig,
    },
    Status {
        status: RawSelectConfig,
    },
    Date,
    Formula {
        formula: RawFormulaConfig,
    },
    Relation {
        relation: RawRelationConfig,
    },
    Rollup {
        rollup: RawRollupConfig,
    },
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    UniqueId,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNumberFormat {
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSelectConfig {
    #[serde(default)]
    pub options: Vec<RawSelectOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFormulaConfig {
    pub expression: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelationConfig {
    pub database_id: String,
    #[serde(default)]
    pub synced_property_name: Option<String>,
    #[serde(default)]
    pub dual_property: Option<serde_json::Value>,
    #[serde(default)]
    pub single_property: Option<serde_json::Value>,
}

impl RawRelationConfig {
    pub fn is_dual_link(&self) -> bool {
        self.dual_property.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRollupConfig {
    pub relation_property_name: String,
    pub rollup_property_name: String,
    pub function: String,
}

/// A single cell's value, as returned on a page's `properties` map.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPropertyValue {
    Title {
        title: Vec<RawRichText>,
    },
    RichText {
        rich_text: Vec<RawRichText>,
    },
    Number {
        number: Option<f64>,
    },
    Select {
        select: Option<RawSelectOption>,
    },
    MultiSelect {
        multi_select: Vec<RawSelectOption>,
    },
    Status {
        status: Option<RawSelectOption>,
    },
    Date {
        date: Option<RawDateValue>,
    },
    Formula {
        formula: RawFormulaValue,
    },
    Relation {
        relation: Vec<RawRelationRef>,
    },
    Rollup {
        rollup: RawRollupValue,
    },
    People {
        people: Vec<RawPerson>,
    },
    Files {
        files: Vec<RawFileEntry>,
    },
    Checkbox {
        checkbox: bool,
    },
    Url {
        url: Option<String>,
    },
    Email {
        email: Option<String>,
    },
    PhoneNumber {
        phone_number: Option<String>,
    },
    CreatedTime {
        created_time: String,
    },
    CreatedBy {
        created_by: RawPerson,
    },
    LastEditedTime {
        last_edited_time: String,
    },
    LastEditedBy {
        last_edited_by: RawPerson,
    },
    UniqueId {
        unique_id: RawUniqueId,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawFormulaValue {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: bool },
    Date { date: Option<RawDateValue> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelationRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRollupValue {
    Number { number: Option<f64> },
    Date { date: Option<RawDateValue> },
    Array { array: Vec<RawRollupArrayItem> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawRollupArrayItem {
    Title { title: Vec<RawRichText> },
    RichText { rich_text: Vec<RawRichText> },
    Number { number: Option<f64> },
    Date { date: Option<RawDateValue> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPerson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFileEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub file: RawFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUniqueId {
    pub number: i64,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// `GET /pages/{id}` / a query row.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub id: String,
    pub created_time: String,
    pub last_edited_time: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub icon: Option<RawIcon>,
    #[serde(default)]
    pub cover: Option<RawFile>,
    pub parent: RawParent,
    #[serde(default)]
    pub properties: IndexMap<String, RawPropertyValue>,
}

/// `GET /databases/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabase {
    pub id: String,
    pub created_time: String,
    pub last_edited_time: String,
    #[serde(default)]
    pub icon: Option<RawIcon>,
    #[serde(default)]
    pub cover: Option<RawFile>,
    pub parent: RawParent,
    #[serde(default)]
    pub title: Vec<RawRichText>,
    #[serde(default)]
    pub properties: IndexMap<String, RawPropertySchema>,
}

/// One entry of `POST /search`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResult {
    pub id: String,
    pub object: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResponse {
    pub results: Vec<RawSearchResult>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawQueryResponse {
    pub results: Vec<RawPage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// `GET /blocks/{id}/children` — each entry is a raw block, still untyped by
/// payload; `parser::parse_raw_block` does the per-kind dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlockChildrenResponse {
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// The structured error body Notion returns on status >= 400.
#[derive(Debug, Clone, Deserialize)]
pub struct RawApiError {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
