//! Bidirectional NotionID ↔ NodeID table and the normalizer that turns raw
//! Notion wire objects into `Node`/`Record` values (spec §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::api::types::{
    RawDatabase, RawFormulaValue, RawPage, RawPropertySchema, RawPropertyValue, RawRollupArrayItem,
    RawRollupValue,
};
use crate::assets::AssetDownloader;
use crate::error::AppError;
use crate::model::{
    FormulaConfig, FormulaValue, Node, NodeKind, Property, PropertyType, PropertyValue,
    RelationConfig, RollupArrayItem, RollupConfig, RollupValue,
};
use crate::types::{NodeId, NodeIdGenerator, NotionId, PropertyName, SelectOption};

/// Asset-download context bound while mapping one node's property values.
struct AssetContext {
    downloader: Arc<AssetDownloader>,
    node_id: NodeId,
}

pub struct IdMapper {
    generator: NodeIdGenerator,
    notion_to_local: HashMap<String, NodeId>,
    pending_relations: HashMap<PropertyName, NotionId>,
    asset_context: Option<AssetContext>,
}

impl IdMapper {
    pub fn new() -> Self {
        Self {
            generator: NodeIdGenerator::new(),
            notion_to_local: HashMap::new(),
            pending_relations: HashMap::new(),
            asset_context: None,
        }
    }

    /// Seeds the mapper with a previously persisted mapping (spec §4.5
    /// bootstrap phase — reused across runs so local IDs stay stable).
    pub fn seed(&mut self, mapping: HashMap<String, NodeId>) {
        self.notion_to_local = mapping;
    }

    pub fn mapping_snapshot(&self) -> HashMap<String, NodeId> {
        self.notion_to_local.clone()
    }

    pub fn local_id_for(&self, notion_id: &NotionId) -> Option<NodeId> {
        self.notion_to_local.get(notion_id.as_str()).copied()
    }

    /// Idempotent: returns the existing mapping or mints a fresh `NodeId`.
    pub fn assign_node_id(&mut self, notion_id: &NotionId) -> NodeId {
        if let Some(existing) = self.notion_to_local.get(notion_id.as_str()) {
            return *existing;
        }
        let id = self.generator.next();
        self.notion_to_local.insert(notion_id.as_str().to_string(), id);
        id
    }

    pub fn clear_pending_relations(&mut self) {
        self.pending_relations.clear();
    }

    pub fn set_asset_context(&mut self, downloader: Arc<AssetDownloader>, node_id: NodeId) {
        self.asset_context = Some(AssetContext { downloader, node_id });
    }

    pub fn clear_asset_context(&mut self) {
        self.asset_context = None;
    }

    pub fn map_database(&mut self, db: &RawDatabase) -> Result<Node, AppError> {
        let notion_id = NotionId::parse(&db.id)?;
        let id = self.assign_node_id(&notion_id);
        let title = plain_text(&db.title);
        let parent_id = self.parent_local_id(&db.parent);

        let mut node = Node::new(id, title, NodeKind::Table);
        node.parent_id = parent_id;
        node.icon = db.icon.as_ref().and_then(|i| i.as_emoji().map(|e| e.to_string()));
        node.cover = db.cover.as_ref().map(|f| f.url().to_string());
        node.created = parse_datetime(&db.created_time);
        node.modified = parse_datetime(&db.last_edited_time);

        for (name, schema) in &db.properties {
            let property_name = PropertyName::from(name.as_str());
            let property = self.map_db_property(property_name, schema);
            node.properties.push(property);
        }

        Ok(node)
    }

    fn map_db_property(&mut self, name: PropertyName, schema: &RawPropertySchema) -> Property {
        match schema {
            RawPropertySchema::Title => Property::new(name, PropertyType::Text),
            RawPropertySchema::RichText => Property::new(name, PropertyType::Markdown),
            RawPropertySchema::Number { .. } => Property::new(name, PropertyType::Number),
            RawPropertySchema::Checkbox => Property::new(name, PropertyType::Checkbox),
            RawPropertySchema::Date
            | RawPropertySchema::CreatedTime
            | RawPropertySchema::LastEditedTime => Property::new(name, PropertyType::Date),
            RawPropertySchema::Select { select } | RawPropertySchema::Status { status: select } => {
                let mut property = Property::new(name, PropertyType::Select);
                property.options = Some(select_options(&select.options));
                property
            }
            RawPropertySchema::MultiSelect { multi_select } => {
                let mut property = Property::new(name, PropertyType::MultiSelect);
                property.options = Some(select_options(&multi_select.options));
                property
            }
            RawPropertySchema::Url => Property::new(name, PropertyType::Url),
            RawPropertySchema::Email => Property::new(name, PropertyType::Email),
            RawPropertySchema::PhoneNumber => Property::new(name, PropertyType::Phone),
            RawPropertySchema::People
            | RawPropertySchema::CreatedBy
            | RawPropertySchema::LastEditedBy => Property::new(name, PropertyType::Text),
            RawPropertySchema::Files => Property::new(name, PropertyType::Files),
            RawPropertySchema::Formula { formula } => {
                let mut property = Property::new(name, PropertyType::Formula);
                property.formula_config = Some(FormulaConfig {
                    expression: formula.expression.clone(),
                });
                property
            }
            RawPropertySchema::Relation { relation } => {
                let mut property = Property::new(name.clone(), PropertyType::Relation);
                match NotionId::parse(&relation.database_id) {
                    Ok(target) => {
                        self.pending_relations.insert(name, target.clone());
                        property.relation_config = Some(RelationConfig {
                            target_notion_database_id: target,
                            target_node_id: None,
                            is_dual_link: relation.is_dual_link(),
                        });
                    }
                    Err(_) => {}
                }
                property
            }
            RawPropertySchema::Rollup { rollup } => {
                let mut property = Property::new(name, PropertyType::Rollup);
                property.rollup_config = Some(RollupConfig {
                    relation_property_name: rollup.relation_property_name.clone(),
                    rollup_property_name: rollup.rollup_property_name.clone(),
                    function: rollup.function.clone(),
                });
                property
            }
            RawPropertySchema::UniqueId => Property::new(name, PropertyType::Text),
            RawPropertySchema::Unsupported => Property::new(name, PropertyType::Text),
        }
    }

    pub fn map_page(&mut self, page: &RawPage) -> Result<Node, AppError> {
        let notion_id = NotionId::parse(&page.id)?;
        let id = self.assign_node_id(&notion_id);
        let parent_id = self.parent_local_id(&page.parent);

        let mut node = Node::new(id, page_title(page), NodeKind::Document);
        node.parent_id = parent_id;
        node.icon = page.icon.as_ref().and_then(|i| i.as_emoji().map(|e| e.to_string()));
        node.cover = page.cover.as_ref().map(|f| f.url().to_string());
        node.created = parse_datetime(&page.created_time);
        node.modified = parse_datetime(&page.last_edited_time);
        Ok(node)
    }

    /// Maps one database row into a `Record`, using `schema` to decide how
    /// each cell's raw value is coerced. Downloads any `files`-typed assets
    /// through the bound asset context, falling back to the raw URL if the
    /// download fails.
    pub async fn map_database_page(
        &mut self,
        cancel: &CancellationToken,
        page: &RawPage,
        schema: &[Property],
    ) -> Result<crate::model::Record, AppError> {
        let notion_id = NotionId::parse(&page.id)?;
        let id = self.assign_node_id(&notion_id);
        let mut record = crate::model::Record::new(id);
        record.created = parse_datetime(&page.created_time);
        record.modified = parse_datetime(&page.last_edited_time);

        for property in schema {
            let Some(raw_value) = page.properties.get(property.name.as_str()) else {
                continue;
            };
            let value = self.map_property_value(cancel, property, raw_value).await;
            record.data.insert(property.name.clone(), value);
        }

        Ok(record)
    }

    async fn map_property_value(
        &mut self,
        cancel: &CancellationToken,
        property: &Property,
        raw: &RawPropertyValue,
    ) -> PropertyValue {
        match raw {
            RawPropertyValue::Title { title } => PropertyValue::Text(plain_text(title)),
            RawPropertyValue::RichText { rich_text } => PropertyValue::Markdown(
                crate::markdown::render_rich_text(&crate::api::parser::rich_text_spans(rich_text)),
            ),
            RawPropertyValue::Number { number } => PropertyValue::Number(*number),
            RawPropertyValue::Checkbox { checkbox } => PropertyValue::Checkbox(*checkbox),
            RawPropertyValue::Date { date } => {
                PropertyValue::Date(date.as_ref().and_then(|d| parse_datetime(&d.start)))
            }
            RawPropertyValue::Select { select } => {
                PropertyValue::Select(select.as_ref().map(|s| s.id.clone()))
            }
            RawPropertyValue::Status { status } => {
                PropertyValue::Select(status.as_ref().map(|s| s.id.clone()))
            }
            RawPropertyValue::MultiSelect { multi_select } => {
                PropertyValue::MultiSelect(multi_select.iter().map(|s| s.id.clone()).collect())
            }
            RawPropertyValue::Url { url } => PropertyValue::Url(url.clone()),
            RawPropertyValue::Email { email } => PropertyValue::Email(email.clone()),
            RawPropertyValue::PhoneNumber { phone_number } => {
                PropertyValue::Phone(phone_number.clone())
            }
            RawPropertyValue::People { people } => PropertyValue::Text(
                people
                    .iter()
                    .filter_map(|p| p.name.clone())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            RawPropertyValue::CreatedBy { created_by } => {
                PropertyValue::Text(created_by.name.clone().unwrap_or_default())
            }
            RawPropertyValue::LastEditedBy { last_edited_by } => {
                PropertyValue::Text(last_edited_by.name.clone().unwrap_or_default())
            }
            RawPropertyValue::CreatedTime { created_time } => {
                PropertyValue::Text(created_time.clone())
            }
            RawPropertyValue::LastEditedTime { last_edited_time } => {
                PropertyValue::Text(last_edited_time.clone())
            }
            RawPropertyValue::Files { files } => {
                PropertyValue::Files(self.map_files_value(cancel, files).await)
            }
            RawPropertyValue::Formula { formula } => PropertyValue::Formula(map_formula_value(formula)),
            RawPropertyValue::Relation { relation } => {
                PropertyValue::Relation(self.map_relation_value(relation))
            }
            RawPropertyValue::Rollup { rollup } => PropertyValue::Rollup(map_rollup_value(rollup)),
            RawPropertyValue::UniqueId { unique_id } => {
                let text = match &unique_id.prefix {
                    Some(prefix) => format!("{}-{}", prefix, unique_id.number),
                    None => unique_id.number.to_string(),
                };
                PropertyValue::Text(text)
            }
            RawPropertyValue::Unsupported => PropertyValue::Text(String::new()),
        }
    }

    async fn map_files_value(
        &mut self,
        cancel: &CancellationToken,
        files: &[crate::api::types::RawFileEntry],
    ) -> String {
        let mut paths = Vec::new();
        for entry in files {
            let url = entry.file.url();
            let Some(ctx) = &self.asset_context else {
                paths.push(url.to_string());
                continue;
            };
            match ctx.downloader.download_asset(cancel, ctx.node_id, url).await {
                Ok(path) => paths.push(path),
                Err(_) => paths.push(url.to_string()),
            }
        }
        paths.join("\n")
    }

    /// Each entry becomes a local node-id string, or `notion:<id>` if the
    /// target hasn't been assigned an id yet (resolved fully by
    /// `resolve_relations` once every database in the run is mapped).
    fn map_relation_value(&self, relation: &[crate::api::types::RawRelationRef]) -> Vec<String> {
        relation
            .iter()
            .map(|r| match self.notion_to_local.get(&normalize(&r.id)) {
                Some(local) => local.to_string(),
                None => format!("notion:{}", r.id),
            })
            .collect()
    }

    /// Fills in `relation_config.target_node_id` for every relation property
    /// on `node`, matching `pending_relations[name]` against the NotionID
    /// table (exact match, falling back to dash-stripped comparison).
    pub fn resolve_relations(&self, node: &mut Node) {
        for property in &mut node.properties {
            let Some(config) = &mut property.relation_config else {
                continue;
            };
            let Some(target_db) = self.pending_relations.get(&property.name) else {
                continue;
            };
            config.target_node_id = self
                .notion_to_local
                .get(target_db.as_str())
                .copied()
                .or_else(|| {
                    let stripped = normalize(target_db.as_str());
                    self.notion_to_local
                        .iter()
                        .find(|(k, _)| normalize(k) == stripped)
                        .map(|(_, v)| *v)
                })
                .or(config.target_node_id);
        }
    }

    fn parent_local_id(&mut self, parent: &crate::api::types::RawParent) -> Option<NodeId> {
        use crate::api::types::RawParent;
        let raw_id = match parent {
            RawParent::PageId { page_id } => page_id,
            RawParent::DatabaseId { database_id } => database_id,
            RawParent::BlockId { block_id } => block_id,
            RawParent::Workspace => return None,
        };
        NotionId::parse(raw_id)
            .ok()
            .map(|notion_id| self.assign_node_id(&notion_id))
    }
}

impl Default for IdMapper {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(notion_id: &str) -> String {
    notion_id.replace('-', "").to_lowercase()
}

fn select_options(options: &[crate::api::types::RawSelectOption]) -> Vec<SelectOption> {
    options
        .iter()
        .map(|o| SelectOption {
            id: o.id.clone(),
            name: o.name.clone(),
            color: o.color.parse().unwrap_or_default(),
        })
        .collect()
}

pub(crate) fn page_title(page: &RawPage) -> String {
    for value in page.properties.values() {
        if let RawPropertyValue::Title { title } = value {
            return plain_text(title);
        }
    }
    String::new()
}

pub(crate) fn plain_text(spans: &[crate::api::types::RawRichText]) -> String {
    spans.iter().map(|s| s.plain_text.as_str()).collect()
}

fn map_formula_value(formula: &RawFormulaValue) -> FormulaValue {
    match formula {
        RawFormulaValue::String { string } => match string {
            Some(s) => FormulaValue::StringValue(s.clone()),
            None => FormulaValue::Empty,
        },
        RawFormulaValue::Number { number } => match number {
            Some(n) => FormulaValue::NumberValue(*n),
            None => FormulaValue::Empty,
        },
        RawFormulaValue::Boolean { boolean } => FormulaValue::BooleanValue(*boolean),
        RawFormulaValue::Date { date } => {
            FormulaValue::DateValue(date.as_ref().and_then(|d| parse_datetime(&d.start)))
        }
    }
}

fn map_rollup_value(rollup: &RawRollupValue) -> RollupValue {
    match rollup {
        RawRollupValue::Number { number } => RollupValue::Number(*number),
        RawRollupValue::Date { date } => {
            RollupValue::Date(date.as_ref().and_then(|d| parse_datetime(&d.start)))
        }
        RawRollupValue::Array { array } => {
            RollupValue::Array(array.iter().map(map_rollup_array_item).collect())
        }
        RawRollupValue::Unsupported => RollupValue::Unsupported,
    }
}

fn map_rollup_array_item(item: &RawRollupArrayItem) -> RollupArrayItem {
    match item {
        RawRollupArrayItem::Title { title } => RollupArrayItem::Text(plain_text(title)),
        RawRollupArrayItem::RichText { rich_text } => RollupArrayItem::Text(plain_text(rich_text)),
        RawRollupArrayItem::Number { number } => RollupArrayItem::Number(number.unwrap_or(0.0)),
        RawRollupArrayItem::Date { date } => {
            RollupArrayItem::Date(date.as_ref().and_then(|d| parse_datetime(&d.start)))
        }
        RawRollupArrayItem::Unsupported => RollupArrayItem::Text(String::new()),
    }
}

/// RFC3339 → naive datetime (assumed UTC) → naive date (midnight UTC);
/// unparseable input becomes `None` rather than an error (spec §4.3).
fn parse_datetime(input: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).timestamp() as f64);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc().timestamp() as f64);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_node_id_is_idempotent() {
        let mut mapper = IdMapper::new();
        let notion_id = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let a = mapper.assign_node_id(&notion_id);
        let b = mapper.assign_node_id(&notion_id);
        assert_eq!(a, b);
    }

    #[test]
    fn resolve_relations_matches_dash_stripped_ids() {
        let mut mapper = IdMapper::new();
        let dashed = NotionId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let target = mapper.assign_node_id(&dashed);

        let prop_name = PropertyName::from("Related");
        mapper.pending_relations.insert(
            prop_name.clone(),
            NotionId::parse("550e8400e29b41d4a716446655440000").unwrap(),
        );

        let row_id = mapper.assign_node_id(&NotionId::parse("660e8400e29b41d4a716446655440000").unwrap());
        let mut node = Node::new(row_id, "Row", NodeKind::Hybrid);
        let mut property = Property::new(prop_name, PropertyType::Relation);
        property.relation_config = Some(RelationConfig {
            target_notion_database_id: NotionId::parse("550e8400e29b41d4a716446655440000").unwrap(),
            target_node_id: None,
            is_dual_link: false,
        });
        node.properties.push(property);

        mapper.resolve_relations(&mut node);
        assert_eq!(
            node.properties[0].relation_config.as_ref().unwrap().target_node_id,
            Some(target)
        );
    }

    #[test]
    fn parses_fallback_date_forms() {
        assert!(parse_datetime("2024-01-02T03:04:05Z").is_some());
        assert!(parse_datetime("2024-01-02T03:04:05").is_some());
        assert!(parse_datetime("2024-01-02").is_some());
        assert!(parse_datetime("not a date").is_none());
    }
}
