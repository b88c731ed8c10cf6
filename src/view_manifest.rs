//! View manifest: an optional, external source of presentation `View`s for
//! table-kind nodes (spec §6). The core never invents views on its own —
//! it asks this collaborator, keyed by the database's Notion id, and
//! carries back whatever it returns unmodified.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::model::View;
use crate::types::NotionId;

pub trait ViewManifest: Send + Sync {
    fn views_for(&self, database_id: &NotionId) -> Vec<View>;
}

/// No manifest configured: every database gets zero views.
pub struct NullViewManifest;

impl ViewManifest for NullViewManifest {
    fn views_for(&self, _database_id: &NotionId) -> Vec<View> {
        Vec::new()
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    databases: HashMap<String, Vec<View>>,
}

/// Loads a YAML document mapping normalized Notion database ids to the
/// views that database should carry. Unknown databases fall back to no
/// views rather than an error, since the manifest is expected to cover only
/// the databases an author has bothered to configure.
pub struct YamlViewManifest {
    views: HashMap<String, Vec<View>>,
}

impl YamlViewManifest {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        let parsed: ManifestFile =
            serde_yaml::from_str(&contents).map_err(|e| AppError::ManifestError(e.to_string()))?;
        let mut views = HashMap::with_capacity(parsed.databases.len());
        for (id, entry) in parsed.databases {
            let key = crate::types::normalize_notion_id(&id)
                .map_err(|e| AppError::ManifestError(e.to_string()))?;
            views.insert(key, entry);
        }
        Ok(Self { views })
    }
}

impl ViewManifest for YamlViewManifest {
    fn views_for(&self, database_id: &NotionId) -> Vec<View> {
        self.views.get(database_id.as_str()).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewType;

    #[test]
    fn unknown_database_yields_no_views() {
        let manifest = YamlViewManifest {
            views: HashMap::new(),
        };
        let id = NotionId::parse("abcdefabcdefabcdefabcdefabcdefab").unwrap();
        assert!(manifest.views_for(&id).is_empty());
    }

    #[test]
    fn known_database_returns_its_configured_views() {
        let id = NotionId::parse("abcdefabcdefabcdefabcdefabcdefab").unwrap();
        let mut views = HashMap::new();
        views.insert(
            id.as_str().to_string(),
            vec![View {
                view_type: ViewType::Board,
                name: "By status".to_string(),
                columns: vec!["Status".to_string()],
                sorts: Vec::new(),
                filters: Vec::new(),
                groups: vec!["Status".to_string()],
            }],
        );
        let manifest = YamlViewManifest { views };
        let result = manifest.views_for(&id);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "By status");
    }
}
