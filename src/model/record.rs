//! `Record` — a row in a table-kind node.

use crate::model::PropertyValue;
use crate::types::{NodeId, PropertyName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: NodeId,
    pub data: HashMap<PropertyName, PropertyValue>,
    pub created: Option<f64>,
    pub modified: Option<f64>,
}

impl Record {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            data: HashMap::new(),
            created: None,
            modified: None,
        }
    }
}
