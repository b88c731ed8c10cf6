use thiserror::Error;

mod colors;
mod domain_types;
mod ids;
mod node_id;
mod richtext;

pub use colors::*;
pub use domain_types::*;
pub use ids::*;
pub use node_id::*;
pub use richtext::*;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Manifest version mismatch: expected {expected}, found {found}")]
    ManifestVersionMismatch { expected: u32, found: u32 },
}
