//! Notion API access: HTTP client, wire types, pagination, parsing, and the
//! shared request throttle (spec §4.1).

pub mod client;
pub mod pagination;
pub mod parser;
pub mod rate_limiter;
pub mod types;

pub use client::{NotionHttpClient, QueryOptions, SearchFilter};
