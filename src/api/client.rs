//! HTTP client for the Notion API: authentication, throttling, pagination,
//! and response parsing for every read operation the extractor needs
//! (spec §4.1).

use std::time::Duration;

use reqwest::{header, Client};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::model::Block;
use crate::types::{ApiKey, BlockId, DatabaseId, PageId};

use super::pagination::collect_all;
use super::parser::{parse_raw_block, parse_response};
use super::rate_limiter::RateLimiter;
use super::types::{RawDatabase, RawPage, RawQueryResponse, RawSearchResponse};

const NOTION_VERSION: &str = "2022-06-28";
const API_BASE_URL: &str = "https://api.notion.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which object kinds `search_all` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Page,
    Database,
}

impl SearchFilter {
    fn as_str(&self) -> &'static str {
        match self {
            SearchFilter::Page => "page",
            SearchFilter::Database => "database",
        }
    }
}

/// Options for a database query (spec §4.1: the client does not build
/// Notion filter/sort expressions itself — it passes through whatever the
/// caller supplies verbatim).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Option<serde_json::Value>,
    pub sorts: Option<serde_json::Value>,
}

pub struct NotionHttpClient {
    client: Client,
    rate_limiter: RateLimiter,
}

impl NotionHttpClient {
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::headers(api_key)?)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            rate_limiter: RateLimiter::default(),
        })
    }

    fn headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth).map_err(|e| {
                AppError::MissingConfiguration(format!("invalid API token format: {}", e))
            })?,
        );
        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    async fn get(&self, cancel: &CancellationToken, endpoint: &str) -> Result<String, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        self.rate_limiter.throttle().await;
        let url = format!("{}/{}", API_BASE_URL, endpoint);
        log::debug!("GET {}", url);
        let response = tokio::select! {
            result = self.client.get(&url).send() => result?,
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
        };
        let status = response.status().as_u16();
        let body = response.text().await?;
        check_status(status, &body)?;
        Ok(body)
    }

    async fn post<T: Serialize>(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        body: &T,
    ) -> Result<String, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        self.rate_limiter.throttle().await;
        let url = format!("{}/{}", API_BASE_URL, endpoint);
        log::debug!("POST {}", url);
        let response = tokio::select! {
            result = self.client.post(&url).json(body).send() => result?,
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
        };
        let status = response.status().as_u16();
        let text = response.text().await?;
        check_status(status, &text)?;
        Ok(text)
    }

    /// `POST /search`, paginated, filtered to one object kind.
    pub async fn search_all(
        &self,
        cancel: &CancellationToken,
        query: Option<&str>,
        object_filter: SearchFilter,
    ) -> Result<Vec<super::types::RawSearchResult>, AppError> {
        let filter = object_filter.as_str().to_string();
        let query = query.map(|s| s.to_string());
        collect_all(move |cursor| {
            let filter = filter.clone();
            let query = query.clone();
            async move {
                let mut body = json!({
                    "filter": {"value": filter, "property": "object"},
                    "page_size": 100,
                });
                if let Some(q) = &query {
                    body["query"] = json!(q);
                }
                if let Some(c) = &cursor {
                    body["start_cursor"] = json!(c);
                }
                let text = self.post(cancel, "search", &body).await?;
                let page: RawSearchResponse = parse_response(200, &text)?;
                Ok((page.results, page.has_more, page.next_cursor))
            }
        })
        .await
    }

    /// `GET /databases/{id}`.
    pub async fn get_database(
        &self,
        cancel: &CancellationToken,
        id: &DatabaseId,
    ) -> Result<RawDatabase, AppError> {
        let endpoint = format!("databases/{}", id.to_dashed());
        let text = self.get(cancel, &endpoint).await?;
        parse_response(200, &text)
    }

    /// `POST /databases/{id}/query`, paginated.
    pub async fn query_database_all(
        &self,
        cancel: &CancellationToken,
        id: &DatabaseId,
        options: &QueryOptions,
    ) -> Result<Vec<RawPage>, AppError> {
        let endpoint = format!("databases/{}/query", id.to_dashed());
        let options = options.clone();
        collect_all(move |cursor| {
            let endpoint = endpoint.clone();
            let options = options.clone();
            async move {
                let mut body = json!({"page_size": 100});
                if let Some(filter) = &options.filter {
                    body["filter"] = filter.clone();
                }
                if let Some(sorts) = &options.sorts {
                    body["sorts"] = sorts.clone();
                }
                if let Some(c) = &cursor {
                    body["start_cursor"] = json!(c);
                }
                let text = self.post(cancel, &endpoint, &body).await?;
                let page: RawQueryResponse = parse_response(200, &text)?;
                Ok((page.results, page.has_more, page.next_cursor))
            }
        })
        .await
    }

    /// `GET /pages/{id}`.
    pub async fn get_page(
        &self,
        cancel: &CancellationToken,
        id: &PageId,
    ) -> Result<RawPage, AppError> {
        let endpoint = format!("pages/{}", id.to_dashed());
        let text = self.get(cancel, &endpoint).await?;
        parse_response(200, &text)
    }

    /// `GET /blocks/{id}/children`, paginated, parsed into flat `Block`
    /// values with empty `children` — the caller recurses separately.
    pub async fn get_block_children_all(
        &self,
        cancel: &CancellationToken,
        id: &BlockId,
    ) -> Result<Vec<Block>, AppError> {
        let endpoint = format!("blocks/{}/children", id.to_dashed());
        let raw_values: Vec<serde_json::Value> = collect_all(move |cursor| {
            let endpoint = endpoint.clone();
            async move {
                let full = match &cursor {
                    Some(c) => format!("{}?start_cursor={}&page_size=100", endpoint, c),
                    None => format!("{}?page_size=100", endpoint),
                };
                let text = self.get(cancel, &full).await?;
                let page: super::types::RawBlockChildrenResponse = parse_response(200, &text)?;
                Ok((page.results, page.has_more, page.next_cursor))
            }
        })
        .await?;

        raw_values.iter().map(parse_raw_block).collect()
    }

    /// Fetches a block's full descendant tree, following `has_children` down
    /// to `max_depth` levels (spec §4.1 — depth is measured from the root
    /// page's top-level blocks, depth 0).
    pub fn get_block_children_recursive<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        id: &'a BlockId,
        max_depth: Option<u32>,
        depth: u32,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<Block>, AppError>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut children = self.get_block_children_all(cancel, id).await?;
            let at_depth_limit = max_depth.map(|limit| depth >= limit).unwrap_or(false);
            if at_depth_limit {
                return Ok(children);
            }
            for child in children.iter_mut() {
                if child.has_children {
                    child.children = self
                        .get_block_children_recursive(cancel, &child.id, max_depth, depth + 1)
                        .await?;
                }
            }
            Ok(children)
        })
    }
}

fn check_status(status: u16, body: &str) -> Result<(), AppError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        parse_response::<serde_json::Value>(status, body).map(|_| ())
    }
}
