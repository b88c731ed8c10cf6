//! Content-addressed asset downloader: fetches Notion-hosted blobs referenced
//! by blocks and property values, skips everything else, and deduplicates
//! concurrently by URL with an atomic check-and-reserve per URL so two
//! concurrent callers for the same asset trigger exactly one download
//! (spec §4.2).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::types::NodeId;

const NOTION_ASSET_HOSTS: &[&str] = &[
    "s3.us-west-2.amazonaws.com",
    "prod-files-secure.s3.us-west-2.amazonaws.com",
    "secure.notion-static.com",
    "www.notion.so",
];

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Clone, Copy)]
pub struct AssetStats {
    pub downloaded: u64,
    pub skipped: u64,
    pub errors: u64,
}

pub struct AssetDownloader {
    client: reqwest::Client,
    workspace_root: PathBuf,
    /// One `OnceCell` reserved per URL via `DashMap::entry`, so the
    /// reservation itself is atomic: whichever caller's `or_insert_with`
    /// wins creates the cell, and every caller — the winner included — then
    /// races to initialize it through `get_or_try_init`, which runs the
    /// download exactly once and hands the same result to every waiter
    /// (spec §4.2).
    cache: DashMap<String, Arc<OnceCell<String>>>,
    downloaded: AtomicU64,
    skipped: AtomicU64,
    errors: AtomicU64,
}

impl AssetDownloader {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        Ok(Self {
            client,
            workspace_root: workspace_root.into(),
            cache: DashMap::new(),
            downloaded: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    pub fn stats(&self) -> AssetStats {
        AssetStats {
            downloaded: self.downloaded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn is_notion_hosted(url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        NOTION_ASSET_HOSTS
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// Downloads `url` into the directory owned by `node_id`, returning the
    /// filename (relative to that directory) to store on the record/block.
    /// Empty URLs and non-Notion hosts are returned unchanged without error.
    pub async fn download_asset(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        url: &str,
    ) -> Result<String, AppError> {
        if url.is_empty() {
            return Ok(String::new());
        }

        if !Self::is_notion_hosted(url) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(url.to_string());
        }

        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let cell = self
            .cache
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_try_init(|| self.fetch_and_store(cancel, node_id, url))
            .await
            .map(|filename| filename.clone())
    }

    /// Runs on behalf of whichever caller wins the race to initialize a
    /// URL's `OnceCell`. Left uninitialized on error, so a later call (by
    /// this or another caller) gets to retry the download.
    async fn fetch_and_store(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        url: &str,
    ) -> Result<String, AppError> {
        let filename = Self::derive_filename(url);
        let node_dir = self.workspace_root.join(node_id.to_string());
        tokio::fs::create_dir_all(&node_dir).await?;
        let dest = node_dir.join(&filename);

        match self.stream_to_disk(cancel, url, &dest).await {
            Ok(()) => {
                self.downloaded.fetch_add(1, Ordering::Relaxed);
                Ok(filename)
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&dest).await;
                self.errors.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    async fn stream_to_disk(
        &self,
        cancel: &CancellationToken,
        url: &str,
        dest: &Path,
    ) -> Result<(), AppError> {
        use futures::StreamExt;
        use tokio::io::AsyncWriteExt;

        let response = tokio::select! {
            result = self.client.get(url).send() => result?,
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
        };
        if !response.status().is_success() {
            return Err(AppError::ApiError {
                status: response.status().as_u16(),
                code: crate::error::NotionErrorCode::from_http_status(response.status().as_u16()),
                message: format!("asset download failed for {}", url),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            file.write_all(&chunk?).await?;
        }
        Ok(())
    }

    fn derive_filename(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        let prefix = digest[..8].iter().map(|b| format!("{:02x}", b)).collect::<String>();

        let basename = url::Url::parse(url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .path_segments()
                    .and_then(|segments| segments.last().map(|s| s.to_string()))
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "asset".to_string());

        format!("{}-{}", prefix, basename)
    }

    /// Extracts `file.url`/`external.url` from a media block and delegates.
    pub async fn process_media_block(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        url: &str,
    ) -> Result<String, AppError> {
        self.download_asset(cancel, node_id, url).await
    }

    /// Emoji icons pass through untouched; file/external icons download.
    pub async fn process_icon(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        icon: &crate::api::types::RawIcon,
    ) -> Result<Option<String>, AppError> {
        if let Some(emoji) = icon.as_emoji() {
            return Ok(Some(emoji.to_string()));
        }
        match icon.url() {
            Some(url) => self.download_asset(cancel, node_id, url).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn process_cover(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        cover: &crate::api::types::RawFile,
    ) -> Result<String, AppError> {
        self.download_asset(cancel, node_id, cover.url()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_notion_hosted_subdomains() {
        assert!(AssetDownloader::is_notion_hosted(
            "https://prod-files-secure.s3.us-west-2.amazonaws.com/abc/def.png"
        ));
        assert!(AssetDownloader::is_notion_hosted(
            "https://www.notion.so/image.png"
        ));
        assert!(!AssetDownloader::is_notion_hosted("https://example.com/image.png"));
    }

    #[test]
    fn derives_stable_hash_prefixed_filename() {
        let a = AssetDownloader::derive_filename("https://secure.notion-static.com/x/y/photo.png?x=1");
        let b = AssetDownloader::derive_filename("https://secure.notion-static.com/x/y/photo.png?x=1");
        assert_eq!(a, b);
        assert!(a.ends_with("-photo.png"));
    }
}
