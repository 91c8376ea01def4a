//! Asset retrieval.
//!
//! Local references are read from the configured storage root; remote
//! references are downloaded with a bounded timeout and a realistic
//! browser header set, since many image hosts reject anonymous hotlinked
//! requests. When a download fails for a host on the hostile list, one
//! retry goes through the rewriting proxy before giving up.
//!
//! A failed fetch is never fatal for a batch: callers receive the error
//! in a per-reference result and keep the original link.

use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, PRAGMA, REFERER, USER_AGENT,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{ImageOrigin, ImageReference};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_REFERER: &str = "https://www.google.com/";
const BROWSER_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Raw bytes plus the declared content type of a fetched asset.
#[derive(Debug)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct AssetFetcher {
    client: Client,
    config: PipelineConfig,
}

impl AssetFetcher {
    pub fn new(config: PipelineConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Retrieve the bytes behind one classified reference.
    pub async fn fetch(&self, reference: &ImageReference) -> Result<FetchedAsset, PipelineError> {
        match reference.origin {
            ImageOrigin::Local => self.read_local(&reference.original_url),
            ImageOrigin::Remote => self.fetch_remote(&reference.original_url).await,
            // The scanner never extracts normalized references.
            ImageOrigin::Normalized => Err(PipelineError::Fetch {
                url: reference.original_url.clone(),
                reason: "reference is already normalized".to_string(),
            }),
        }
    }

    /// Read a locally served asset from disk. The URL path has the
    /// serving prefix stripped and is joined onto the storage root;
    /// traversal outside the root is rejected.
    fn read_local(&self, url_path: &str) -> Result<FetchedAsset, PipelineError> {
        let relative = url_path
            .strip_prefix(&self.config.local_prefix)
            .unwrap_or_else(|| url_path.trim_start_matches('/'));

        if relative.split('/').any(|seg| seg == "..") {
            return Err(PipelineError::LocalRead {
                path: url_path.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "path escapes local storage root",
                ),
            });
        }

        let path = self.config.local_root.join(relative);
        let bytes = std::fs::read(&path).map_err(|source| PipelineError::LocalRead {
            path: path.display().to_string(),
            source,
        })?;

        Ok(FetchedAsset {
            bytes,
            content_type: None,
        })
    }

    async fn fetch_remote(&self, url: &str) -> Result<FetchedAsset, PipelineError> {
        match self.try_download(url).await {
            Ok(asset) => Ok(asset),
            Err(reason) if self.is_hostile(url) => {
                debug!(url, %reason, "direct download failed, retrying through image proxy");
                let proxy_url = format!("{}{}", self.config.proxy_base, url);
                self.try_download(&proxy_url)
                    .await
                    .map_err(|reason| PipelineError::ProxyFetch {
                        url: url.to_string(),
                        reason,
                    })
            }
            Err(reason) => Err(PipelineError::Fetch {
                url: url.to_string(),
                reason,
            }),
        }
    }

    fn is_hostile(&self, url: &str) -> bool {
        self.config
            .hostile_hosts
            .iter()
            .any(|host| url.contains(host.as_str()))
    }

    async fn try_download(&self, url: &str) -> Result<FetchedAsset, String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(REFERER, BROWSER_REFERER)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let bytes = response.bytes().await.map_err(|e| e.to_string())?.to_vec();

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}
