//! Ingestion-time image relocation.
//!
//! Rewrites one document body so that externally hosted images live in
//! durable storage instead: every remote reference is downloaded and
//! uploaded under a date-partitioned, collision-free key, then the link
//! is pointed at the returned storage URL. Local and already-normalized
//! references are untouched, and a failed download keeps the original
//! link. The caller persists the new body only when `changed` is set.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetch::AssetFetcher;
use crate::filename;
use crate::models::{FetchResult, ImageOrigin, PipelineOutcome};
use crate::rewrite;
use crate::scan::ReferenceScanner;
use crate::store::ObjectStore;

pub struct Normalizer {
    scanner: ReferenceScanner,
    fetcher: AssetFetcher,
    store: Arc<dyn ObjectStore>,
    folder: String,
}

impl Normalizer {
    pub fn new(config: PipelineConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let scanner = ReferenceScanner::new(&config.local_prefix, &config.normalized_hosts);
        let folder = config.upload_folder.clone();
        let fetcher = AssetFetcher::new(config)?;
        Ok(Self {
            scanner,
            fetcher,
            store,
            folder,
        })
    }

    /// Relocate remote images in `body` into durable storage.
    ///
    /// Returns the rewritten body and `changed = false` when it is
    /// byte-identical to the input, signaling the caller to skip
    /// persistence. Never fails the whole call for a single reference.
    pub async fn normalize(&self, body: &str) -> PipelineOutcome {
        // Cheap pre-check before any regex work.
        if !body.contains("![") {
            return PipelineOutcome::unchanged(body, 0);
        }

        let scan = self.scanner.scan(body);
        let remote_count = scan
            .references
            .iter()
            .filter(|r| r.origin == ImageOrigin::Remote)
            .count();
        if remote_count == 0 {
            // Nothing needs relocation; leave the body untouched.
            return PipelineOutcome::unchanged(body, scan.references.len());
        }

        let mut results = Vec::with_capacity(scan.references.len());
        for reference in scan.references {
            if reference.origin != ImageOrigin::Remote {
                results.push(FetchResult::skipped(reference));
                continue;
            }

            let asset = match self.fetcher.fetch(&reference).await {
                Ok(asset) => asset,
                Err(error) => {
                    warn!(
                        url = %reference.original_url,
                        %error,
                        "image download failed, keeping original link"
                    );
                    results.push(FetchResult::failure(reference, error));
                    continue;
                }
            };

            let key = self.storage_key(&reference.original_url, asset.content_type.as_deref());
            let content_type = asset
                .content_type
                .as_deref()
                .unwrap_or("application/octet-stream");
            match self.store.upload(&key, &asset.bytes, content_type).await {
                Ok(url) => {
                    debug!(url = %reference.original_url, stored = %url, "image relocated");
                    results.push(FetchResult::success(reference, url));
                }
                Err(error) => {
                    warn!(%key, %error, "asset upload failed, keeping original link");
                    results.push(FetchResult::failure(
                        reference,
                        PipelineError::Store {
                            key,
                            reason: error.to_string(),
                        },
                    ));
                }
            }
        }

        let new_body = rewrite::rewrite(&scan.marked_body, &results, |alt, url| {
            format!("![{alt}]({url})")
        });

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        let skipped = results.len() - succeeded - failed;

        PipelineOutcome {
            changed: new_body != body,
            body: new_body,
            succeeded,
            skipped,
            failed,
        }
    }

    /// Date-partitioned storage key: `<folder>/<yyyy>/<mm>/<dd>/<id><ext>`.
    fn storage_key(&self, original_url: &str, content_type: Option<&str>) -> String {
        format!(
            "{}/{}/{}{}",
            self.folder,
            Utc::now().format("%Y/%m/%d"),
            Uuid::new_v4(),
            filename::extension(original_url, content_type)
        )
    }
}
