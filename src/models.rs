//! Core data models used throughout the pipeline.
//!
//! These types represent the document snapshots, image references, and
//! per-reference outcomes that flow through scan → fetch → rewrite, plus
//! the per-run dedup cache shared across documents in one export batch.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::PipelineError;

/// Snapshot of a document record supplied by the document store.
///
/// The pipeline never mutates a snapshot: export operates on a copy and
/// ingestion returns a new body for the caller to persist.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where an image reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Served by this host under the local upload prefix.
    Local,
    /// An external `http(s)://` URL.
    Remote,
    /// Already relative (`./`, `../`) or already in durable storage.
    /// Never fetched, never rewritten.
    Normalized,
}

/// One unique image link found in a document body.
///
/// Created by the scanner per distinct original URL; immutable afterwards.
/// Every occurrence of the same URL in the body is replaced by the same
/// `placeholder` token.
#[derive(Debug, Clone)]
pub struct ImageReference {
    pub alt: String,
    pub original_url: String,
    pub origin: ImageOrigin,
    pub placeholder: String,
}

/// Per-reference outcome of the fetch/relocate stage.
///
/// The raw bytes are consumed by the sink (archive entry or object store)
/// before rewriting; this record keeps only what the rewriter needs.
#[derive(Debug)]
pub struct FetchResult {
    pub reference: ImageReference,
    /// Archive filename or durable-storage URL when the asset was
    /// relocated; `None` when it was skipped or failed.
    pub resolved: Option<String>,
    pub error: Option<PipelineError>,
}

impl FetchResult {
    pub fn success(reference: ImageReference, resolved: String) -> Self {
        Self {
            reference,
            resolved: Some(resolved),
            error: None,
        }
    }

    /// The reference was deliberately left alone (e.g. a local image on
    /// the ingestion path). Rewrites back to the original link.
    pub fn skipped(reference: ImageReference) -> Self {
        Self {
            reference,
            resolved: None,
            error: None,
        }
    }

    pub fn failure(reference: ImageReference, error: PipelineError) -> Self {
        Self {
            reference,
            resolved: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Result of running the pipeline over one document body.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The rewritten body. Contains no placeholder tokens: every one is
    /// replaced by either a new reference or the original link.
    pub body: String,
    /// Whether `body` differs byte-for-byte from the input.
    pub changed: bool,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PipelineOutcome {
    /// Outcome for a body that needed no work at all.
    pub fn unchanged(body: &str, skipped: usize) -> Self {
        Self {
            body: body.to_string(),
            changed: false,
            succeeded: 0,
            skipped,
            failed: 0,
        }
    }
}

/// Per-run cache mapping original URL → assigned asset filename, plus the
/// set of names already handed out.
///
/// Scoped to one export or normalize invocation and passed explicitly
/// through the pipeline; never ambient, never persisted. Consulting it
/// before any network or disk access guarantees each URL is fetched at
/// most once per run, and the name set guarantees two different URLs can
/// never collide on one filename.
#[derive(Debug, Default)]
pub struct DedupCache {
    by_url: HashMap<String, String>,
    used_names: HashSet<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filename previously assigned to this URL, if any.
    pub fn get(&self, url: &str) -> Option<&str> {
        self.by_url.get(url).map(String::as_str)
    }

    /// Returns `candidate` if no other URL holds it, otherwise a variant
    /// with a short random suffix inserted before the extension.
    pub fn unique_name(&self, candidate: &str) -> String {
        if !self.used_names.contains(candidate) {
            return candidate.to_string();
        }
        let (stem, ext) = match candidate.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{ext}")),
            None => (candidate, String::new()),
        };
        loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let name = format!("{}-{}{}", stem, &suffix[..8], ext);
            if !self.used_names.contains(&name) {
                return name;
            }
        }
    }

    /// Record the assignment once the asset has actually been written.
    pub fn insert(&mut self, url: &str, name: &str) {
        self.by_url.insert(url.to_string(), name.to_string());
        self.used_names.insert(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}
