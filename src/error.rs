//! Pipeline error taxonomy.
//!
//! Per-reference failures (`LocalRead`, `Fetch`, `ProxyFetch`, `Store`,
//! `ArchiveEntry`) are absorbed by the pipeline: the original link is kept
//! and the failure is counted, never propagated. Only `ArchiveFinalize` is
//! fatal for an export call.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read local asset {path}: {source}")]
    LocalRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("proxy fetch also failed for {url}: {reason}")]
    ProxyFetch { url: String, reason: String },

    #[error("failed to upload asset {key}: {reason}")]
    Store { key: String, reason: String },

    #[error("failed to write archive entry {name}: {reason}")]
    ArchiveEntry { name: String, reason: String },

    #[error("failed to finalize archive: {0}")]
    ArchiveFinalize(String),
}
