//! # Markdown Pipeline
//!
//! An asset pipeline for Markdown documents: scans body text for embedded
//! image references, resolves each reference to binary content (local
//! storage, remote origins, with a proxy fallback for hosts that reject
//! hotlinking), deduplicates repeated references, and rewrites the text to
//! point at a new, stable location for every asset.
//!
//! Two consumers share the machinery:
//!
//! - **Export**: bundle a batch of documents plus their images into a
//!   single portable ZIP archive ([`archive::ArchiveBuilder`]).
//! - **Ingestion**: relocate externally hosted images into durable object
//!   storage and rewrite the body in place ([`normalize::Normalizer`]).
//!
//! ## Architecture
//!
//! ```text
//! body ──▶ ReferenceScanner ──▶ AssetFetcher ──▶ FilenameResolver
//!              (scan)            (fetch/proxy)      (resolve)
//!                                     │
//!                                     ▼
//!                                 Rewriter ──▶ { ArchiveBuilder | Normalizer }
//!                                 (rewrite)       ZIP bundle      ObjectStore
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and the per-run dedup cache |
//! | [`error`] | Pipeline error taxonomy |
//! | [`scan`] | Image reference extraction and classification |
//! | [`fetch`] | Local/remote asset retrieval with proxy fallback |
//! | [`filename`] | Collision-resistant asset filename derivation |
//! | [`rewrite`] | Placeholder substitution |
//! | [`archive`] | ZIP export bundle assembly |
//! | [`normalize`] | Ingestion-time image relocation |
//! | [`store`] | Durable object storage abstraction |

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod models;
pub mod normalize;
pub mod rewrite;
pub mod scan;
pub mod store;
