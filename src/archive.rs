//! Export bundle assembly.
//!
//! Packages a batch of documents into one ZIP archive: each document
//! becomes a Markdown entry with generated YAML front matter, and every
//! uniquely fetched image lands once under `images/`. A dedup cache
//! shared across the batch guarantees an asset referenced by several
//! documents is downloaded and stored exactly once.
//!
//! Failures fetching one asset or writing one entry are logged and
//! skipped; the only fatal error is a failure to finalize the archive
//! itself, so callers always receive a complete (if best-effort) bundle.

use anyhow::Result;
use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::fetch::AssetFetcher;
use crate::filename;
use crate::models::{DedupCache, Document, FetchResult};
use crate::rewrite;
use crate::scan::ReferenceScanner;

/// Maximum length of the sanitized title part of a document entry name.
const MAX_TITLE_LEN: usize = 50;

type ZipSink = ZipWriter<Cursor<Vec<u8>>>;

pub struct ArchiveBuilder {
    scanner: ReferenceScanner,
    fetcher: AssetFetcher,
}

impl ArchiveBuilder {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let scanner = ReferenceScanner::new(&config.local_prefix, &config.normalized_hosts);
        let fetcher = AssetFetcher::new(config)?;
        Ok(Self { scanner, fetcher })
    }

    /// Export `documents` as a single in-memory ZIP archive.
    ///
    /// The archive holds one `<id>-<title>.md` entry per document and one
    /// `images/<filename>` entry per unique asset. Serialized only after
    /// every document has been processed; partial output is never
    /// returned.
    pub async fn export_to_zip(&self, documents: &[Document]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut cache = DedupCache::new();

        for document in documents {
            let content = format!("{}{}", front_matter(document), document.body);
            let scan = self.scanner.scan(&content);

            let mut results = Vec::with_capacity(scan.references.len());
            for reference in scan.references {
                // An asset already bundled for an earlier document (or an
                // earlier reference) is reused verbatim.
                if let Some(name) = cache.get(&reference.original_url) {
                    results.push(FetchResult::success(reference, name.to_string()));
                    continue;
                }

                let asset = match self.fetcher.fetch(&reference).await {
                    Ok(asset) => asset,
                    Err(error) => {
                        warn!(
                            url = %reference.original_url,
                            %error,
                            "asset fetch failed, keeping original link"
                        );
                        results.push(FetchResult::failure(reference, error));
                        continue;
                    }
                };

                let candidate =
                    filename::resolve(&reference.original_url, asset.content_type.as_deref());
                let name = cache.unique_name(&candidate);
                match add_entry(&mut zip, &format!("images/{name}"), &asset.bytes, options) {
                    Ok(()) => {
                        cache.insert(&reference.original_url, &name);
                        results.push(FetchResult::success(reference, name));
                    }
                    Err(error) => {
                        warn!(asset = %name, %error, "failed to add asset to archive");
                        results.push(FetchResult::failure(reference, error));
                    }
                }
            }

            let body = rewrite::rewrite(&scan.marked_body, &results, |alt, name| {
                format!("![{alt}](./images/{name})")
            });

            let succeeded = results.iter().filter(|r| r.is_success()).count();
            let failed = results.len() - succeeded;
            debug!(
                document = document.id,
                succeeded, failed, "document processed"
            );

            let entry_name = document_filename(document);
            if let Err(error) = add_entry(&mut zip, &entry_name, body.as_bytes(), options) {
                warn!(entry = %entry_name, %error, "failed to add document to archive, skipping");
                continue;
            }
        }

        let cursor = zip
            .finish()
            .map_err(|e| PipelineError::ArchiveFinalize(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

fn add_entry(
    zip: &mut ZipSink,
    name: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> Result<(), PipelineError> {
    zip.start_file(name, options)
        .map_err(|e| PipelineError::ArchiveEntry {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    zip.write_all(data).map_err(|e| PipelineError::ArchiveEntry {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// YAML front matter block describing one document.
fn front_matter(document: &Document) -> String {
    let mut block = format!(
        "---\ntitle: {}\nauthor: {}\ncategory: {}\ncreated_at: {}\nupdated_at: {}\nstatus: {}\n",
        escape_yaml(&document.title),
        escape_yaml(&document.author),
        escape_yaml(&document.category),
        document.created_at.format("%Y-%m-%d %H:%M:%S"),
        document.updated_at.format("%Y-%m-%d %H:%M:%S"),
        document.status,
    );

    if !document.tags.is_empty() {
        let tags: Vec<String> = document.tags.iter().map(|t| escape_yaml(t)).collect();
        block.push_str(&format!("tags: [{}]\n", tags.join(", ")));
    }

    block.push_str("---\n\n");
    block
}

/// Quote values carrying YAML-significant characters, escaping internal
/// quotes.
fn escape_yaml(value: &str) -> String {
    if value.contains([':', '#', '"', '\'']) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Archive entry name for a document: `<id>-<sanitized title>.md`.
fn document_filename(document: &Document) -> String {
    let title: String = document
        .title
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_TITLE_LEN)
        .collect();
    format!("{}-{}.md", document.id, title)
}
