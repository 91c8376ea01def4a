//! Image reference scanner.
//!
//! Finds `![alt](target)` occurrences in a Markdown body, classifies each
//! target by origin, and replaces every extractable occurrence with a
//! placeholder token. The first occurrence of a distinct URL creates one
//! [`ImageReference`]; later occurrences of the same URL reuse its token,
//! so a URL repeated in one document is fetched once and rewritten
//! identically everywhere.
//!
//! Already-normalized targets (relative paths, durable-storage URLs) and
//! unrecognized schemes are left verbatim. Malformed link syntax is not
//! matched and survives untouched.

use regex::Regex;
use std::collections::HashMap;

use crate::models::{ImageOrigin, ImageReference};

/// Markdown image link: `![alt](target)`. Unbalanced brackets or parens
/// do not match.
const IMAGE_LINK_PATTERN: &str = r"!\[([^\]]*)\]\(([^)]+)\)";

/// Body with placeholders in place of extractable links, plus the
/// references they stand for, in scan order.
#[derive(Debug)]
pub struct ScanOutcome {
    pub marked_body: String,
    pub references: Vec<ImageReference>,
}

pub struct ReferenceScanner {
    image_link: Regex,
    local_prefix: String,
    normalized_hosts: Vec<String>,
}

impl ReferenceScanner {
    pub fn new(local_prefix: &str, normalized_hosts: &[String]) -> Self {
        Self {
            image_link: Regex::new(IMAGE_LINK_PATTERN).expect("static image link pattern"),
            local_prefix: local_prefix.to_string(),
            normalized_hosts: normalized_hosts.to_vec(),
        }
    }

    /// Classify a link target. `None` means an unrecognized scheme that
    /// the pipeline leaves alone.
    pub fn classify(&self, target: &str) -> Option<ImageOrigin> {
        if target.starts_with("./") || target.starts_with("../") {
            return Some(ImageOrigin::Normalized);
        }
        if self.normalized_hosts.iter().any(|h| target.contains(h.as_str())) {
            return Some(ImageOrigin::Normalized);
        }
        if target.starts_with(&self.local_prefix) {
            return Some(ImageOrigin::Local);
        }
        if target.starts_with("http://") || target.starts_with("https://") {
            return Some(ImageOrigin::Remote);
        }
        None
    }

    /// Extract image references from `body`.
    ///
    /// Local and remote occurrences are replaced by placeholder tokens;
    /// everything else is copied through unchanged.
    pub fn scan(&self, body: &str) -> ScanOutcome {
        let mut marked = String::with_capacity(body.len());
        let mut references: Vec<ImageReference> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut last = 0;

        for caps in self.image_link.captures_iter(body) {
            let whole = caps.get(0).expect("capture group 0 always present");
            let alt = &caps[1];
            let target = &caps[2];

            marked.push_str(&body[last..whole.start()]);
            last = whole.end();

            let origin = match self.classify(target) {
                Some(ImageOrigin::Normalized) | None => {
                    marked.push_str(whole.as_str());
                    continue;
                }
                Some(origin) => origin,
            };

            let placeholder = match seen.get(target) {
                Some(&index) => references[index].placeholder.clone(),
                None => {
                    let placeholder = format!("__IMG_PLACEHOLDER_{}__", references.len());
                    seen.insert(target.to_string(), references.len());
                    references.push(ImageReference {
                        alt: alt.to_string(),
                        original_url: target.to_string(),
                        origin,
                        placeholder: placeholder.clone(),
                    });
                    placeholder
                }
            };
            marked.push_str(&placeholder);
        }
        marked.push_str(&body[last..]);

        ScanOutcome {
            marked_body: marked,
            references,
        }
    }
}
