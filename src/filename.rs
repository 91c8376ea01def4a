//! Asset filename derivation.
//!
//! A fetched asset gets its name from the URL's last path segment when
//! that carries an extension; otherwise a random stem plus an extension
//! inferred from the declared content type. Random stems (rather than
//! timestamps) make names collision-free across documents in one batch.

use uuid::Uuid;

/// Derive a filename for an asset fetched from `original_url`.
pub fn resolve(original_url: &str, content_type: Option<&str>) -> String {
    let segment = last_segment(original_url);
    if !segment.is_empty() && segment.contains('.') {
        return segment.to_string();
    }
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        extension_for(content_type)
    )
}

/// Extension for a relocated asset: from the URL path when present and
/// plausible, else from the declared content type.
pub fn extension(original_url: &str, content_type: Option<&str>) -> String {
    let segment = last_segment(original_url);
    if let Some((_, ext)) = segment.rsplit_once('.') {
        // Reject things like ".com/page" remnants or query garbage.
        if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return format!(".{ext}");
        }
    }
    extension_for(content_type).to_string()
}

/// Last path segment of the URL with query string and fragment stripped.
fn last_segment(url: &str) -> &str {
    let path = url
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(url);
    let path = path
        .split_once('#')
        .map(|(path, _)| path)
        .unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    if ct.contains("jpeg") || ct.contains("jpg") {
        ".jpg"
    } else if ct.contains("png") {
        ".png"
    } else if ct.contains("gif") {
        ".gif"
    } else if ct.contains("webp") {
        ".webp"
    } else if ct.contains("svg") {
        ".svg"
    } else {
        ".jpg"
    }
}
