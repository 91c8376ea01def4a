//! Placeholder substitution.
//!
//! Replaces every placeholder token the scanner introduced with its final
//! reference form. Successfully relocated assets get the consumer's final
//! form (relative archive path for export, storage URL for ingestion);
//! skipped or failed references get their original link back. Keying the
//! substitution by the exact token, not the raw URL, keeps it safe when
//! one URL is a substring of another.

use crate::models::FetchResult;

/// Substitute all placeholders in `marked_body`.
///
/// `final_form(alt, resolved)` renders the new link for a relocated
/// asset. Every placeholder is replaced exactly once; no bare token
/// survives in the output.
pub fn rewrite<F>(marked_body: &str, results: &[FetchResult], final_form: F) -> String
where
    F: Fn(&str, &str) -> String,
{
    let mut body = marked_body.to_string();
    for result in results {
        let reference = &result.reference;
        let replacement = match &result.resolved {
            Some(resolved) => final_form(&reference.alt, resolved),
            None => format!("![{}]({})", reference.alt, reference.original_url),
        };
        body = body.replace(&reference.placeholder, &replacement);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{ImageOrigin, ImageReference};

    fn reference(url: &str, placeholder: &str) -> ImageReference {
        ImageReference {
            alt: "pic".to_string(),
            original_url: url.to_string(),
            origin: ImageOrigin::Remote,
            placeholder: placeholder.to_string(),
        }
    }

    fn archive_form(alt: &str, name: &str) -> String {
        format!("![{alt}](./images/{name})")
    }

    #[test]
    fn test_success_uses_final_form() {
        let results = vec![FetchResult::success(
            reference("https://a/x.png", "__IMG_PLACEHOLDER_0__"),
            "x.png".to_string(),
        )];
        let body = rewrite("see __IMG_PLACEHOLDER_0__ here", &results, archive_form);
        assert_eq!(body, "see ![pic](./images/x.png) here");
    }

    #[test]
    fn test_failure_restores_original_link() {
        let results = vec![FetchResult::failure(
            reference("https://a/x.png", "__IMG_PLACEHOLDER_0__"),
            PipelineError::Fetch {
                url: "https://a/x.png".to_string(),
                reason: "HTTP 404".to_string(),
            },
        )];
        let body = rewrite("__IMG_PLACEHOLDER_0__", &results, archive_form);
        assert_eq!(body, "![pic](https://a/x.png)");
    }

    #[test]
    fn test_skipped_restores_original_link() {
        let results = vec![FetchResult::skipped(reference(
            "/uploads/x.png",
            "__IMG_PLACEHOLDER_0__",
        ))];
        let body = rewrite("__IMG_PLACEHOLDER_0__", &results, archive_form);
        assert_eq!(body, "![pic](/uploads/x.png)");
    }

    #[test]
    fn test_repeated_placeholder_replaced_everywhere() {
        let results = vec![FetchResult::success(
            reference("https://a/x.png", "__IMG_PLACEHOLDER_0__"),
            "x.png".to_string(),
        )];
        let body = rewrite(
            "__IMG_PLACEHOLDER_0__ mid __IMG_PLACEHOLDER_0__",
            &results,
            archive_form,
        );
        assert_eq!(
            body,
            "![pic](./images/x.png) mid ![pic](./images/x.png)"
        );
        assert!(!body.contains("__IMG_PLACEHOLDER_"));
    }

    #[test]
    fn test_token_indices_do_not_collide() {
        // Placeholder 1 must not eat the prefix of placeholder 10.
        let mut results = Vec::new();
        for i in 0..11 {
            results.push(FetchResult::success(
                reference(
                    &format!("https://a/{i}.png"),
                    &format!("__IMG_PLACEHOLDER_{i}__"),
                ),
                format!("{i}.png"),
            ));
        }
        let body = rewrite(
            "__IMG_PLACEHOLDER_1__ __IMG_PLACEHOLDER_10__",
            &results,
            archive_form,
        );
        assert_eq!(body, "![pic](./images/1.png) ![pic](./images/10.png)");
    }
}
