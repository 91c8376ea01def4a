use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for one pipeline instance.
///
/// Loaded from TOML via [`load_config`], or built directly for embedding
/// the pipeline in a larger service.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Directory that backs locally served uploads. A reference like
    /// `/uploads/2025/img.png` resolves to `<local_root>/2025/img.png`.
    pub local_root: PathBuf,
    /// URL path prefix under which `local_root` is served.
    #[serde(default = "default_local_prefix")]
    pub local_prefix: String,
    /// Base of the rewriting image proxy. The original URL is appended
    /// verbatim when retrying a blocked download.
    #[serde(default = "default_proxy_base")]
    pub proxy_base: String,
    /// Hosts known to reject hotlinked downloads. Matched by substring
    /// against the full URL; failures for these hosts retry once through
    /// the proxy.
    #[serde(default = "default_hostile_hosts")]
    pub hostile_hosts: Vec<String>,
    /// URL markers identifying assets that already live in durable
    /// storage. Matching references are never fetched or rewritten.
    #[serde(default = "default_normalized_hosts")]
    pub normalized_hosts: Vec<String>,
    /// Per-request timeout for remote retrieval, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Top-level folder for relocated assets in durable storage.
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,
}

fn default_local_prefix() -> String {
    "/uploads/".to_string()
}
fn default_proxy_base() -> String {
    "https://images.weserv.nl/?url=".to_string()
}
fn default_hostile_hosts() -> Vec<String> {
    vec!["cdn.nlark.com".to_string(), "yuque.com".to_string()]
}
fn default_normalized_hosts() -> Vec<String> {
    vec!["aliyuncs.com".to_string(), "oss-cn-".to_string()]
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_upload_folder() -> String {
    "articles".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("uploads"),
            local_prefix: default_local_prefix(),
            proxy_base: default_proxy_base(),
            hostile_hosts: default_hostile_hosts(),
            normalized_hosts: default_normalized_hosts(),
            timeout_secs: default_timeout_secs(),
            upload_folder: default_upload_folder(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: PipelineConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be > 0");
    }

    if !config.local_prefix.starts_with('/') || !config.local_prefix.ends_with('/') {
        anyhow::bail!(
            "local_prefix must start and end with '/', got '{}'",
            config.local_prefix
        );
    }

    if config.proxy_base.is_empty() && !config.hostile_hosts.is_empty() {
        anyhow::bail!("proxy_base must be set when hostile_hosts is non-empty");
    }

    if config.upload_folder.is_empty() || config.upload_folder.contains('/') {
        anyhow::bail!(
            "upload_folder must be a single path segment, got '{}'",
            config.upload_folder
        );
    }

    Ok(config)
}
