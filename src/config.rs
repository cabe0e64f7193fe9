use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub root: Root,
    pub server: Server,
    pub auth: Auth,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub fetch: Fetch,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Root { pub root_dir: PathBuf }

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
    /// Mount prefix of the UI: empty, or `/name` without a trailing slash.
    #[serde(default)]
    pub base_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Auth {
    pub bearer_token: String,
    /// Origins accepted on POST. Empty disables the check.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    pub max_request_kb: usize,
    pub max_upload_kb: usize,
    pub max_fetch_kb: usize,
    pub max_edit_kb: usize,
    pub preview_chars: usize,
    pub max_search_results: usize,
    pub rate_per_sec: u32,
    pub rate_burst: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_request_kb: 1024,
            max_upload_kb: 50 * 1024,
            max_fetch_kb: 50 * 1024,
            max_edit_kb: 2048,
            preview_chars: 500,
            max_search_results: 100,
            rate_per_sec: 20,
            rate_burst: 40,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Fetch {
    pub enabled: bool,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "timeout_s")]
    pub timeout: Duration,
}

impl Default for Fetch {
    fn default() -> Self {
        Self { enabled: true, timeout: Duration::from_secs(30) }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Log {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.root.root_dir.is_dir() {
            anyhow::bail!("root_dir does not exist or is not a directory: {}", self.root.root_dir.display());
        }
        if self.auth.bearer_token.trim().is_empty() { anyhow::bail!("bearer_token must not be empty"); }
        let base = &self.server.base_path;
        if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
            anyhow::bail!("base_path must be empty or start with '/' and not end with '/': {base}");
        }
        if self.limits.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        if self.limits.max_upload_kb == 0 { anyhow::bail!("max_upload_kb must be > 0"); }
        if self.limits.max_fetch_kb == 0 { anyhow::bail!("max_fetch_kb must be > 0"); }
        if self.limits.max_edit_kb == 0 { anyhow::bail!("max_edit_kb must be > 0"); }
        if self.limits.rate_per_sec == 0 || self.limits.rate_burst == 0 {
            anyhow::bail!("rate_per_sec and rate_burst must be > 0");
        }
        if self.fetch.enabled && self.fetch.timeout.is_zero() { anyhow::bail!("fetch timeout_s must be > 0"); }
        Ok(())
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(root: &Path) -> Self {
        Config {
            root: Root { root_dir: root.to_path_buf() },
            server: Server { bind_addr: "127.0.0.1".into(), port: 0, base_path: String::new() },
            auth: Auth { bearer_token: "t".into(), allowed_origins: vec!["https://good".into()] },
            limits: Limits::default(),
            fetch: Fetch { enabled: true, timeout: Duration::from_secs(5) },
            log: Log::default(),
        }
    }
}
