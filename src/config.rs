//! Run configuration: the list of competitor sources plus fetch and output settings.
//!
//! Configuration is read once at startup from a YAML file (or JSON when the
//! path ends in `.json`). A missing file falls back to [`Config::default`];
//! any other read or parse failure is fatal.
//!
//! # Example
//!
//! ```yaml
//! competitors:
//!   - name: Anthropic
//!     url: https://www.anthropic.com/news
//!     selector: "main a[href^='/news/']"
//!     category_prefixes: [Announcements, Policy, Product]
//!   - name: OpenAI
//!     url: https://openai.com/blog
//! user_agent: "Mozilla/5.0 (compatible; competitor_watch)"
//! delay_between_requests_ms: 2000
//! ```

use crate::models::Source;
use scraper::Selector;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_delay_between_requests_ms() -> u64 {
    2000
}
fn default_max_items_per_source() -> usize {
    5
}
fn default_max_retries() -> usize {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_reports_dir() -> String {
    "reports".to_string()
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Sources to scrape, in report order.
    pub competitors: Vec<Source>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between consecutive sources.
    #[serde(default = "default_delay_between_requests_ms")]
    pub delay_between_requests_ms: u64,
    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,
    /// Retries on transient fetch errors; 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            competitors: vec![Source::new("OpenAI", "https://openai.com/blog")],
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            delay_between_requests_ms: default_delay_between_requests_ms(),
            max_items_per_source: default_max_items_per_source(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            reports_dir: default_reports_dir(),
        }
    }
}

/// A configuration that parsed but does not describe a runnable setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Item limit for `source`, honouring its override.
    pub fn max_items_for(&self, source: &Source) -> usize {
        source.max_items.unwrap_or(self.max_items_per_source)
    }

    /// Parse configuration text; `json` selects the JSON parser over YAML.
    pub fn parse_str(text: &str, json: bool) -> Result<Self, Box<dyn Error>> {
        let config: Config = if json {
            serde_json::from_str(text)?
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a run depends on.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if:
    /// - No competitors are configured
    /// - A name is empty or used twice
    /// - A URL is not an absolute http(s) URL
    /// - A selector does not parse
    /// - A limit or timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.competitors.is_empty() {
            return Err(ConfigError("no competitors configured".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError("request_timeout_secs must be > 0".into()));
        }
        if self.max_items_per_source == 0 {
            return Err(ConfigError("max_items_per_source must be > 0".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.competitors {
            let name = source.name.trim();
            if name.is_empty() {
                return Err(ConfigError(format!("competitor with url {} has no name", source.url)));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError(format!("duplicate competitor name {name:?}")));
            }
            match Url::parse(&source.url) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => {}
                Ok(u) => {
                    return Err(ConfigError(format!(
                        "{name}: unsupported url scheme {:?}",
                        u.scheme()
                    )));
                }
                Err(e) => return Err(ConfigError(format!("{name}: bad url {:?}: {e}", source.url))),
            }
            if let Err(e) = Selector::parse(&source.selector) {
                return Err(ConfigError(format!(
                    "{name}: bad selector {:?}: {e}",
                    source.selector
                )));
            }
            if source.max_items == Some(0) {
                return Err(ConfigError(format!("{name}: max_items must be > 0")));
            }
        }
        Ok(())
    }
}

/// Load configuration from `path`.
///
/// Falls back to the built-in default when the file does not exist.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_config(path: impl AsRef<Path>) -> Result<Config, Box<dyn Error>> {
    let path = path.as_ref();
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file not found; using default configuration");
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        }
        Err(e) => return Err(Box::new(e)),
    };

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = Config::parse_str(&text, is_json)?;
    info!(
        competitors = config.competitors.len(),
        format = if is_json { "json" } else { "yaml" },
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
competitors:
  - name: Anthropic
    url: https://www.anthropic.com/news
    selector: "main a[href^='/news/']"
    max_items: 15
    category_prefixes: [Announcements, Policy]
  - name: OpenAI
    url: https://openai.com/blog
delay_between_requests_ms: 0
"#;

    #[test]
    fn test_yaml_with_defaults() {
        let config = Config::parse_str(YAML, false).unwrap();
        assert_eq!(config.competitors.len(), 2);
        assert_eq!(config.competitors[1].selector, "article");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.delay_between_requests_ms, 0);
        assert_eq!(config.reports_dir, "reports");
        assert_eq!(config.max_items_for(&config.competitors[0]), 15);
        assert_eq!(config.max_items_for(&config.competitors[1]), 5);
    }

    #[test]
    fn test_json_config() {
        let json = r#"{
            "competitors": [
                {"name": "OpenAI", "url": "https://openai.com/blog", "selector": "article"}
            ],
            "user_agent": "test-agent"
        }"#;
        let config = Config::parse_str(json, true).unwrap();
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_rejects_bad_selector() {
        let yaml = "competitors:\n  - name: X\n    url: https://x.example\n    selector: \"div[[\"\n";
        let err = Config::parse_str(yaml, false).unwrap_err();
        assert!(err.to_string().contains("bad selector"));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut config = Config::default();
        config.competitors.push(Source::new("OpenAI", "https://openai.com/news"));
        let err = config.validate().unwrap_err();
        assert!(err.0.contains("duplicate"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = Config::default();
        config.competitors = vec![Source::new("Local", "file:///etc/passwd")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_competitors() {
        let mut config = Config::default();
        config.competitors.clear();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("nope.yaml")).await.unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(
            &path,
            r#"{"competitors":[{"name":"A","url":"https://a.example"}]}"#,
        )
        .await
        .unwrap();
        let config = load_config(&path).await.unwrap();
        assert_eq!(config.competitors[0].name, "A");
    }

    #[tokio::test]
    async fn test_load_malformed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        tokio::fs::write(&path, "competitors: [").await.unwrap();
        assert!(load_config(&path).await.is_err());
    }
}
