//! Configuration settings structure
//!
//! Defines the settings tree and its file/environment loading logic.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::target::ListingKind;
use crate::{Error, Result};

/// Default browser user agent presented to the site
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// Main configuration settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP client configuration
    pub http: HttpSettings,
    /// Session bootstrap configuration
    pub session: SessionSettings,
    /// Pagination and rate limiting
    pub fetch: FetchSettings,
    /// Token minting configuration
    pub token: TokenSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Result file configuration
    pub output: OutputSettings,
    /// Search targets to scrape
    pub targets: Vec<TargetSettings>,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// User agent for page and API requests
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Optional proxy URL
    pub proxy: Option<String>,
}

/// Session bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Bootstrap attempts before giving up on a target
    pub max_attempts: u32,
    /// Fixed delay between bootstrap attempts, seconds
    pub retry_delay_secs: u64,
    /// Upper bound of random jitter added to the delay, milliseconds
    pub retry_jitter_ms: u64,
    /// Path of the background login call that issues session cookies
    pub auth_path: String,
}

/// Pagination and rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Site origin used for API calls
    pub base_url: String,
    /// Pages requested concurrently per batch
    pub batch_size: u32,
    /// Listings per API page
    pub page_size: u32,
    /// Safety ceiling on pages requested per target
    pub max_pages: u32,
    /// Requests allowed per rate-limit window
    pub rate_limit_permits: u32,
    /// Rate-limit window length, milliseconds
    pub rate_limit_window_ms: u64,
}

/// Token minting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Embed `s1`/`s2`/`s3` in per-request `apitoken` payloads.
    ///
    /// Off by default: the embedded `s3` is the signing secret.
    pub embed_secret_material: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

/// Result file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Path of the JSON results file
    pub path: PathBuf,
}

/// One search to scrape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Display name; derived from the URL when absent
    #[serde(default)]
    pub name: Option<String>,
    /// Search page URL, rendered for bootstrap and sent as referer
    pub url: String,
    /// Which listing API to page through
    #[serde(default)]
    pub kind: ListingKind,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            proxy: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay_secs: 30,
            retry_jitter_ms: 0,
            auth_path: "/api-aggregator/auth/doStaticPageLogin".to_string(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.99acres.com".to_string(),
            batch_size: 5,
            page_size: 25,
            max_pages: 100,
            rate_limit_permits: 5,
            rate_limit_window_ms: 2000,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            embed_secret_material: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scrape_results.json"),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SessionSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn retry_jitter(&self) -> Duration {
        Duration::from_millis(self.retry_jitter_ms)
    }
}

impl FetchSettings {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

/// Read an environment variable and parse it, naming the variable on failure.
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply `ACRES_*` environment overrides
    pub fn merge_with_env(mut self) -> Result<Self> {
        if let Ok(base_url) = std::env::var("ACRES_BASE_URL") {
            self.fetch.base_url = base_url;
        }

        if let Ok(user_agent) = std::env::var("ACRES_USER_AGENT") {
            self.http.user_agent = user_agent;
        }

        // Proxy falls back to the conventional variables
        if let Ok(proxy) = std::env::var("ACRES_PROXY")
            .or_else(|_| std::env::var("HTTPS_PROXY"))
            .or_else(|_| std::env::var("HTTP_PROXY"))
        {
            self.http.proxy = Some(proxy);
        }

        if let Some(timeout) = env_parse("ACRES_HTTP_TIMEOUT")? {
            self.http.timeout_secs = timeout;
        }
        if let Some(batch_size) = env_parse("ACRES_BATCH_SIZE")? {
            self.fetch.batch_size = batch_size;
        }
        if let Some(max_pages) = env_parse("ACRES_MAX_PAGES")? {
            self.fetch.max_pages = max_pages;
        }
        if let Some(permits) = env_parse("ACRES_RATE_LIMIT_PERMITS")? {
            self.fetch.rate_limit_permits = permits;
        }
        if let Some(window) = env_parse("ACRES_RATE_LIMIT_WINDOW_MS")? {
            self.fetch.rate_limit_window_ms = window;
        }
        if let Some(attempts) = env_parse("ACRES_BOOTSTRAP_ATTEMPTS")? {
            self.session.max_attempts = attempts;
        }
        if let Some(delay) = env_parse("ACRES_BOOTSTRAP_DELAY")? {
            self.session.retry_delay_secs = delay;
        }

        if let Ok(path) = std::env::var("ACRES_OUTPUT") {
            self.output.path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("ACRES_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject settings the scraper cannot run with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.fetch.base_url)
            .map_err(|e| Error::config(format!("Invalid base_url {:?}: {}", self.fetch.base_url, e)))?;

        if self.fetch.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.fetch.page_size == 0 {
            return Err(Error::config("page_size must be at least 1"));
        }
        if self.fetch.max_pages == 0 {
            return Err(Error::config("max_pages must be at least 1"));
        }
        if self.fetch.rate_limit_permits == 0 || self.fetch.rate_limit_window_ms == 0 {
            return Err(Error::config(
                "rate limit needs at least one permit and a non-zero window",
            ));
        }
        if self.session.max_attempts == 0 {
            return Err(Error::config("session.max_attempts must be at least 1"));
        }
        if !self.session.auth_path.starts_with('/') {
            return Err(Error::config(format!(
                "session.auth_path must start with '/': {:?}",
                self.session.auth_path
            )));
        }

        for target in &self.targets {
            url::Url::parse(&target.url)
                .map_err(|e| Error::config(format!("Invalid target url {:?}: {}", target.url, e)))?;
        }

        Ok(())
    }

    /// Default config file location, `<config dir>/acres-scout/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("acres-scout").join("config.toml"))
    }
}
