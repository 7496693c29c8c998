//! Configuration system (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chat::FileAccessMode;
use crate::error::{KhojError, Result};
use crate::types::Location;

pub const DEFAULT_SERVER_URL: &str = "https://app.khoj.dev";
pub const DEFAULT_CLIENT: &str = "khoj-chat";

/// Client configuration.
///
/// [`KhojConfig::load`] reads `~/.khoj/config.toml` if present, then
/// overlays environment variables (`.env` included). Fields set in code
/// after loading win over both.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KhojConfig {
    /// Base URL of the Khoj server, without a trailing slash.
    pub url: String,
    pub api_key: Option<String>,
    /// Number of note results the server retrieves per query.
    pub results_count: u32,
    /// Agent slug used when creating new conversations.
    pub agent: Option<String>,
    pub file_access: FileAccessMode,
    pub timeout_secs: u64,
    /// Value of the `client` query parameter on chat requests.
    pub client: String,
    pub location: Location,
}

impl fmt::Debug for KhojConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KhojConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("results_count", &self.results_count)
            .field("agent", &self.agent)
            .field("file_access", &self.file_access)
            .field("timeout_secs", &self.timeout_secs)
            .field("client", &self.client)
            .field("location", &self.location)
            .finish()
    }
}

impl Default for KhojConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            api_key: None,
            results_count: 5,
            agent: None,
            file_access: FileAccessMode::None,
            timeout_secs: 120,
            client: DEFAULT_CLIENT.to_string(),
            location: Location::default(),
        }
    }
}

impl KhojConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| KhojError::Configuration(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| KhojError::Configuration(e.to_string()))
    }

    /// `~/.khoj/config.toml`.
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".khoj"))
            .unwrap_or_else(|| PathBuf::from(".khoj"))
            .join("config.toml")
    }

    /// Config file (if any), then environment, then validation.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            tracing::debug!(path = %path.display(), "Loading config file");
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        let _ = dotenvy::dotenv();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay process environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Overlay variables from `lookup`. Blank values are ignored.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("KHOJ_URL") {
            self.url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = var("KHOJ_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(count) = var("KHOJ_RESULTS_COUNT") {
            self.results_count = parse_var("KHOJ_RESULTS_COUNT", &count)?;
        }
        if let Some(agent) = var("KHOJ_AGENT") {
            self.agent = Some(agent);
        }
        if let Some(access) = var("KHOJ_FILE_ACCESS") {
            self.file_access = parse_var("KHOJ_FILE_ACCESS", &access)?;
        }
        if let Some(secs) = var("KHOJ_TIMEOUT_SECS") {
            self.timeout_secs = parse_var("KHOJ_TIMEOUT_SECS", &secs)?;
        }

        let location_mappings: [(&str, &mut Option<String>); 5] = [
            ("KHOJ_CITY", &mut self.location.city),
            ("KHOJ_REGION", &mut self.location.region),
            ("KHOJ_COUNTRY", &mut self.location.country),
            ("KHOJ_COUNTRY_CODE", &mut self.location.country_code),
            ("KHOJ_TIMEZONE", &mut self.location.timezone),
        ];
        for (env_var, field) in location_mappings {
            if let Some(value) = var(env_var) {
                *field = Some(value);
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(KhojError::Configuration(format!(
                "server url must start with http:// or https://, got {:?}",
                self.url
            )));
        }
        if self.results_count == 0 {
            return Err(KhojError::Configuration(
                "results_count must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(KhojError::Configuration(
                "timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_file_access(mut self, mode: FileAccessMode) -> Self {
        self.file_access = mode;
        self
    }

    fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat?client={}", self.base_url(), self.client)
    }

    pub fn sessions_url(&self) -> String {
        format!("{}/api/chat/sessions", self.base_url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| KhojError::Configuration(format!("{name}={value:?}: {e}")))
}
