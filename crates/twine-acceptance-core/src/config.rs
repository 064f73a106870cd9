//! Endpoint configuration.
//!
//! Defaults are the fixed hosts of the docker acceptance environment:
//! Twine's remote control on `twine:8000`, Quilt's resolver and catalog on
//! `quilt`. Environment variables override them for local runs.

use serde::Deserialize;

use crate::error::{HarnessError, Result};

pub const DEFAULT_TWINE_URL: &str = "http://twine:8000";
pub const DEFAULT_RESOLVER_URL: &str = "http://quilt/";
pub const DEFAULT_CATALOG_URL: &str = "http://quilt";
/// Ingestion of a large document may take minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PAGE_LIMIT: u64 = 100;
pub const DEFAULT_USER_AGENT: &str = concat!("twine-acceptance/", env!("CARGO_PKG_VERSION"));

pub const TWINE_URL_ENV: &str = "TWINE_URL";
pub const RESOLVER_URL_ENV: &str = "QUILT_RESOLVER_URL";
pub const CATALOG_URL_ENV: &str = "QUILT_CATALOG_URL";
pub const TIMEOUT_SECS_ENV: &str = "TWINE_TIMEOUT_SECS";
pub const PAGE_LIMIT_ENV: &str = "QUILT_PAGE_LIMIT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Base URL of the Twine remote control (`/ingest`, `/update`).
    pub twine_url: String,
    /// Quilt lookup endpoint answering `?uri=` with a 303.
    pub resolver_url: String,
    /// Host prefix that resolved collection paths are appended to.
    pub catalog_url: String,
    /// Per-request timeout; `0` waits forever.
    pub timeout_secs: u64,
    pub page_limit: u64,
    pub user_agent: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            twine_url: DEFAULT_TWINE_URL.to_string(),
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            page_limit: DEFAULT_PAGE_LIMIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Defaults, overridden by whichever environment variables are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`HarnessConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = non_empty(TWINE_URL_ENV) {
            config.twine_url = v;
        }
        if let Some(v) = non_empty(RESOLVER_URL_ENV) {
            config.resolver_url = v;
        }
        if let Some(v) = non_empty(CATALOG_URL_ENV) {
            config.catalog_url = v;
        }
        if let Some(v) = non_empty(TIMEOUT_SECS_ENV) {
            config.timeout_secs = v
                .parse()
                .map_err(|e| HarnessError::Config(format!("{TIMEOUT_SECS_ENV}={v}: {e}")))?;
        }
        if let Some(v) = non_empty(PAGE_LIMIT_ENV) {
            config.page_limit = v
                .parse()
                .map_err(|e| HarnessError::Config(format!("{PAGE_LIMIT_ENV}={v}: {e}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_limit == 0 {
            return Err(HarnessError::Config("page limit must be > 0".to_string()));
        }
        for (name, value) in [
            ("twine url", &self.twine_url),
            ("resolver url", &self.resolver_url),
            ("catalog url", &self.catalog_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| HarnessError::Config(format!("{name} `{value}`: {e}")))?;
        }
        Ok(())
    }

    /// Catalog URI of the whole ingested dataset.
    pub fn everything_uri(&self) -> String {
        format!("{}/everything.nt", self.catalog_url.trim_end_matches('/'))
    }
}
