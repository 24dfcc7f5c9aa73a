//! Configuration types.

use reqwest::Url;

use crate::error::{self, ConfigError};

/// Origin used to resolve relative `/api` paths when no base URL is set.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Where the screener backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Explicit API base URL. `None` means same-origin relative paths.
    pub base_url: Option<String>,
    /// Origin that relative paths are resolved against.
    pub origin: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl ApiConfig {
    /// Build a config with an explicit base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Self::from_values(Some(base_url), None)
    }

    /// Build config from environment variables.
    ///
    /// `SCREENER_API_URL` sets the base URL (empty or unset means relative
    /// paths), `SCREENER_ORIGIN` overrides [`DEFAULT_ORIGIN`].
    pub fn from_env() -> error::Result<Self> {
        let base_url = std::env::var("SCREENER_API_URL").ok();
        let origin = std::env::var("SCREENER_ORIGIN").ok();
        Ok(Self::from_values(base_url.as_deref(), origin.as_deref())?)
    }

    fn from_values(base_url: Option<&str>, origin: Option<&str>) -> Result<Self, ConfigError> {
        let base_url = match base_url.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(normalize("SCREENER_API_URL", raw)?),
            None => None,
        };
        let origin = match origin.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => normalize("SCREENER_ORIGIN", raw)?,
            None => DEFAULT_ORIGIN.to_string(),
        };
        Ok(Self { base_url, origin })
    }

    /// The request path for an endpoint, e.g. `/api/screener` or
    /// `https://host/api/screener` when a base URL is configured.
    pub fn path(&self, endpoint: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{base}/api{endpoint}"),
            None => format!("/api{endpoint}"),
        }
    }

    /// Absolute URL for an endpoint.
    pub fn url(&self, endpoint: &str) -> String {
        match &self.base_url {
            Some(_) => self.path(endpoint),
            None => format!("{}{}", self.origin, self.path(endpoint)),
        }
    }
}

fn normalize(key: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?} is not a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme {:?}", parsed.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}
