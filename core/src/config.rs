//! Client-wide configuration shared by the builder and the service.
//!
//! Built once at startup and passed around behind an `Arc`; nothing here is
//! global.

use serde::Deserialize;

use crate::error::BuildError;

pub const DEFAULT_AUTH_HEADER: &str = "Authorization";
pub const DEFAULT_AUTH_PREFIX: &str = "Bearer ";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
pub const DEFAULT_KEYCHAIN_IDENTIFIER: &str = "EFToolsID";

/// Base URL, auth header shape, global headers/queries and parsing defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub auth_header: String,
    pub auth_prefix: String,
    /// Sent with every request, before any per-model headers.
    pub headers: Vec<(String, String)>,
    /// Appended to every request URL.
    pub queries: Vec<(String, String)>,
    /// chrono format string used to parse the stored token expiration.
    pub date_format: String,
    pub auto_parse: bool,
    /// Scope under which credentials live in the secure store.
    pub keychain_identifier: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            headers: Vec::new(),
            queries: Vec::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            auto_parse: true,
            keychain_identifier: DEFAULT_KEYCHAIN_IDENTIFIER.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Load from a JSON document; missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_auth_header(mut self, name: &str) -> Self {
        self.auth_header = name.to_string();
        self
    }

    pub fn with_auth_prefix(mut self, prefix: &str) -> Self {
        self.auth_prefix = prefix.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.queries.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_auto_parse(mut self, auto_parse: bool) -> Self {
        self.auto_parse = auto_parse;
        self
    }

    pub fn with_keychain_identifier(mut self, identifier: &str) -> Self {
        self.keychain_identifier = identifier.to_string();
        self
    }

    /// Parse `base_url`, rejecting empty values and URLs that cannot carry a
    /// path.
    pub fn parsed_base_url(&self) -> Result<url::Url, BuildError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(BuildError::InvalidUrl("base URL is empty".to_string()));
        }
        let url = url::Url::parse(trimmed)
            .map_err(|e| BuildError::InvalidUrl(format!("{trimmed} ({e})")))?;
        if url.cannot_be_a_base() {
            return Err(BuildError::InvalidUrl(trimmed.to_string()));
        }
        Ok(url)
    }
}
