//! Provider configuration.

use crate::error::ProviderError;

/// Environment variable read by `ProviderConfig::from_env`.
pub const API_URL_VAR: &str = "PGRST_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    api_url: String,
}

impl ProviderConfig {
    /// A trailing slash on `api_url` is dropped so that `{api_url}/{resource}`
    /// never contains a double slash.
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let url = std::env::var(API_URL_VAR).map_err(|_| ProviderError::MissingConfig(API_URL_VAR))?;
        Ok(Self::new(&url))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}
