//! Configuration for the Odinson REST client.

use std::sync::LazyLock;
use std::time::Duration;

use url::Url;

use crate::error::{OdinsonError, Result};

/// Default address of a locally running Odinson REST API.
pub const DEFAULT_ADDRESS: &str = "http://localhost:9000";

/// Environment variable holding the base address.
pub const ADDRESS_ENV: &str = "ODINSON_ADDRESS";

/// Environment variable holding the per-request timeout in seconds.
pub const TIMEOUT_ENV: &str = "ODINSON_TIMEOUT_SECS";

/// Connection parameters for [`HttpOdinsonClient`](crate::HttpOdinsonClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address of the REST API; endpoint paths are appended to it.
    pub base_url: Url,
    /// Per-request timeout applied by the transport. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Default sentence length cap used when indexing; `None` means unbounded.
    pub max_tokens_per_sentence: Option<usize>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.clone(),
            timeout: None,
            max_tokens_per_sentence: None,
            user_agent: concat!("odinson-rest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

static DEFAULT_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(DEFAULT_ADDRESS).expect("unreachable error: failed to parse default base URL")
});

impl ClientConfig {
    /// Create a new builder for constructing a [`ClientConfig`].
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Read `ODINSON_ADDRESS` and `ODINSON_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`OdinsonError::Config`] if either variable is set but invalid.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();
        if let Ok(address) = std::env::var(ADDRESS_ENV) {
            builder = builder.address(address);
        }
        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                OdinsonError::Config(format!(
                    "{TIMEOUT_ENV} must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

/// Builder for constructing a validated [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    address: Option<String>,
    timeout: Option<Duration>,
    max_tokens_per_sentence: Option<usize>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    /// Set the base address, e.g. `http://localhost:9000`.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the default sentence length cap for indexing.
    pub fn max_tokens_per_sentence(mut self, max: usize) -> Self {
        self.max_tokens_per_sentence = Some(max);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the [`ClientConfig`], validating the address.
    ///
    /// # Errors
    ///
    /// Returns [`OdinsonError::Config`] if:
    /// - the address is not an absolute `http` or `https` URL
    /// - the timeout is zero
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let base_url = match self.address {
            Some(address) => Url::parse(address.trim()).map_err(|e| {
                OdinsonError::Config(format!("invalid Odinson address '{address}': {e}"))
            })?,
            None => defaults.base_url,
        };
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(OdinsonError::Config(format!(
                "Odinson address must be an http(s) URL, got '{base_url}'"
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(OdinsonError::Config("timeout must be greater than zero".to_string()));
        }

        Ok(ClientConfig {
            base_url,
            timeout: self.timeout,
            max_tokens_per_sentence: self.max_tokens_per_sentence,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        })
    }
}
