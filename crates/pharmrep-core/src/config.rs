//! Application constants and API client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "PharmRep";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connectivity probe timeout.
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);
/// Server status probe timeout.
pub const SERVER_STATUS_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_URL: &str = "PHARMREP_API_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "PHARMREP_API_TIMEOUT_SECS";
pub const ENV_API_WITH_CREDENTIALS: &str = "PHARMREP_API_WITH_CREDENTIALS";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,pharmrep_core=debug,pharmrep_lookup=debug"
}

/// Static configuration of the API client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Default per-request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Whether cookies/credentials accompany cross-origin calls
    pub with_credentials: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            with_credentials: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// Build from environment variables, falling back to defaults for anything unset or invalid.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_API_URL) {
            Some(url) if !url.trim().is_empty() => Self::new(&url),
            _ => Self::default(),
        };

        if let Some(raw) = lookup(ENV_API_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "Ignoring invalid {}", ENV_API_TIMEOUT_SECS),
            }
        }

        if let Some(raw) = lookup(ENV_API_WITH_CREDENTIALS) {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => config.with_credentials = true,
                "0" | "false" | "no" => config.with_credentials = false,
                _ => tracing::warn!(value = %raw, "Ignoring invalid {}", ENV_API_WITH_CREDENTIALS),
            }
        }

        config
    }

    /// Join a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
