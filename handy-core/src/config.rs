//! Client configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.handyfeeling.com/api/v1/";

/// Round trips per offset estimation when the caller does not choose.
pub const DEFAULT_SAMPLES: usize = 30;

/// How long the device may spend downloading a script, sent with `syncPrepare`.
pub const DEFAULT_PREPARE_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// API root; connection key and command are appended as path segments.
    pub base_url: String,

    /// Per-request timeout applied by the HTTP transport.
    pub request_timeout_ms: u64,

    /// `timeout` parameter of `syncPrepare`. The device answers only once
    /// the download is done or this window has passed, so the request itself
    /// is allowed this long plus `request_timeout_ms`.
    pub prepare_timeout_ms: u64,

    /// Sample count used by `estimate_offset_default`.
    pub default_samples: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
            prepare_timeout_ms: DEFAULT_PREPARE_TIMEOUT_MS,
            default_samples: DEFAULT_SAMPLES,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `HANDY_API_BASE_URL`, `HANDY_REQUEST_TIMEOUT_MS`
    /// and `HANDY_SYNC_SAMPLES`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("HANDY_API_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = lookup("HANDY_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_var("HANDY_REQUEST_TIMEOUT_MS", &timeout)?;
        }
        if let Some(samples) = lookup("HANDY_SYNC_SAMPLES") {
            config.default_samples = parse_var("HANDY_SYNC_SAMPLES", &samples)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.parsed_base_url()?;
        if self.request_timeout_ms == 0 {
            return Err(Error::Configuration(
                "request_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.default_samples == 0 {
            return Err(Error::Configuration(
                "default_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("invalid base URL {}: {e}", self.base_url))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "base URL {} cannot carry a path",
                self.base_url
            )));
        }
        Ok(url)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{name} has invalid value {raw:?}")))
}
