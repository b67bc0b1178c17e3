//! The remote call boundary.
//!
//! The client only needs one capability from the network: given a URL that
//! fully encodes a command, return the decoded JSON body.

use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn call(&self, url: &Url) -> std::result::Result<Value, TransportError>;

    /// `call` for commands the remote may hold open past the default request
    /// timeout. Transports without timeouts of their own can keep the default.
    async fn call_with_timeout(
        &self,
        url: &Url,
        _timeout: Duration,
    ) -> std::result::Result<Value, TransportError> {
        self.call(url).await
    }
}

/// `RemoteCall` over HTTPS using a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteCall for HttpTransport {
    async fn call(&self, url: &Url) -> std::result::Result<Value, TransportError> {
        tracing::debug!("GET {}", url);
        fetch_json(self.client.get(url.clone())).await
    }

    async fn call_with_timeout(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> std::result::Result<Value, TransportError> {
        tracing::debug!("GET {} (timeout {:?})", url, timeout);
        // Overrides the client-wide timeout for this request only.
        fetch_json(self.client.get(url.clone()).timeout(timeout)).await
    }
}

async fn fetch_json(
    request: reqwest::RequestBuilder,
) -> std::result::Result<Value, TransportError> {
    // Error statuses still carry a JSON body with the `error` field.
    let response = request.send().await?;
    let body = response.bytes().await?;

    Ok(serde_json::from_slice(&body)?)
}
