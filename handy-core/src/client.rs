use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::messages;
use crate::sync::SyncState;
use crate::transport::{HttpTransport, RemoteCall};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Client for one Handy, addressed by its connection key.
///
/// Operations are meant to be awaited one at a time. Offset estimation needs
/// `&mut self`, so it can never overlap a `play` or `adjust_timestamp` that
/// reads the offset; share a client between tasks behind a
/// `tokio::sync::Mutex`.
pub struct Handy {
    pub(crate) connection: Connection,
    pub(crate) config: ClientConfig,
    base_url: Url,
    pub(crate) transport: Arc<dyn RemoteCall>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) sync_state: SyncState,
}

impl Handy {
    pub fn new(connection_key: impl Into<String>) -> Result<Self> {
        Self::with_config(connection_key, ClientConfig::default())
    }

    pub fn with_config(connection_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(
            connection_key,
            config,
            Arc::new(transport),
            Arc::new(SystemClock),
        )
    }

    pub fn with_transport(
        connection_key: impl Into<String>,
        config: ClientConfig,
        transport: Arc<dyn RemoteCall>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;

        Ok(Self {
            connection: Connection::new(connection_key),
            config,
            base_url,
            transport,
            clock,
            sync_state: SyncState::Unprepared,
        })
    }

    pub fn connection_key(&self) -> &str {
        self.connection.key()
    }

    /// Point the client at another device. The clock offset is kept; it
    /// describes the vendor's server, not the device. Playback state is not,
    /// since the new device has nothing prepared by this client.
    pub fn set_connection_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key != self.connection.key() {
            self.sync_state = SyncState::Unprepared;
        }
        self.connection.set_key(key);
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Last successfully estimated offset, 0 until the first estimation.
    pub fn server_time_offset(&self) -> f64 {
        self.connection.server_time_offset()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current device server time as estimated from the local clock.
    pub fn estimated_server_time(&self) -> i64 {
        self.connection.server_time_at(self.clock.now_millis())
    }

    /// `<base>/<key>/<command>?<params>`. Fails before any I/O without a key.
    pub(crate) fn command_url(&self, command: &str, params: &[(&str, String)]) -> Result<Url> {
        let key = self.connection.require_key()?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Configuration(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push(key)
            .push(command);

        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Send a command and apply the `error` convention.
    pub(crate) async fn send(&self, command: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.command_url(command, params)?;
        let body = self.transport.call(&url).await?;
        messages::check_response(body)
    }

    /// Send a command and decode its typed response.
    pub(crate) async fn command<T: DeserializeOwned>(
        &self,
        command: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.command_url(command, params)?;
        let body = self.transport.call(&url).await?;
        messages::decode_response(body)
    }

    /// `command` for a request the device holds open for up to `timeout`.
    pub(crate) async fn command_with_timeout<T: DeserializeOwned>(
        &self,
        command: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T> {
        let url = self.command_url(command, params)?;
        let body = self.transport.call_with_timeout(&url, timeout).await?;
        messages::decode_response(body)
    }
}

impl std::fmt::Debug for Handy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handy")
            .field("connection", &self.connection)
            .field("base_url", &self.base_url.as_str())
            .field("sync_state", &self.sync_state)
            .finish()
    }
}
