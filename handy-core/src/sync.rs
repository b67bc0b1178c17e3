//! Video sync commands.
//!
//! Commands are stamped with an absolute device server time computed as
//! `round(local_now + server_time_offset)`, so the device can act when its
//! own clock reaches that instant regardless of how long the request took
//! to arrive. Run [`Handy::estimate_offset`] first; until then the offset
//! is 0 and local time is sent as is.

use crate::client::Handy;
use crate::error::{Error, Result};
use crate::messages::{SyncOffsetResponse, SyncPlayResponse, SyncPrepareResponse};
use serde_json::Value;
use std::time::Duration;

/// Smoothing applied by the device to timestamp adjustments unless chosen.
pub const DEFAULT_ADJUST_FILTER: f64 = 0.5;

/// Playback state as last acknowledged by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Unprepared,
    Prepared,
    Playing,
    Paused,
}

impl Handy {
    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    /// Have the device download the script at `script_url`.
    ///
    /// `name` and `size` are passed through for device-side bookkeeping and
    /// are omitted when empty or zero. The device replies once the download
    /// finishes or `prepare_timeout_ms` runs out, so this request waits that
    /// long on top of the usual request timeout.
    pub async fn sync_prepare(
        &mut self,
        script_url: &str,
        name: Option<&str>,
        size: Option<u64>,
    ) -> Result<SyncPrepareResponse> {
        let mut params = vec![
            ("url", script_url.to_string()),
            ("timeout", self.config.prepare_timeout_ms.to_string()),
        ];
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            params.push(("name", name.to_string()));
        }
        if let Some(size) = size.filter(|s| *s != 0) {
            params.push(("size", size.to_string()));
        }

        let response = self
            .command_with_timeout("syncPrepare", &params, self.prepare_request_timeout())
            .await?;
        self.sync_state = SyncState::Prepared;
        tracing::info!("Prepared script {}", script_url);
        Ok(response)
    }

    fn prepare_request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.config
                .prepare_timeout_ms
                .saturating_add(self.config.request_timeout_ms),
        )
    }

    /// Start (`play = true`) or pause playback at media time `time_ms`,
    /// effective at the current estimated server time.
    pub async fn sync_play(&mut self, play: bool, time_ms: f64) -> Result<SyncPlayResponse> {
        if !time_ms.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "media time must be finite, got {time_ms}"
            )));
        }

        let server_time = self.estimated_server_time();
        let params = [
            ("play", play.to_string()),
            ("serverTime", server_time.to_string()),
            ("time", time_ms.to_string()),
        ];

        let response = self.command("syncPlay", &params).await?;
        self.sync_state = if play {
            SyncState::Playing
        } else {
            SyncState::Paused
        };
        tracing::debug!(
            "syncPlay play={} time={}ms serverTime={}",
            play,
            time_ms,
            server_time
        );
        Ok(response)
    }

    /// Manual playback trim on the device, independent of clock sync.
    pub async fn sync_offset(&self, offset_ms: i64) -> Result<SyncOffsetResponse> {
        self.command("syncOffset", &[("offset", offset_ms.to_string())])
            .await
    }

    /// Report the local media position so the device can correct drift,
    /// blending with [`DEFAULT_ADJUST_FILTER`].
    pub async fn sync_adjust_timestamp(&self, media_time_seconds: f64) -> Result<bool> {
        self.sync_adjust_timestamp_with_filter(media_time_seconds, DEFAULT_ADJUST_FILTER)
            .await
    }

    /// Report the local media position with an explicit smoothing `filter`
    /// in `(0, 1]`; 1 makes the device snap to the reported position.
    ///
    /// Returns whether the device accepted the adjustment.
    pub async fn sync_adjust_timestamp_with_filter(
        &self,
        media_time_seconds: f64,
        filter: f64,
    ) -> Result<bool> {
        if !(filter > 0.0 && filter <= 1.0) {
            return Err(Error::InvalidArgument(format!(
                "filter must be in (0, 1], got {filter}"
            )));
        }
        if !media_time_seconds.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "media time must be finite, got {media_time_seconds}"
            )));
        }

        let params = [
            ("currentTime", (media_time_seconds * 1000.0).to_string()),
            ("serverTime", self.estimated_server_time().to_string()),
            ("filter", filter.to_string()),
        ];

        let response = self.send("syncAdjustTimestamp", &params).await?;
        Ok(adjustment_accepted(&response))
    }
}

/// A bare boolean answer is taken as is; otherwise `success` decides, and an
/// error-free answer without it counts as accepted.
fn adjustment_accepted(response: &Value) -> bool {
    match response {
        Value::Bool(accepted) => *accepted,
        other => other
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::config::ClientConfig;
    use crate::test_support::{query_param, time_server, ManualClock, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    const T: f64 = 1_700_000_000_000.0;

    fn handy_with(transport: Arc<ScriptedTransport>, clock: Arc<ManualClock>) -> Handy {
        Handy::with_transport("key", ClientConfig::default(), transport, clock).unwrap()
    }

    #[tokio::test]
    async fn test_play_stamps_server_time() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(
            json!({ "connected": true, "playing": true }),
        ));
        let mut handy = handy_with(transport.clone(), clock);
        handy.connection.set_server_time_offset(250.0);

        let response = handy.sync_play(true, 1000.0).await.unwrap();

        assert_eq!(response.playing, Some(true));
        let url = transport.last_request().unwrap();
        assert!(url.path().ends_with("/key/syncPlay"));
        assert_eq!(query_param(&url, "play").as_deref(), Some("true"));
        assert_eq!(query_param(&url, "serverTime").as_deref(), Some("1700000000250"));
        assert_eq!(query_param(&url, "time").as_deref(), Some("1000"));
        assert_eq!(handy.sync_state(), SyncState::Playing);
    }

    #[tokio::test]
    async fn test_play_rounds_fractional_offset() {
        let clock = Arc::new(ManualClock::new(T + 0.3));
        let transport = Arc::new(ScriptedTransport::replying(json!({ "connected": true })));
        let mut handy = handy_with(transport.clone(), clock);
        handy.connection.set_server_time_offset(-100.25);

        handy.sync_play(false, 12.5).await.unwrap();

        let url = transport.last_request().unwrap();
        assert_eq!(query_param(&url, "play").as_deref(), Some("false"));
        assert_eq!(query_param(&url, "serverTime").as_deref(), Some("1699999999900"));
        assert_eq!(query_param(&url, "time").as_deref(), Some("12.5"));
        assert_eq!(handy.sync_state(), SyncState::Paused);
    }

    #[tokio::test]
    async fn test_play_uses_estimated_offset() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(time_server(clock.clone(), 40.0, vec![-3_000.0]));
        let mut handy = handy_with(transport.clone(), clock.clone());

        handy.estimate_offset(3).await.unwrap();
        let now = clock.now_millis();
        handy.sync_play(true, 0.0).await.unwrap();

        // stamped before the request went out
        let url = transport.last_request().unwrap();
        let expected = (now - 3_000.0).round() as i64;
        assert_eq!(query_param(&url, "serverTime"), Some(expected.to_string()));
    }

    #[tokio::test]
    async fn test_prepare_parameters() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(
            json!({ "connected": true, "success": true, "downloaded": true }),
        ));
        let mut handy = handy_with(transport.clone(), clock);

        let response = handy
            .sync_prepare("https://example.com/scripts/a.csv", Some("a.csv"), Some(2048))
            .await
            .unwrap();

        assert_eq!(response.downloaded, Some(true));
        let url = transport.last_request().unwrap();
        assert!(url.path().ends_with("/key/syncPrepare"));
        assert_eq!(
            query_param(&url, "url").as_deref(),
            Some("https://example.com/scripts/a.csv")
        );
        assert_eq!(query_param(&url, "timeout").as_deref(), Some("30000"));
        assert_eq!(query_param(&url, "name").as_deref(), Some("a.csv"));
        assert_eq!(query_param(&url, "size").as_deref(), Some("2048"));
        assert_eq!(handy.sync_state(), SyncState::Prepared);
    }

    #[tokio::test]
    async fn test_prepare_omits_empty_bookkeeping() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(json!({ "connected": true })));
        let mut handy = handy_with(transport.clone(), clock);

        handy
            .sync_prepare("https://example.com/b.funscript", Some(""), Some(0))
            .await
            .unwrap();

        let url = transport.last_request().unwrap();
        assert_eq!(query_param(&url, "name"), None);
        assert_eq!(query_param(&url, "size"), None);
    }

    #[tokio::test]
    async fn test_prepare_remote_error() {
        let payload = json!({ "connected": true, "error": "script download failed" });
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(payload.clone()));
        let mut handy = handy_with(transport, clock);

        let err = handy
            .sync_prepare("https://example.com/missing.csv", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.remote_payload(), Some(&payload));
        assert_eq!(handy.sync_state(), SyncState::Unprepared);
    }

    #[tokio::test]
    async fn test_prepare_waits_out_download_window() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(json!({ "connected": true })));
        let config = ClientConfig {
            request_timeout_ms: 2_000,
            prepare_timeout_ms: 45_000,
            ..ClientConfig::default()
        };
        let mut handy = Handy::with_transport("key", config, transport.clone(), clock).unwrap();

        handy.sync_prepare("https://example.com/a.csv", None, None).await.unwrap();
        assert_eq!(transport.last_timeout(), Some(Duration::from_millis(47_000)));

        // other commands keep the transport default
        handy.sync_play(true, 0.0).await.unwrap();
        assert_eq!(transport.last_timeout(), None);
    }

    #[tokio::test]
    async fn test_offset_command() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(
            json!({ "connected": true, "offset": -40 }),
        ));
        let handy = handy_with(transport.clone(), clock);

        let response = handy.sync_offset(-40).await.unwrap();

        assert_eq!(response.offset, Some(-40.0));
        let url = transport.last_request().unwrap();
        assert_eq!(query_param(&url, "offset").as_deref(), Some("-40"));
        // manual trim does not touch the clock offset
        assert_eq!(handy.server_time_offset(), 0.0);
    }

    #[tokio::test]
    async fn test_offset_remote_error() {
        let payload = json!({ "connected": false, "error": "machine not connected" });
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(payload.clone()));
        let handy = handy_with(transport, clock);

        let err = handy.sync_offset(15).await.unwrap_err();

        assert!(matches!(err, Error::Remote(_)));
        assert_eq!(err.remote_payload(), Some(&payload));
    }

    #[tokio::test]
    async fn test_adjust_timestamp_remote_error() {
        let payload = json!({ "connected": true, "error": "no script prepared" });
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(payload.clone()));
        let handy = handy_with(transport.clone(), clock);

        let err = handy
            .sync_adjust_timestamp_with_filter(3.0, 0.8)
            .await
            .unwrap_err();

        assert_eq!(err.remote_payload(), Some(&payload));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_adjust_timestamp_parameters() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(json!({ "connected": true })));
        let mut handy = handy_with(transport.clone(), clock);
        handy.connection.set_server_time_offset(1_000.0);

        assert!(handy.sync_adjust_timestamp(12.345).await.unwrap());

        let url = transport.last_request().unwrap();
        assert!(url.path().ends_with("/key/syncAdjustTimestamp"));
        assert_eq!(
            query_param(&url, "currentTime"),
            Some((12.345_f64 * 1000.0).to_string())
        );
        assert_eq!(query_param(&url, "serverTime").as_deref(), Some("1700000001000"));
        assert_eq!(query_param(&url, "filter").as_deref(), Some("0.5"));
    }

    #[tokio::test]
    async fn test_adjust_timestamp_filter_range() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(json!(true)));
        let handy = handy_with(transport.clone(), clock);

        for filter in [0.0, -0.5, 1.5, f64::NAN] {
            let err = handy
                .sync_adjust_timestamp_with_filter(1.0, filter)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert_eq!(transport.request_count(), 0);

        assert!(handy.sync_adjust_timestamp_with_filter(1.0, 1.0).await.unwrap());
    }

    #[test]
    fn test_adjustment_accepted() {
        assert!(adjustment_accepted(&json!(true)));
        assert!(!adjustment_accepted(&json!(false)));
        assert!(!adjustment_accepted(&json!({ "connected": true, "success": false })));
        assert!(adjustment_accepted(&json!({ "connected": true, "success": true })));
        assert!(adjustment_accepted(&json!({ "connected": true })));
    }

    #[tokio::test]
    async fn test_commands_require_key() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(json!({ "connected": true })));
        let mut handy =
            Handy::with_transport("", ClientConfig::default(), transport.clone(), clock).unwrap();

        assert!(matches!(
            handy.sync_prepare("https://example.com/a.csv", None, None).await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            handy.sync_play(true, 0.0).await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            handy.sync_offset(10).await,
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            handy.sync_adjust_timestamp(1.0).await,
            Err(Error::Configuration(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_play_pause_cycles() {
        let clock = Arc::new(ManualClock::new(T));
        let transport = Arc::new(ScriptedTransport::replying(json!({ "connected": true })));
        let mut handy = handy_with(transport.clone(), clock.clone());

        handy
            .sync_prepare("https://example.com/a.csv", None, None)
            .await
            .unwrap();
        for i in 0..3 {
            handy.sync_play(true, i as f64 * 1000.0).await.unwrap();
            assert_eq!(handy.sync_state(), SyncState::Playing);
            clock.advance(500.0);
            handy.sync_adjust_timestamp(i as f64 + 0.5).await.unwrap();
            handy.sync_play(false, i as f64 * 1000.0 + 500.0).await.unwrap();
            assert_eq!(handy.sync_state(), SyncState::Paused);
        }
        assert_eq!(transport.request_count(), 1 + 3 * 3);
    }
}
