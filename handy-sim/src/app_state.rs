use dashmap::DashMap;
use handy_core::HandyMode;
use std::collections::HashSet;
use std::sync::{atomic::AtomicU64, Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

pub type SharedState = Arc<AppState>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub script_url: Option<String>,
    pub script_name: Option<String>,
    pub is_playing: bool,
    pub position_ms: f64,
    pub last_update_time: f64, // Server time at which position_ms held
    pub sync_offset_ms: i64,
    pub adjustments: u64,
}

impl PlaybackState {
    /// Media position at `server_time`, extrapolated while playing.
    pub fn position_at(&self, server_time: f64) -> f64 {
        if self.is_playing {
            self.position_ms + (server_time - self.last_update_time)
        } else {
            self.position_ms
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub mode: HandyMode,
    pub speed: f64,
    pub stroke: f64,
    pub stroke_zone: (f64, f64),
    pub playback: PlaybackState,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: HandyMode::Off,
            speed: 50.0,
            stroke: 100.0,
            stroke_zone: (0.0, 100.0),
            playback: PlaybackState::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Device {
    pub state: RwLock<DeviceState>,
}

pub struct AppState {
    // Devices seen so far, by connection key
    pub devices: DashMap<String, Arc<Device>>,
    // None accepts every key
    connected_keys: Option<HashSet<String>>,
    pub clock_skew_ms: f64,
    pub time_requests: AtomicU64,
}

impl AppState {
    pub fn new(clock_skew_ms: f64) -> SharedState {
        Arc::new(Self {
            devices: DashMap::new(),
            connected_keys: None,
            clock_skew_ms,
            time_requests: AtomicU64::new(0),
        })
    }

    pub fn with_keys<I, S>(clock_skew_ms: f64, keys: I) -> SharedState
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            devices: DashMap::new(),
            connected_keys: Some(keys.into_iter().map(Into::into).collect()),
            clock_skew_ms,
            time_requests: AtomicU64::new(0),
        })
    }

    /// Server clock: wall clock shifted by the configured skew.
    pub fn server_time(&self) -> f64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        now + self.clock_skew_ms
    }

    /// The device behind `key`, or `None` if that machine is not connected.
    /// Entries are never evicted.
    pub fn device(&self, key: &str) -> Option<Arc<Device>> {
        if let Some(keys) = &self.connected_keys {
            if !keys.contains(key) {
                return None;
            }
        }
        Some(self.devices.entry(key.to_string()).or_default().clone())
    }

    /// Copy of a device's state, for inspection from tests.
    pub fn snapshot(&self, key: &str) -> Option<DeviceState> {
        self.devices
            .get(key)
            .and_then(|device| device.state.read().ok().map(|state| state.clone()))
    }
}
