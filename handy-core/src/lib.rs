//! Handy v1 cloud API client.
//!
//! This crate provides:
//! - Device commands (mode, speed, stroke) and status queries
//! - Server clock offset estimation with outlier rejection
//! - Video sync commands stamped with estimated server time
//!
//! ```no_run
//! # async fn demo() -> handy_core::Result<()> {
//! let mut handy = handy_core::Handy::new("my-connection-key")?;
//! handy.estimate_offset(30).await?;
//! handy.sync_prepare("https://example.com/video.csv", None, None).await?;
//! handy.sync_play(true, 0.0).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod sync;
pub mod time_sync;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use client::Handy;
pub use clock::{Clock, SystemClock, TimeSample};
pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{Error, Result, TransportError};
pub use messages::HandyMode;
pub use sync::{SyncState, DEFAULT_ADJUST_FILTER};
pub use time_sync::{aggregate_offsets, OffsetSummary, ProgressObserver, TimeSyncEstimator};
pub use transport::{HttpTransport, RemoteCall};
