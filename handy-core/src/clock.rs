use std::time::{SystemTime, UNIX_EPOCH};

/// Local time source, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> f64;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> f64 {
        // A clock set before 1970 reads as a negative offset from the epoch.
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs_f64() * 1000.0,
            Err(before) => -(before.duration().as_secs_f64() * 1000.0),
        }
    }
}

/// One round trip against the remote time endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Local time the request was sent
    pub request_sent_at: f64,
    /// Local time the response arrived
    pub response_received_at: f64,
    /// Server clock reading carried by the response
    pub remote_reported_time: f64,
}

impl TimeSample {
    pub fn round_trip_delay(&self) -> f64 {
        self.response_received_at - self.request_sent_at
    }

    /// Correction to add to local time to get server time.
    ///
    /// The server is assumed to have composed its response halfway through
    /// the round trip, so at `response_received_at` the server clock reads
    /// `remote_reported_time + rtd / 2`.
    pub fn offset(&self) -> f64 {
        let estimated_server_time = self.remote_reported_time + self.round_trip_delay() / 2.0;
        estimated_server_time - self.response_received_at
    }
}
