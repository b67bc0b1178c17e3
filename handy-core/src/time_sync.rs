//! Server clock offset estimation.
//!
//! ## Procedure
//!
//! 1. One warm-up `getServerTime` call whose result is ignored, so connection
//!    setup latency does not land in the first sample
//! 2. `n` timed round trips, each giving an offset estimate
//!    `serverTime + rtd/2 - t1` (symmetric one-way latency assumed)
//! 3. Samples deviating from the mean by one population standard deviation
//!    or more are dropped
//! 4. The mean of the remaining samples is the offset
//!
//! After estimation, device server time is `local_time + offset`.

use crate::client::Handy;
use crate::clock::{Clock, TimeSample};
use crate::error::{Error, Result};
use crate::messages;
use crate::transport::RemoteCall;
use url::Url;

/// Error type observers may return; it is logged and otherwise ignored.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Receives estimation progress as a fraction in `[0, 1)`.
///
/// Invoked synchronously after each measured sample. Failures never abort
/// the estimation.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: f64) -> std::result::Result<(), ObserverError>;
}

impl<F> ProgressObserver for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_progress(&self, progress: f64) -> std::result::Result<(), ObserverError> {
        self(progress);
        Ok(())
    }
}

/// Outcome of aggregating a set of per-sample offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetSummary {
    /// Final estimate, mean of the retained samples
    pub offset: f64,
    /// Mean of all samples
    pub mean: f64,
    /// Population standard deviation of all samples
    pub std_dev: f64,
    pub retained: usize,
    pub total: usize,
}

/// Mean computed relative to the first value, so that a set of identical
/// values averages to exactly that value.
fn mean(values: &[f64]) -> f64 {
    let pivot = values[0];
    pivot + values.iter().map(|v| v - pivot).sum::<f64>() / values.len() as f64
}

/// Reject outliers and average the rest. `None` for an empty input.
///
/// A sample is retained only if its distance from the mean is strictly less
/// than one standard deviation. With zero spread every sample is retained.
/// If the strict test retains nothing (every sample exactly one deviation
/// away, e.g. two samples) the unfiltered mean is used.
pub fn aggregate_offsets(offsets: &[f64]) -> Option<OffsetSummary> {
    if offsets.is_empty() {
        return None;
    }

    let total = offsets.len();
    let mean_all = mean(offsets);
    let variance = offsets.iter().map(|o| (o - mean_all).powi(2)).sum::<f64>() / total as f64;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return Some(OffsetSummary {
            offset: mean_all,
            mean: mean_all,
            std_dev,
            retained: total,
            total,
        });
    }

    let retained: Vec<f64> = offsets
        .iter()
        .copied()
        .filter(|o| (o - mean_all).abs() < std_dev)
        .collect();

    if retained.is_empty() {
        tracing::warn!(
            "All {} samples at least one deviation ({:.3}ms) from the mean, using unfiltered mean",
            total,
            std_dev
        );
        return Some(OffsetSummary {
            offset: mean_all,
            mean: mean_all,
            std_dev,
            retained: total,
            total,
        });
    }

    Some(OffsetSummary {
        offset: mean(&retained),
        mean: mean_all,
        std_dev,
        retained: retained.len(),
        total,
    })
}

/// Samples a remote time endpoint and aggregates the offsets.
pub struct TimeSyncEstimator<'a> {
    transport: &'a dyn RemoteCall,
    clock: &'a dyn Clock,
}

impl<'a> TimeSyncEstimator<'a> {
    pub fn new(transport: &'a dyn RemoteCall, clock: &'a dyn Clock) -> Self {
        Self { transport, clock }
    }

    /// One timed round trip against `url`.
    pub async fn sample(&self, url: &Url) -> Result<TimeSample> {
        let request_sent_at = self.clock.now_millis();
        let body = self.transport.call(url).await?;
        let response_received_at = self.clock.now_millis();

        let body = messages::check_response(body)?;
        let remote_reported_time = messages::server_time(&body)?;

        Ok(TimeSample {
            request_sent_at,
            response_received_at,
            remote_reported_time,
        })
    }

    /// Warm up, take `samples` measurements and aggregate them.
    ///
    /// Any failed round trip fails the whole run.
    pub async fn estimate(
        &self,
        url: &Url,
        samples: usize,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<OffsetSummary> {
        if samples == 0 {
            return Err(Error::InvalidArgument(
                "offset estimation needs at least one sample".to_string(),
            ));
        }

        // Warm-up; only a transport failure matters.
        self.transport.call(url).await?;

        let mut offsets = Vec::with_capacity(samples);
        for i in 0..samples {
            let sample = self.sample(url).await?;
            let offset = sample.offset();

            tracing::debug!(
                "Time sync sample {}: RTD={:.1}ms, offset={:.1}ms",
                i + 1,
                sample.round_trip_delay(),
                offset
            );
            offsets.push(offset);

            if let Some(observer) = observer {
                if let Err(e) = observer.on_progress(i as f64 / samples as f64) {
                    tracing::warn!("Progress observer failed: {}", e);
                }
            }
        }

        aggregate_offsets(&offsets).ok_or_else(|| {
            Error::InvalidArgument("offset estimation produced no samples".to_string())
        })
    }
}

impl Handy {
    /// Estimate the server clock offset from `samples` round trips and keep
    /// it for subsequent sync commands.
    ///
    /// On failure the previous offset is left untouched.
    pub async fn estimate_offset(&mut self, samples: usize) -> Result<f64> {
        self.run_estimate(samples, None).await
    }

    /// As [`Handy::estimate_offset`], reporting progress after every sample.
    pub async fn estimate_offset_with_progress(
        &mut self,
        samples: usize,
        observer: &dyn ProgressObserver,
    ) -> Result<f64> {
        self.run_estimate(samples, Some(observer)).await
    }

    /// Estimate with the configured sample count (30 unless overridden).
    pub async fn estimate_offset_default(&mut self) -> Result<f64> {
        let samples = self.config.default_samples;
        self.run_estimate(samples, None).await
    }

    async fn run_estimate(
        &mut self,
        samples: usize,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<f64> {
        let url = self.command_url("getServerTime", &[])?;

        let summary = TimeSyncEstimator::new(self.transport.as_ref(), self.clock.as_ref())
            .estimate(&url, samples, observer)
            .await?;

        tracing::info!(
            "Server time offset {:.1}ms from {}/{} samples (mean={:.1}ms, sd={:.1}ms)",
            summary.offset,
            summary.retained,
            summary.total,
            summary.mean,
            summary.std_dev
        );

        self.connection.set_server_time_offset(summary.offset);
        Ok(summary.offset)
    }
}
