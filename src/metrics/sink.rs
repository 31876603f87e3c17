//! Result Sink (C4): single-writer fold of `Outcome`s into a `Report`,
//! published lock-free via the teacher's `ArcShift` swapper so that
//! `GetResult` polls never contend with the fold loop.
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::arcshift::ArcShift;
use crate::domain::{Outcome, OutputFormat, Report, now_epoch_ms};
use crate::error::SinkError;
use crate::metrics::histogram::LatencyHistogram;

/// Error rate (as a whole-number percentage) above which a run trips the
/// circuit breaker (§4.5: "errTotal * 100 / total > 50").
const CIRCUIT_BREAKER_THRESHOLD_PCT: u64 = 50;
/// Minimum sample size before the circuit breaker is allowed to trip
/// (spec.md P8: "at any prefix... total >= 2").
const CIRCUIT_BREAKER_MIN_SAMPLES: u64 = 2;
/// `Report::error_code` stamped when the circuit breaker ends a run (§8
/// scenario 5: "Report's control fields indicate circuit break").
const CIRCUIT_BREAKER_ERROR_CODE: i32 = 3;
const CIRCUIT_BREAKER_ERROR_MESSAGE: &str = "circuit breaker tripped: error rate exceeded 50%";

/// Shared by `SinkHandle::circuit_broken` (reads a snapshot) and the fold
/// loop (reads its own live `Report`) so the trip condition is defined
/// once. Compares `errors * 100` against `total * threshold_pct` instead
/// of a float ratio, per this crate's `float_arithmetic` lint.
fn error_rate_exceeds(report: &Report, threshold_pct: u64) -> bool {
    let total = report.total();
    if total < CIRCUIT_BREAKER_MIN_SAMPLES {
        return false;
    }
    u128::from(report.errors).saturating_mul(100) > u128::from(total).saturating_mul(u128::from(threshold_pct))
}

/// A cheap, cloneable handle workers use to submit `Outcome`s and poll the
/// latest `Report` snapshot.
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<Outcome>,
    snapshot: Arc<ArcShift<Report>>,
}

impl SinkHandle {
    /// Submits one finished request to the fold loop.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::ChannelClosed` if the fold loop has already
    /// exited (the receiver was dropped).
    pub async fn submit(&self, outcome: Outcome) -> Result<(), SinkError> {
        self.tx
            .send(outcome)
            .await
            .map_err(|_send_error| SinkError::ChannelClosed)
    }

    /// Returns a clone of the latest published `Report`, never blocking on
    /// the fold loop.
    #[must_use]
    pub fn snapshot(&self) -> Report {
        (*self.snapshot.load()).clone()
    }

    /// `true` once the run has accumulated enough samples and its error
    /// rate exceeds the fixed circuit-breaker threshold.
    #[must_use]
    pub fn circuit_broken(&self) -> bool {
        error_rate_exceeds(&self.snapshot.load(), CIRCUIT_BREAKER_THRESHOLD_PCT)
    }
}

/// Owns the fold-loop task. Dropping every `SinkHandle` closes the channel,
/// which lets `finish` observe the loop's final `Report`.
pub struct ResultSink {
    task: tokio::task::JoinHandle<Report>,
}

impl ResultSink {
    /// Spawns the single fold-loop task and returns a handle pair: the
    /// `SinkHandle` workers submit outcomes through, and the `ResultSink`
    /// the driver awaits for the final `Report`.
    #[must_use]
    pub fn spawn(output: OutputFormat, channel_capacity: usize) -> (SinkHandle, Self) {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let initial = Report {
            output,
            ..Report::default()
        };
        let snapshot = Arc::new(ArcShift::new(initial));
        let started_at = std::time::Instant::now();
        let task = tokio::spawn(fold_loop(rx, Arc::clone(&snapshot), started_at));
        (SinkHandle { tx, snapshot }, Self { task })
    }

    /// Awaits the fold loop's exit (triggered by every `SinkHandle` being
    /// dropped) and returns the finalized `Report`.
    pub async fn finish(self) -> Report {
        self.task.await.unwrap_or_default()
    }
}

async fn fold_loop(
    mut rx: mpsc::Receiver<Outcome>,
    snapshot: Arc<ArcShift<Report>>,
    started_at: std::time::Instant,
) -> Report {
    let mut report = (*snapshot.load()).clone();
    let mut histogram = LatencyHistogram::new().ok();

    while let Some(outcome) = rx.recv().await {
        fold_outcome(&mut report, &outcome, histogram.as_mut());
        report.last_sample_ms = now_epoch_ms();
        report.duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        if report.error_code == 0 && error_rate_exceeds(&report, CIRCUIT_BREAKER_THRESHOLD_PCT) {
            report.error_code = CIRCUIT_BREAKER_ERROR_CODE;
            report.error_message = CIRCUIT_BREAKER_ERROR_MESSAGE.to_owned();
        }
        report.finalize_derived();
        snapshot.update(|_current| report.clone());
    }

    report.terminal = true;
    report.duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    if let Some(hist) = &histogram
        && let Ok(encoded) = hist.encode_base64()
    {
        report.histogram_b64 = encoded;
    }
    report.finalize_derived();
    snapshot.update(|_current| report.clone());
    report
}

fn fold_outcome(report: &mut Report, outcome: &Outcome, histogram: Option<&mut LatencyHistogram>) {
    if let Some(message) = &outcome.error {
        report.errors = report.errors.saturating_add(1);
        report
            .error_dist
            .entry(message.clone())
            .and_modify(|count| *count = count.saturating_add(1))
            .or_insert(1);
        return;
    }

    report
        .status_dist
        .entry(outcome.status)
        .and_modify(|count| *count = count.saturating_add(1))
        .or_insert(1);
    report.successful = report.successful.saturating_add(1);
    report.latency_sum_ms = report.latency_sum_ms.saturating_add(u128::from(outcome.elapsed_ms));
    report.fastest_ms = report.fastest_ms.min(outcome.elapsed_ms);
    report.slowest_ms = report.slowest_ms.max(outcome.elapsed_ms);
    if outcome.content_length >= 0 {
        report.bytes_total = report
            .bytes_total
            .saturating_add(u64::try_from(outcome.content_length).unwrap_or(0));
    }
    report
        .latency_buckets
        .entry(outcome.elapsed_ms)
        .and_modify(|count| *count = count.saturating_add(1))
        .or_insert(1);
    if let Some(hist) = histogram {
        let _ = hist.record(outcome.elapsed_ms);
    }
}
