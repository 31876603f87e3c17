//! The data model shared by every component: `RunSpec`, `Outcome`, `Report`.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::metrics::LatencyHistogram;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Start,
    Stop,
    Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Http1,
    Http2,
    Http3,
    Ws,
    Wss,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Http1 => "http1",
            Self::Http2 => "http2",
            Self::Http3 => "http3",
            Self::Ws => "ws",
            Self::Wss => "wss",
        };
        f.write_str(text)
    }
}

impl FromStr for ProtocolKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http1" | "http1.1" | "http/1.1" | "http/1" => Ok(Self::Http1),
            "http2" | "http/2" | "h2" => Ok(Self::Http2),
            "http3" | "http/3" | "h3" => Ok(Self::Http3),
            "ws" => Ok(Self::Ws),
            "wss" => Ok(Self::Wss),
            other => Err(ValidationError::InvalidProtocol {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        };
        f.write_str(text)
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(ValidationError::InvalidMethod {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Plain,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Summary,
    Csv,
    Html,
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "csv" => Ok(Self::Csv),
            "html" => Ok(Self::Html),
            other => Err(ValidationError::InvalidOutputFormat {
                value: other.to_owned(),
            }),
        }
    }
}

/// The immutable description of a run (§3 DATA MODEL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    pub seq: i64,
    pub command: CommandKind,
    pub protocol: ProtocolKind,
    pub method: HttpMethod,
    pub url: String,
    pub body: String,
    pub body_encoding: BodyEncoding,
    pub n: u64,
    pub c: u64,
    pub duration_ms: u64,
    pub timeout_ms: u64,
    pub qps: u64,
    pub disable_compression: bool,
    pub disable_keepalive: bool,
    pub headers: Vec<(String, String)>,
    pub proxy: Option<String>,
    pub output: OutputFormat,
    pub origin: String,
}

impl RunSpec {
    /// Validates the `C >= 1`, `N>0 || duration>0`, `N>0 && N<C` invariants.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.c < 1 {
            return Err(ValidationError::ConcurrencyZero);
        }
        if self.n == 0 && self.duration_ms == 0 {
            return Err(ValidationError::MissingNOrDuration);
        }
        if self.n > 0 && self.n < self.c {
            return Err(ValidationError::RequestCountBelowConcurrency {
                n: self.n,
                c: self.c,
            });
        }
        Ok(())
    }
}

/// One finished request (§3 DATA MODEL).
#[derive(Debug, Clone)]
pub struct Outcome {
    pub status: u16,
    pub elapsed_ms: u64,
    /// -1 when unknown, else >= 0.
    pub content_length: i64,
    pub error: Option<String>,
}

/// The aggregated view over a run's Outcomes, or over several merged Reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub successful: u64,
    pub errors: u64,
    pub latency_sum_ms: u128,
    pub bytes_total: u64,
    pub fastest_ms: u64,
    pub slowest_ms: u64,
    pub mean_ms: u64,
    /// Requests per second, scaled by 100 (fixed-point: divide by 100 for
    /// the whole part, remainder by 100 for the two decimal digits). Kept
    /// as an integer rather than `f64` per this crate's `float_arithmetic`
    /// lint, the same fixed-point idiom the teacher uses for its own
    /// `avg_rps_x100`.
    pub rps_x100: u64,
    pub duration_ms: u64,
    pub status_dist: BTreeMap<u16, u64>,
    pub error_dist: BTreeMap<String, u64>,
    pub latency_buckets: BTreeMap<u64, u64>,
    pub error_code: i32,
    pub error_message: String,
    pub output: OutputFormat,
    pub last_sample_ms: u64,
    pub terminal: bool,
    /// Base64-encoded `hdrhistogram` snapshot, empty until the run finalizes.
    /// Carries sub-bucket precision across the wire so a coordinator merging
    /// remote Reports can still answer percentile reads precisely; when
    /// absent or undecodable, percentile reads fall back to `latency_buckets`.
    pub histogram_b64: String,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            successful: 0,
            errors: 0,
            latency_sum_ms: 0,
            bytes_total: 0,
            fastest_ms: u64::MAX,
            slowest_ms: 0,
            mean_ms: 0,
            rps_x100: 0,
            duration_ms: 0,
            status_dist: BTreeMap::new(),
            error_dist: BTreeMap::new(),
            latency_buckets: BTreeMap::new(),
            error_code: 0,
            error_message: String::new(),
            output: OutputFormat::Summary,
            last_sample_ms: now_epoch_ms(),
            terminal: false,
            histogram_b64: String::new(),
        }
    }
}

/// `rps_x100 = successful * RPS_SCALE / duration_ms`, i.e. `rps * 100` —
/// `1000` to convert milliseconds to seconds, `100` for the fixed-point
/// scale, matching the teacher's own `RPS_SCALE` constant in
/// `distributed/summary.rs`.
const RPS_SCALE: u128 = 100_000;

impl Report {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.successful.saturating_add(self.errors)
    }

    /// Recomputes `mean_ms`/`rps_x100` from the accumulated totals.
    /// `fastest_ms` is normalized to `0` when no successful Outcome was
    /// ever recorded (the sentinel `u64::MAX` used internally never
    /// escapes to callers).
    pub fn finalize_derived(&mut self) {
        if self.successful == 0 {
            self.fastest_ms = 0;
            self.mean_ms = 0;
        } else {
            self.mean_ms = self
                .latency_sum_ms
                .checked_div(u128::from(self.successful))
                .and_then(|value| u64::try_from(value).ok())
                .unwrap_or(u64::MAX);
        }
        self.rps_x100 = if self.duration_ms == 0 {
            0
        } else {
            u128::from(self.successful)
                .saturating_mul(RPS_SCALE)
                .checked_div(u128::from(self.duration_ms))
                .and_then(|value| u64::try_from(value).ok())
                .unwrap_or(u64::MAX)
        };
    }

    /// Returns `(p50, p90, p99)` latency in milliseconds.
    ///
    /// Prefers the embedded `hdrhistogram` snapshot for sub-bucket
    /// precision; falls back to `latency_buckets` (§4.5 tie-break: "the
    /// smallest bucket whose cumulative share >= P") when the histogram is
    /// absent or fails to decode, which is always the case for a Report
    /// built by hand rather than by the Result Sink.
    #[must_use]
    pub fn percentiles(&self) -> (u64, u64, u64) {
        if !self.histogram_b64.is_empty()
            && let Ok(histogram) = LatencyHistogram::decode_base64(&self.histogram_b64)
            && histogram.count() > 0
        {
            return histogram.percentiles();
        }
        (
            self.bucket_percentile(50),
            self.bucket_percentile(90),
            self.bucket_percentile(99),
        )
    }

    /// `share_pct` is the target cumulative share as a whole-number
    /// percentage (e.g. `50` for P50), avoiding float division/comparison.
    fn bucket_percentile(&self, share_pct: u64) -> u64 {
        if self.successful == 0 {
            return 0;
        }
        let mut cumulative: u64 = 0;
        for (bucket_ms, count) in &self.latency_buckets {
            cumulative = cumulative.saturating_add(*count);
            if cumulative.saturating_mul(100) >= self.successful.saturating_mul(share_pct) {
                return *bucket_ms;
            }
        }
        self.slowest_ms
    }
}

#[must_use]
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
