use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid header format: '{value}'. Expected 'Key: Value'")]
    InvalidHeaderFormat { value: String },
    #[error("Concurrency (-c) must be >= 1.")]
    ConcurrencyZero,
    #[error("Either -n or -d must be set (N>0 or duration>0).")]
    MissingNOrDuration,
    #[error("-n ({n}) must not be smaller than -c ({c}).")]
    RequestCountBelowConcurrency { n: u64, c: u64 },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid protocol '{value}'. Use http1, http2, http3, ws, or wss.")]
    InvalidProtocol { value: String },
    #[error("HTTP/3 support is not enabled in this build. Rebuild with --features http3.")]
    Http3NotEnabled,
    #[error("Invalid method '{value}'.")]
    InvalidMethod { value: String },
    #[error("Invalid output format '{value}'. Use summary, csv, or html.")]
    InvalidOutputFormat { value: String },
    #[error("Invalid body type '{value}'. Use string or hex.")]
    InvalidBodyType { value: String },
    #[error("Invalid hex body: {source}")]
    InvalidHexBody {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Expected format username:password.")]
    AuthPairInvalidFormat,
    #[error("Missing URL (set -url, provide one positionally, or use -file).")]
    MissingUrl,
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid listen address '{value}': {source}")]
    InvalidListenAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("Invalid worker address '{value}': {source}")]
    InvalidWorkerAddr {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid connect-to '{value}'. Expected 'host:port'.")]
    InvalidConnectTo { value: String },
    #[error("Value must be >= {min}.")]
    ValueTooSmall { min: u64 },
    #[error("Invalid value: {source}")]
    InvalidNumber {
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Runtime errors occurred.")]
    RuntimeErrors,
}
