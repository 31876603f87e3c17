use thiserror::Error;

/// Errors from the Result Sink (C4): histogram and channel failures.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Histogram error: {reason}")]
    Histogram { reason: String },
    #[error("Outcome channel closed unexpectedly.")]
    ChannelClosed,
    #[error("Failed to write report output: {source}")]
    WriteOutput {
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {source}")]
    SerializeReport {
        #[source]
        source: serde_json::Error,
    },
}
