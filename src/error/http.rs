use thiserror::Error;

/// Errors from the Protocol Client (C2): transport construction and
/// per-request execution failures.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to build request: {source}")]
    BuildRequestFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Request failed: {source}")]
    RequestFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("WebSocket dial failed: {reason}")]
    WsDialFailed { reason: String },
    #[error("WebSocket send failed: {reason}")]
    WsSendFailed { reason: String },
    #[error("WebSocket recv failed: {reason}")]
    WsRecvFailed { reason: String },
    #[error("WebSocket connection closed before a reply was received.")]
    WsClosed,
    #[error("Unsupported protocol tag.")]
    Unsupported,
}
