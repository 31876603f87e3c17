use thiserror::Error;

use super::HttpError;

/// Errors from the distributed control plane (C7): wire and connection
/// failures. A remote worker failure is recorded per-worker and does not
/// abort the coordinator (see `ERROR HANDLING DESIGN`, Control-plane errors).
#[derive(Debug, Error)]
pub enum DistributedError {
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Worker {addr} request failed: {source}")]
    WorkerRequestFailed {
        addr: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Worker {addr} returned non-success status {status}.")]
    WorkerNonSuccess { addr: String, status: u16 },
    #[error("Serialization error during {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Deserialization error during {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("No worker responded to the run.")]
    NoWorkerResponded,
    #[error("Worker failed to start the run: {source}")]
    WorkerStartFailed {
        #[source]
        source: HttpError,
    },
}
