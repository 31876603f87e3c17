//! Protocol Client (C2): builds a transport for a `RunSpec` and executes
//! one request/exchange at a time, returning an `Outcome`.
mod http;
mod ws;

use std::time::Instant;

use crate::domain::{Outcome, ProtocolKind, RunSpec};
use crate::error::HttpError;

/// A transport bound to one `RunSpec`. HTTP variants hold a pooled
/// `reqwest::Client`; WebSocket variants dial once on first use and hold the
/// connection open for the rest of the slot's lifetime.
///
/// Cheaply `Clone`: `reqwest::Client` is internally `Arc`-backed and
/// `WsTransport`'s socket is behind an `Arc<Mutex<_>>`, so handing a clone to
/// each pool slot shares state without re-dialing.
#[derive(Clone)]
pub enum ProtocolClient {
    Http(http::HttpTransport),
    Ws(ws::WsTransport),
}

impl ProtocolClient {
    /// Builds the transport implied by `spec.protocol`.
    ///
    /// # Errors
    ///
    /// Returns a `HttpError` if the underlying client cannot be built.
    pub fn init(spec: &RunSpec) -> Result<Self, HttpError> {
        match spec.protocol {
            ProtocolKind::Http1 | ProtocolKind::Http2 | ProtocolKind::Http3 => {
                Ok(Self::Http(http::HttpTransport::new(spec)?))
            }
            ProtocolKind::Ws | ProtocolKind::Wss => Ok(Self::Ws(ws::WsTransport::new(spec))),
        }
    }

    /// Executes one request/exchange against `url`/`body`, both already
    /// expanded by the caller from the run's URL/body templates. Never
    /// returns an `Err`: transport failures are folded into `Outcome.error`
    /// so one bad request never aborts the worker loop.
    pub async fn do_request(&self, spec: &RunSpec, url: &str, body: &str) -> Outcome {
        let start = Instant::now();
        let result = match self {
            Self::Http(transport) => transport.send(spec, url, body).await,
            Self::Ws(transport) => transport.exchange(url, body).await,
        };
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok((status, content_length)) => Outcome {
                status,
                elapsed_ms,
                content_length,
                error: None,
            },
            Err(err) => Outcome {
                status: 0,
                elapsed_ms,
                content_length: -1,
                error: Some(err.to_string()),
            },
        }
    }

    /// Releases transport resources. HTTP clients drop their connection
    /// pool; WebSocket transports drop their cached socket, closing it.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyEncoding, CommandKind, HttpMethod, OutputFormat};

    fn http_spec(url: &str) -> RunSpec {
        RunSpec {
            seq: 1,
            command: CommandKind::Start,
            protocol: ProtocolKind::Http1,
            method: HttpMethod::Get,
            url: url.to_owned(),
            body: String::new(),
            body_encoding: BodyEncoding::Plain,
            n: 1,
            c: 1,
            duration_ms: 0,
            timeout_ms: 1000,
            qps: 0,
            disable_compression: false,
            disable_keepalive: false,
            headers: Vec::new(),
            proxy: None,
            output: OutputFormat::Summary,
            origin: "test".to_owned(),
        }
    }

    #[test]
    fn init_builds_http_transport_for_http1() {
        let spec = http_spec("http://127.0.0.1:1/");
        assert!(ProtocolClient::init(&spec).is_ok());
    }
}
