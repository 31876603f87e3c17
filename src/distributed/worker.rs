//! Worker HTTP server (§4.7): accepts a `RunSpec` JSON body over a bare
//! `TcpStream` connection and dispatches Start/Stop/Metrics against the
//! Worker Registry, the same endpoint doubling as the Dashboard API
//! Adapter (§4.9).
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::dashboard::PLACEHOLDER_HTML;
use crate::domain::{CommandKind, Report, RunSpec};
use crate::driver::LoadDriver;
use crate::error::DistributedError;
use crate::registry;

use super::wire::{HttpRequest, read_http_request, write_empty_response, write_html_response, write_json_response};
use super::{AUTH_HEADER, api_path, auth_key};

/// Serves the worker control API (and the placeholder dashboard asset at
/// `/`) on `addr` until the process exits or the listener errors out.
///
/// # Errors
///
/// Returns a `DistributedError` if `addr` cannot be bound.
pub async fn serve(addr: &str) -> Result<(), DistributedError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| DistributedError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
    let path = api_path();
    let key = auth_key();
    info!("worker listening on {addr}, control path {path}");

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!("accept failed: {err}");
                continue;
            }
        };
        let path = path.clone();
        let key = key.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(socket, &path, key.as_deref()).await {
                warn!("connection from {peer} failed: {err}");
            }
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    api_path: &str,
    expected_key: Option<&str>,
) -> Result<(), DistributedError> {
    let request = match read_http_request(&mut socket).await {
        Ok(request) => request,
        Err(_) => return write_empty_response(&mut socket, 500).await,
    };

    if request.method.eq_ignore_ascii_case("OPTIONS") {
        return write_empty_response(&mut socket, 200).await;
    }

    if request.method.eq_ignore_ascii_case("GET") && request.path == "/" {
        return write_html_response(&mut socket, PLACEHOLDER_HTML).await;
    }

    if request.path != api_path || !request.method.eq_ignore_ascii_case("POST") {
        return write_empty_response(&mut socket, 500).await;
    }

    if let Some(expected) = expected_key {
        if !authorized(&request, expected) {
            return write_empty_response(&mut socket, 401).await;
        }
    }

    match dispatch(&request.body).await {
        Ok(report) => write_json_response(&mut socket, 200, &report).await,
        Err(_) => write_empty_response(&mut socket, 500).await,
    }
}

fn authorized(request: &HttpRequest, expected: &str) -> bool {
    request
        .headers
        .get(AUTH_HEADER)
        .is_some_and(|provided| provided == expected)
}

async fn dispatch(body: &[u8]) -> Result<Report, DistributedError> {
    let spec: RunSpec =
        serde_json::from_slice(body).map_err(|source| DistributedError::Deserialize {
            context: "run spec",
            source,
        })?;

    match spec.command {
        CommandKind::Start => run_start(spec).await,
        CommandKind::Stop => {
            if let Some(driver) = registry::remove(spec.seq) {
                driver.stop();
            }
            Ok(Report::default())
        }
        CommandKind::Metrics => Ok(registry::get(spec.seq)
            .map(|driver| driver.get_result())
            .unwrap_or_default()),
    }
}

async fn run_start(spec: RunSpec) -> Result<Report, DistributedError> {
    let seq = spec.seq;
    let (driver, handle): (Arc<LoadDriver>, _) =
        LoadDriver::start(spec).map_err(|source| DistributedError::WorkerStartFailed { source })?;
    registry::register(seq, Arc::clone(&driver));
    let report = match handle.await {
        Ok(report) => report,
        Err(_) => driver.get_result(),
    };
    registry::remove(seq);
    Ok(report)
}
