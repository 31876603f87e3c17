//! Coordinator fan-out (§4.7 steps 1-5): broadcasts a `RunSpec` to every
//! configured worker over HTTP and merges their final `Report`s via C8.
//! Workers stay raw-`TcpStream` servers (teacher idiom); the coordinator
//! uses `reqwest` (already a teacher dependency) since it is a client of
//! N workers rather than a server itself.
use reqwest::Client;
use tracing::warn;

use crate::domain::{CommandKind, Report, RunSpec};
use crate::driver::LoadDriver;
use crate::error::DistributedError;
use crate::merge;

use super::{AUTH_HEADER, api_path, auth_key};

/// Runs `spec` against every address in `workers`, merging results via
/// C8; runs locally against an in-process `LoadDriver` when `workers` is
/// empty (§4.7 step 5).
///
/// # Errors
///
/// Returns `DistributedError::NoWorkerResponded` if every worker request
/// fails, or `DistributedError::WorkerStartFailed` if the local run
/// cannot start.
pub async fn run_coordinated(spec: &RunSpec, workers: &[String]) -> Result<Report, DistributedError> {
    if workers.is_empty() {
        return run_locally(spec).await;
    }

    let client = Client::new();
    let path = api_path();
    let key = auth_key();

    let mut tasks = Vec::with_capacity(workers.len());
    for addr in workers {
        tasks.push(tokio::spawn(dispatch(
            client.clone(),
            addr.clone(),
            path.clone(),
            key.clone(),
            spec.clone(),
        )));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for (addr, task) in workers.iter().zip(tasks) {
        match task.await {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(err)) => warn!("worker {addr} failed: {err}"),
            Err(err) => warn!("worker {addr} task panicked: {err}"),
        }
    }

    if reports.is_empty() {
        return Err(DistributedError::NoWorkerResponded);
    }
    Ok(merge::merge(&reports))
}

/// Best-effort broadcast of a `Stop` for `seq` to every worker (§4.7 step
/// 4): failures are logged, never propagated, since a worker that has
/// already finished has nothing left to stop.
pub async fn stop_coordinated(seq: i64, workers: &[String]) {
    if workers.is_empty() {
        return;
    }
    let client = Client::new();
    let path = api_path();
    let key = auth_key();
    let stop_spec = blank_spec(seq);

    let mut tasks = Vec::with_capacity(workers.len());
    for addr in workers {
        tasks.push(tokio::spawn(dispatch(
            client.clone(),
            addr.clone(),
            path.clone(),
            key.clone(),
            stop_spec.clone(),
        )));
    }
    for (addr, task) in workers.iter().zip(tasks) {
        if let Ok(Err(err)) = task.await {
            warn!("stop request to worker {addr} failed: {err}");
        }
    }
}

async fn run_locally(spec: &RunSpec) -> Result<Report, DistributedError> {
    let (_, handle) = LoadDriver::start(spec.clone())
        .map_err(|source| DistributedError::WorkerStartFailed { source })?;
    handle.await.map_err(|_| DistributedError::NoWorkerResponded)
}

async fn dispatch(
    client: Client,
    addr: String,
    path: String,
    key: Option<String>,
    spec: RunSpec,
) -> Result<Report, DistributedError> {
    let url = format!("{addr}{path}");
    let mut request = client.post(&url).json(&spec);
    if let Some(key) = &key {
        request = request.header(AUTH_HEADER, key);
    }
    let response = request
        .send()
        .await
        .map_err(|source| DistributedError::WorkerRequestFailed {
            addr: addr.clone(),
            source,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(DistributedError::WorkerNonSuccess {
            addr,
            status: status.as_u16(),
        });
    }
    response
        .json::<Report>()
        .await
        .map_err(|source| DistributedError::WorkerRequestFailed { addr, source })
}

/// A minimal `RunSpec` carrying only `seq`, for `Stop`/`Metrics` wire
/// messages that don't need the full run description.
fn blank_spec(seq: i64) -> RunSpec {
    RunSpec {
        seq,
        command: CommandKind::Stop,
        protocol: crate::domain::ProtocolKind::Http1,
        method: crate::domain::HttpMethod::Get,
        url: String::new(),
        body: String::new(),
        body_encoding: crate::domain::BodyEncoding::Plain,
        n: 0,
        c: 1,
        duration_ms: 0,
        timeout_ms: 0,
        qps: 0,
        disable_compression: false,
        disable_keepalive: false,
        headers: Vec::new(),
        proxy: None,
        output: crate::domain::OutputFormat::Summary,
        origin: "coordinator".to_owned(),
    }
}
