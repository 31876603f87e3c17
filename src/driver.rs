//! Load Driver (C5): the per-run state machine. `Start` spawns `spec.c`
//! worker tasks against a `ClientPool`, folds their `Outcome`s through a
//! `ResultSink`, and stops on quota exhaustion, duration elapsed, a `Stop`
//! command, or the sink's circuit breaker tripping.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::warn;

use crate::domain::{Report, RunSpec};
use crate::error::HttpError;
use crate::metrics::{ResultSink, SinkHandle};
use crate::pool::ClientPool;
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;
const STATE_TERMINATED: u8 = 3;

fn decode_state(raw: u8) -> DriverState {
    match raw {
        STATE_RUNNING => DriverState::Running,
        STATE_STOPPING => DriverState::Stopping,
        STATE_TERMINATED => DriverState::Terminated,
        _ => DriverState::Idle,
    }
}

/// One running (or finished) load test. Cheap to share: `GetResult` reads
/// the sink's lock-free snapshot, and `Stop` only flips an atomic and
/// broadcasts a cancellation signal.
pub struct LoadDriver {
    spec: RunSpec,
    state: AtomicU8,
    sink: SinkHandle,
    stop_tx: broadcast::Sender<()>,
    stopped: AtomicBool,
}

impl LoadDriver {
    /// Starts a new run for `spec`, spawning `spec.c` worker tasks.
    ///
    /// Parses the URL and body templates once up front (spec.md §4.4 step
    /// 2): a parse error aborts immediately with an `InvalidTemplate` error
    /// recorded on the returned `Report` and no requests issued at all.
    ///
    /// # Errors
    ///
    /// Returns a `HttpError` if the client pool cannot be built.
    pub fn start(spec: RunSpec) -> Result<(Arc<Self>, tokio::task::JoinHandle<Report>), HttpError> {
        let (sink_handle, sink) = ResultSink::spawn(spec.output, 4096);
        let (stop_tx, _) = broadcast::channel(1);

        let driver = Arc::new(Self {
            spec: spec.clone(),
            state: AtomicU8::new(STATE_RUNNING),
            sink: sink_handle.clone(),
            stop_tx: stop_tx.clone(),
            stopped: AtomicBool::new(false),
        });

        let templates = Template::parse(&spec.url).and_then(|url_template| {
            Template::parse(&spec.body).map(|body_template| (url_template, body_template))
        });
        let (url_template, body_template) = match templates {
            Ok(pair) => pair,
            Err(err) => {
                let state_for_finish = Arc::clone(&driver);
                drop(sink_handle);
                let handle = tokio::spawn(async move {
                    let mut report = sink.finish().await;
                    report.error_code = 2;
                    report.error_message = format!("InvalidTemplate: {err}");
                    state_for_finish.state.store(STATE_TERMINATED, Ordering::Release);
                    report
                });
                return Ok((driver, handle));
            }
        };
        let url_template = Arc::new(url_template);
        let body_template = Arc::new(body_template);

        let pool = Arc::new(ClientPool::build(&spec, spec.c)?);
        let requests_per_worker = if spec.n > 0 {
            spec.n.checked_div(spec.c.max(1))
        } else {
            None
        };
        // `QPS` is a cap on the *combined* rate across all `C` workers (P9:
        // successful <= QPS * duration + C). Each worker's own interval is
        // stretched by a factor of `C` so the aggregate rate lands on `QPS`,
        // not `C` copies of it.
        let sleep_interval = if spec.qps > 0 {
            let stretched_micros = spec.c.saturating_mul(1_000_000);
            stretched_micros
                .checked_div(spec.qps.max(1))
                .map(Duration::from_micros)
        } else {
            None
        };
        let deadline = if spec.duration_ms > 0 {
            Instant::now().checked_add(Duration::from_millis(spec.duration_ms))
        } else {
            None
        };

        let mut worker_handles = Vec::with_capacity(usize::try_from(spec.c).unwrap_or(1));
        for _ in 0..spec.c {
            let spec = spec.clone();
            let pool = Arc::clone(&pool);
            let sink_handle = sink_handle.clone();
            let url_template = Arc::clone(&url_template);
            let body_template = Arc::clone(&body_template);
            let mut stop_rx = stop_tx.subscribe();
            worker_handles.push(tokio::spawn(async move {
                run_worker(
                    &spec,
                    &pool,
                    &sink_handle,
                    &url_template,
                    &body_template,
                    requests_per_worker,
                    sleep_interval,
                    deadline,
                    &mut stop_rx,
                )
                .await;
            }));
        }

        let state_for_finish = Arc::clone(&driver);
        let handle = tokio::spawn(async move {
            for worker in worker_handles {
                if worker.await.is_err() {
                    warn!("a worker task panicked; its results are partial");
                }
            }
            drop(sink_handle);
            let report = sink.finish().await;
            state_for_finish.state.store(STATE_TERMINATED, Ordering::Release);
            report
        });

        Ok((driver, handle))
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        decode_state(self.state.load(Ordering::Acquire))
    }

    /// Requests an early stop: flips to `Stopping` and broadcasts a
    /// cancellation to every worker. Idempotent.
    pub fn stop(&self) {
        self.state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok();
        self.stopped.store(true, Ordering::Release);
        let _ = self.stop_tx.send(());
    }

    /// Returns the latest `Report` snapshot without blocking on the run. If
    /// `stop()` was ever called on this driver, `error_code`/`error_message`
    /// are set to `1`/`"stopped"` per the `GetResult` contract.
    #[must_use]
    pub fn get_result(&self) -> Report {
        let mut report = self.sink.snapshot();
        if self.stopped.load(Ordering::Acquire) {
            report.error_code = 1;
            report.error_message = "stopped".to_owned();
        }
        report
    }

    #[must_use]
    pub const fn spec(&self) -> &RunSpec {
        &self.spec
    }
}

#[expect(clippy::too_many_arguments, reason = "grouping these into a struct would only move the list, not shorten it")]
async fn run_worker(
    spec: &RunSpec,
    pool: &ClientPool,
    sink: &SinkHandle,
    url_template: &Template,
    body_template: &Template,
    quota: Option<u64>,
    sleep_interval: Option<Duration>,
    deadline: Option<Instant>,
    stop_rx: &mut broadcast::Receiver<()>,
) {
    let client = pool.get();

    let mut sent: u64 = 0;
    loop {
        if let Some(quota) = quota {
            if sent >= quota {
                break;
            }
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        if sink.circuit_broken() {
            break;
        }
        if stop_rx.try_recv().is_ok() {
            break;
        }
        if let Some(interval) = sleep_interval {
            sleep(interval).await;
        }

        let url = match url_template.expand() {
            Ok(url) => url,
            Err(err) => {
                warn!("URL template expansion failed: {err}; worker exiting");
                let _ = sink.submit(expansion_error_outcome(&err)).await;
                break;
            }
        };
        let body = match body_template.expand() {
            Ok(body) => body,
            Err(err) => {
                warn!("body template expansion failed: {err}; worker exiting");
                let _ = sink.submit(expansion_error_outcome(&err)).await;
                break;
            }
        };

        let outcome = client.do_request(spec, &url, &body).await;
        sent = sent.saturating_add(1);
        if sink.submit(outcome).await.is_err() {
            break;
        }
    }
}

fn expansion_error_outcome(err: &crate::error::TemplateError) -> crate::domain::Outcome {
    crate::domain::Outcome {
        status: 0,
        elapsed_ms: 0,
        content_length: -1,
        error: Some(format!("template expansion failed: {err}")),
    }
}
