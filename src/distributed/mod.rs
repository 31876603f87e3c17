//! Control Plane (C7): the worker HTTP server and the coordinator fan-out.
//! Grounded on the teacher's `distributed/controller/http.rs` raw-socket
//! request/response pair and `distributed/summary.rs` aggregation path,
//! generalized from the teacher's bespoke `WireMessage` line protocol down
//! to the single POST-JSON `RunSpec`/`Report` contract of spec.md §4.7.
pub mod coordinator;
pub mod wire;
pub mod worker;

pub use coordinator::{run_coordinated, stop_coordinated};
pub use worker::serve;

/// Reads the worker API path, defaulting to `/api`, overridable via
/// `HTTPBENCH_WORKERAPI` (spec.md §6).
#[must_use]
pub fn api_path() -> String {
    std::env::var("HTTPBENCH_WORKERAPI").unwrap_or_else(|_| "/api".to_owned())
}

/// Reads the optional shared control-plane header value from
/// `HTTPBENCH_AUTH_KEY` (spec.md §6, Non-goals: "authentication of the
/// control plane beyond an optional shared header").
#[must_use]
pub fn auth_key() -> Option<String> {
    std::env::var("HTTPBENCH_AUTH_KEY")
        .ok()
        .filter(|key| !key.is_empty())
}

pub(crate) const AUTH_HEADER: &str = "x-strest-auth";
