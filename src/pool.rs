//! Client Pool (C3): hands each worker a transport handle without locking.
//!
//! `ProtocolClient` clones are cheap (the underlying `reqwest::Client` is
//! `Arc`-backed), so the pool pre-builds one handle per slot and hands them
//! out round-robin via an atomic cursor. `Get` never blocks and `Put` is a
//! no-op: there is nothing to return, since every clone is independently
//! valid for the lifetime of the run.
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::RunSpec;
use crate::error::HttpError;
use crate::protocol::ProtocolClient;

/// `first` plus `rest` (rather than a plain `Vec`) makes "the pool always
/// has at least one slot" a structural guarantee instead of a runtime one,
/// so `get` never needs to panic or fabricate an empty-pool fallback.
pub struct ClientPool {
    first: ProtocolClient,
    rest: Vec<ProtocolClient>,
    cursor: AtomicUsize,
}

impl ClientPool {
    /// Builds a pool of `size` transport handles for `spec`. `size` is
    /// clamped to at least 1.
    ///
    /// # Errors
    ///
    /// Returns a `HttpError` if the underlying transport cannot be built.
    pub fn build(spec: &RunSpec, size: u64) -> Result<Self, HttpError> {
        let size = usize::try_from(size.max(1)).unwrap_or(1);
        let first = ProtocolClient::init(spec)?;
        let mut rest = Vec::with_capacity(size.saturating_sub(1));
        for _ in 1..size {
            rest.push(ProtocolClient::init(spec)?);
        }
        Ok(Self {
            first,
            rest,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the next transport handle, round-robin, never blocking.
    #[must_use]
    pub fn get(&self) -> ProtocolClient {
        let total = self.rest.len().saturating_add(1);
        let index = self
            .cursor
            .fetch_add(1, Ordering::Relaxed)
            .checked_rem(total)
            .unwrap_or(0);
        match index.checked_sub(1) {
            None => self.first.clone(),
            Some(rest_index) => self.rest.get(rest_index).cloned().unwrap_or_else(|| self.first.clone()),
        }
    }

    /// Releases a handle back to the pool. A no-op: see module docs.
    pub const fn put(&self, _client: ProtocolClient) {}

    /// Drops every pooled handle.
    pub fn shutdown(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyEncoding, CommandKind, HttpMethod, OutputFormat, ProtocolKind};

    fn spec() -> RunSpec {
        RunSpec {
            seq: 1,
            command: CommandKind::Start,
            protocol: ProtocolKind::Http1,
            method: HttpMethod::Get,
            url: "http://127.0.0.1:1/".to_owned(),
            body: String::new(),
            body_encoding: BodyEncoding::Plain,
            n: 1,
            c: 4,
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
    fn pool_hands_out_handles_round_robin() {
        let pool = ClientPool::build(&spec(), 4).unwrap();
        for _ in 0..10 {
            let client = pool.get();
            pool.put(client);
        }
    }

    #[test]
    fn pool_size_is_clamped_to_at_least_one() {
        let pool = ClientPool::build(&spec(), 0).unwrap();
        assert!(pool.rest.is_empty());
    }
}
