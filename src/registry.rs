//! Worker Registry (C6): process-wide table of in-flight `LoadDriver`s,
//! keyed by `RunSpec.seq`. Mirrors the shared-state idiom already used for
//! the template expander's RNG (`template::random`): a `Lazy` static
//! guarded by a single lock, since registrations are rare compared to the
//! request volume they track.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::driver::LoadDriver;

static REGISTRY: Lazy<RwLock<HashMap<i64, Arc<LoadDriver>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn lock_read() -> std::sync::RwLockReadGuard<'static, HashMap<i64, Arc<LoadDriver>>> {
    REGISTRY.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn lock_write() -> std::sync::RwLockWriteGuard<'static, HashMap<i64, Arc<LoadDriver>>> {
    REGISTRY.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Registers a running driver under `seq`, replacing (and dropping) any
/// prior driver registered under the same sequence number.
pub fn register(seq: i64, driver: Arc<LoadDriver>) {
    lock_write().insert(seq, driver);
}

/// Looks up a previously registered driver.
#[must_use]
pub fn get(seq: i64) -> Option<Arc<LoadDriver>> {
    lock_read().get(&seq).cloned()
}

/// Removes and returns a driver, e.g. once its run has terminated.
pub fn remove(seq: i64) -> Option<Arc<LoadDriver>> {
    lock_write().remove(&seq)
}

/// Number of drivers currently tracked. Exposed for diagnostics/tests.
#[must_use]
pub fn len() -> usize {
    lock_read().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyEncoding, CommandKind, HttpMethod, OutputFormat, ProtocolKind, RunSpec};

    fn spec(seq: i64) -> RunSpec {
        RunSpec {
            seq,
            command: CommandKind::Start,
            protocol: ProtocolKind::Http1,
            method: HttpMethod::Get,
            url: "http://127.0.0.1:1/".to_owned(),
            body: String::new(),
            body_encoding: BodyEncoding::Plain,
            n: 0,
            c: 1,
            duration_ms: 60_000,
            timeout_ms: 200,
            qps: 0,
            disable_compression: false,
            disable_keepalive: false,
            headers: Vec::new(),
            proxy: None,
            output: OutputFormat::Summary,
            origin: "test".to_owned(),
        }
    }

    #[tokio::test]
    async fn register_get_and_remove_round_trip() {
        let seq = 987_654_321;
        let (driver, _handle) = LoadDriver::start(spec(seq)).unwrap();
        register(seq, driver);
        assert!(get(seq).is_some());
        let removed = remove(seq);
        assert!(removed.is_some());
        assert!(get(seq).is_none());
        removed.unwrap().stop();
    }
}
