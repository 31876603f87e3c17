//! Process-wide shared random source for the Template Expander.
//!
//! Grounded on the teacher's pattern of sharing one `rand`-backed source
//! across concurrent workers (`http/rate.rs` builds its jitter the same
//! way): a `Mutex`-guarded `SmallRng` seeded once at process start, with a
//! seed hook so tests can request reproducible sequences.
use std::sync::Mutex;

use once_cell::sync::Lazy;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

static SHARED_RNG: Lazy<Mutex<SmallRng>> = Lazy::new(|| Mutex::new(SmallRng::from_entropy()));

/// Reseeds the shared source. Intended for reproducibility tests only.
pub fn seed(seed: u64) {
    let mut guard = SHARED_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    *guard = SmallRng::seed_from_u64(seed);
}

#[must_use]
pub fn gen_range_u64(min: u64, max: u64) -> u64 {
    let mut guard = SHARED_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if min >= max {
        return min;
    }
    guard.gen_range(min..=max)
}

#[must_use]
pub fn gen_range_f64(min: f64, max: f64) -> f64 {
    let mut guard = SHARED_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if min >= max {
        return min;
    }
    guard.gen_range(min..max)
}

#[must_use]
pub fn gen_bool() -> bool {
    let mut guard = SHARED_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.r#gen::<bool>()
}

#[must_use]
pub fn gen_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0_u8; n];
    let mut guard = SHARED_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.fill_bytes(&mut buf);
    buf
}

#[must_use]
pub fn choose_index(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let mut guard = SHARED_RNG.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    guard.gen_range(0..len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_respects_bounds() {
        for _ in 0..100 {
            let value = gen_range_u64(5, 10);
            assert!((5..=10).contains(&value));
        }
    }

    #[test]
    fn seeded_sequences_are_reproducible() {
        seed(42);
        let a = gen_range_u64(0, 1_000_000);
        seed(42);
        let b = gen_range_u64(0, 1_000_000);
        assert_eq!(a, b);
    }
}
