#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::manual_assert)]

//! Discrete logarithms base `g` for small exponents, with a monotonic cache.
//!
//! Plaintext tallies are small nonnegative integers, so `dlog_g(x)` is
//! computed by walking `g^0, g^1, g^2, ...` and caching every step. Lookups
//! of already-cached values take a shared read lock only; the extension walk
//! is serialized behind a separate mutex so concurrent misses do the work
//! once. Pre-warming to the largest expected tally collapses every later
//! lookup to a map read.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use num_bigint::BigUint;
use num_traits::One;
use thiserror::Error;

use util::algebra::{Group, GroupElement};

/// The hard ceiling on computed exponents. Walking this far already means
/// something upstream went wrong.
pub const DLOG_MAX_EXPONENT: u64 = 100_000_000;

/// Errors surfaced by the discrete-log cache. Never silently mapped to zero.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DiscreteLogError {
    /// The requested pre-warm exponent exceeds [`DLOG_MAX_EXPONENT`].
    #[error("discrete log exponent {0} exceeds the maximum of {DLOG_MAX_EXPONENT}")]
    ExponentExceedsMaximum(u64),

    /// The element was not reached below the exponent ceiling.
    #[error("discrete log not found below the exponent ceiling {DLOG_MAX_EXPONENT}")]
    NotFound,
}

struct ExtensionState {
    max_element: BigUint,
    max_exponent: u64,
}

/// A shared discrete-log cache for one group.
///
/// One instance is meant to be created per process and shared (e.g. behind
/// an `Arc`) by everything decrypting under the same parameters.
pub struct DiscreteLog {
    cache: RwLock<HashMap<BigUint, u64>>,
    extension: Mutex<ExtensionState>,
}

impl Default for DiscreteLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscreteLog {
    /// Creates a cache seeded with `g^0 = 1`.
    pub fn new() -> Self {
        let one = BigUint::one();
        let mut cache = HashMap::new();
        cache.insert(one.clone(), 0);
        DiscreteLog {
            cache: RwLock::new(cache),
            extension: Mutex::new(ExtensionState {
                max_element: one,
                max_exponent: 0,
            }),
        }
    }

    /// Computes `dlog_g(element)` in the given group.
    ///
    /// Cached values return immediately; otherwise the cache extends
    /// monotonically until the element is found or the ceiling is reached.
    pub fn discrete_log(
        &self,
        element: &GroupElement,
        group: &Group,
    ) -> Result<u64, DiscreteLogError> {
        if let Some(exponent) = self.lookup(element.as_biguint()) {
            return Ok(exponent);
        }

        let mut state = lock_unpoisoned(&self.extension);

        // A concurrent caller may have extended past this element while we
        // waited for the mutex.
        if let Some(exponent) = self.lookup(element.as_biguint()) {
            return Ok(exponent);
        }

        self.extend_until(&mut state, group, |candidate, _| {
            candidate == element.as_biguint()
        })
        .ok_or(DiscreteLogError::NotFound)
    }

    /// Extends the cache through the given exponent so later lookups up to
    /// that tally are pure reads.
    pub fn prewarm(&self, exponent: u64, group: &Group) -> Result<(), DiscreteLogError> {
        if exponent > DLOG_MAX_EXPONENT {
            return Err(DiscreteLogError::ExponentExceedsMaximum(exponent));
        }

        let mut state = lock_unpoisoned(&self.extension);
        if state.max_exponent >= exponent {
            return Ok(());
        }
        let _ = self.extend_until(&mut state, group, |_, e| e >= exponent);
        Ok(())
    }

    fn lookup(&self, value: &BigUint) -> Option<u64> {
        read_unpoisoned(&self.cache).get(value).copied()
    }

    /// Walks `g^e` upward, inserting each step, until `done` says stop or
    /// the ceiling is hit. Returns the final exponent when `done` fired.
    fn extend_until(
        &self,
        state: &mut ExtensionState,
        group: &Group,
        done: impl Fn(&BigUint, u64) -> bool,
    ) -> Option<u64> {
        let g = group.generator();
        while !done(&state.max_element, state.max_exponent) {
            if state.max_exponent >= DLOG_MAX_EXPONENT {
                return None;
            }
            state.max_exponent += 1;
            state.max_element = state.max_element.clone() * g.as_biguint() % group.modulus();
            write_unpoisoned(&self.cache).insert(state.max_element.clone(), state.max_exponent);
        }
        Some(state.max_exponent)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_unpoisoned<T>(rwlock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_unpoisoned<T>(rwlock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rwlock
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod test {
    use super::*;
    use util::algebra::FieldElement;
    use util::pow_radix::PowRadixOption;

    use crate::standard_parameters::test_parameters;

    #[test]
    fn finds_small_exponents() {
        let fixed_parameters = test_parameters(PowRadixOption::NoAcceleration);
        let group = &fixed_parameters.group;
        let field = &fixed_parameters.field;
        let dlog = DiscreteLog::new();

        for e in [0u64, 1, 2, 3, 10, 100, 557] {
            let x = group.g_exp(&FieldElement::from(e, field));
            assert_eq!(dlog.discrete_log(&x, group), Ok(e));
        }

        // Revisiting a smaller exponent hits the cache.
        let x = group.g_exp(&FieldElement::from(3_u8, field));
        assert_eq!(dlog.discrete_log(&x, group), Ok(3));
    }

    #[test]
    fn prewarm_bounds() {
        let fixed_parameters = test_parameters(PowRadixOption::NoAcceleration);
        let group = &fixed_parameters.group;
        let dlog = DiscreteLog::new();

        assert_eq!(dlog.prewarm(1000, group), Ok(()));
        assert_eq!(
            dlog.prewarm(DLOG_MAX_EXPONENT + 1, group),
            Err(DiscreteLogError::ExponentExceedsMaximum(
                DLOG_MAX_EXPONENT + 1
            ))
        );
    }

    #[test]
    fn shared_across_threads() {
        let fixed_parameters = test_parameters(PowRadixOption::NoAcceleration);
        let group = fixed_parameters.group.clone();
        let field = fixed_parameters.field.clone();
        let dlog = std::sync::Arc::new(DiscreteLog::new());

        let handles: Vec<_> = (0u64..4)
            .map(|i| {
                let dlog = dlog.clone();
                let group = group.clone();
                let field = field.clone();
                std::thread::spawn(move || {
                    let x = group.g_exp(&FieldElement::from(100 + i, &field));
                    dlog.discrete_log(&x, &group)
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            #[allow(clippy::unwrap_used)]
            let result = handle.join().unwrap();
            assert_eq!(result, Ok(100 + i as u64));
        }
    }
}
