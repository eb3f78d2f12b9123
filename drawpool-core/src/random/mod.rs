//! Randomness used by draws.
//!
//! Pools never reach for a hidden global generator. They are handed a
//! [`RandomSource`] at construction, and the source documents how it stays
//! safe to call from many threads at once.

use std::cell::RefCell;

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub use xoroshiro128::Xoroshiro;

pub mod xoroshiro128;

/// A seedable, single-owner pseudo random generator.
pub trait RandomImpl {
    fn from_seed(seed: u64) -> Self;

    /// Uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// Shared source of uniform values in `[0, 1)`.
///
/// Implementations must be callable concurrently through `&self`.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Wraps a [`RandomImpl`] behind a mutex. Every call takes the lock for the
/// duration of one `next_f64`, which keeps seeded sequences reproducible.
pub struct LockedRandom<R> {
    inner: Mutex<R>,
}

impl<R: RandomImpl> LockedRandom<R> {
    pub fn new(random: R) -> Self {
        Self {
            inner: Mutex::new(random),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(R::from_seed(seed))
    }
}

impl<R: RandomImpl + Send> RandomSource for LockedRandom<R> {
    fn next_f64(&self) -> f64 {
        self.inner.lock().next_f64()
    }
}

thread_local! {
    static THREAD_RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

/// Lock-free source: every thread owns a generator seeded from OS entropy.
/// Sequences are not reproducible.
#[derive(Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        THREAD_RNG.with(|rng| rng.borrow_mut().gen::<f64>())
    }
}
