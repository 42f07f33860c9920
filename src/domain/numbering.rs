//! Business number generation
//!
//! Account numbers, transaction reference numbers and share certificate
//! numbers. Randomness comes from a seedable RNG so tests can reproduce
//! sequences.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::{Mutex, PoisonError};

use super::clock::SharedClock;
use crate::aggregate::AccountKind;

pub struct NumberGenerator {
    clock: SharedClock,
    rng: Mutex<StdRng>,
}

impl NumberGenerator {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator for tests
    pub fn seeded(clock: SharedClock, seed: u64) -> Self {
        Self {
            clock,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// `FORMAL-{last 8 digits of epoch millis}{4 random digits}`, same shape
    /// for `INFORMAL-`.
    pub fn account_number(&self, kind: AccountKind) -> String {
        let millis = self.clock.now().timestamp_millis().to_string();
        let tail = &millis[millis.len().saturating_sub(8)..];
        let suffix: u16 = self.with_rng(|rng| rng.gen_range(0..10_000));
        format!("{}-{}{:04}", kind.as_str(), tail, suffix)
    }

    /// `TXN` followed by 8 uppercase hex characters
    pub fn reference_number(&self) -> String {
        let bytes: [u8; 4] = self.with_rng(|rng| rng.gen());
        format!("TXN{}", hex::encode_upper(bytes))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl fmt::Debug for NumberGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberGenerator")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// `SH-{employeeId}-{sequence:03}`; sequences start at 1
pub fn certificate_number(employee_id: &str, sequence: usize) -> String {
    format!("SH-{}-{:03}", employee_id, sequence)
}
