// crates/ledger-bridge-core/src/core/backoff.rs
// ============================================================================
// Module: Ledger Bridge Retry Backoff
// Description: Capped exponential backoff for transient submission failures.
// Purpose: Derive retry delays from the failed-attempt count.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Delay after the `n`-th failed attempt is `base × 2^(n−1)`, capped at `cap`.
//! The first retry therefore waits exactly `base`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest exponent applied before the cap takes over.
const MAX_EXPONENT: u32 = 31;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Capped exponential backoff policy.
///
/// # Invariants
/// - `delay_for` never exceeds `cap` and is non-decreasing in `attempts`
///   provided `base <= cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base: Duration,
    /// Maximum delay.
    pub cap: Duration,
}

impl BackoffPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
        }
    }

    /// Returns the delay after `attempts` failed attempts.
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(MAX_EXPONENT);
        self.base.saturating_mul(1_u32 << exponent).min(self.cap)
    }

    /// Returns the earliest retry time after `attempts` failures observed at `now`.
    #[must_use]
    pub fn next_attempt_at(&self, now: Timestamp, attempts: u32) -> Timestamp {
        now.saturating_add(self.delay_for(attempts))
    }
}
