// crates/ledger-bridge-runtime/src/clock.rs
// ============================================================================
// Module: Runtime Clocks
// Description: Wall clock and manually driven clock implementations.
// Purpose: Feed lease, backoff, and lag arithmetic from one time source.
// Dependencies: ledger-bridge-core
// ============================================================================

//! [`Clock`] implementations: wall clock and a manually driven test clock.

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ledger_bridge_core::Clock;
use ledger_bridge_core::Timestamp;

/// Wall clock in unix milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_unix_millis(millis)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current unix milliseconds.
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock fixed at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_unix_millis()),
        }
    }

    /// Sets the current time.
    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_unix_millis(), Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let step = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        let _ = self.millis.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            Some(current.saturating_add(step))
        });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.millis.load(Ordering::SeqCst))
    }
}
