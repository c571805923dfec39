// crates/ledger-bridge-core/tests/proptest_backoff.rs
// ============================================================================
// Module: Backoff and Idempotency Key Property Tests
// Description: Property tests for retry delays and request key derivation.
// Purpose: Detect cap violations and key collisions across wide input ranges.
// ============================================================================

//! Property-based tests for backoff and idempotency key invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::time::Duration;

use ledger_bridge_core::BackoffPolicy;
use ledger_bridge_core::IdempotencyKey;
use ledger_bridge_core::RequestId;
use ledger_bridge_core::ServiceName;
use ledger_bridge_core::TenantId;
use ledger_bridge_core::Timestamp;
use proptest::prelude::*;

proptest! {
    #[test]
    fn delay_never_exceeds_cap(base in 1_u64 .. 10_000, extra in 0_u64 .. 1_000_000, attempts in 1_u32 .. 200) {
        let policy = BackoffPolicy::new(Duration::from_millis(base), Duration::from_millis(base + extra));
        prop_assert!(policy.delay_for(attempts) <= policy.cap);
        prop_assert!(policy.delay_for(attempts) >= policy.base);
    }

    #[test]
    fn delay_is_non_decreasing(base in 1_u64 .. 10_000, extra in 0_u64 .. 1_000_000, attempts in 1_u32 .. 200) {
        let policy = BackoffPolicy::new(Duration::from_millis(base), Duration::from_millis(base + extra));
        prop_assert!(policy.delay_for(attempts) <= policy.delay_for(attempts + 1));
    }

    #[test]
    fn next_attempt_is_in_the_future(now in 0_i64 .. 4_000_000_000_000, attempts in 1_u32 .. 64) {
        let policy = BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(60));
        let now = Timestamp::from_unix_millis(now);
        prop_assert!(policy.next_attempt_at(now, attempts) > now);
    }

    #[test]
    fn idempotency_key_is_stable(tenant in ".{0,16}", service in ".{0,16}", request in ".{0,16}") {
        let first = IdempotencyKey::derive(
            &TenantId::new(tenant.clone()),
            &ServiceName::new(service.clone()),
            &RequestId::new(request.clone()),
        );
        let second = IdempotencyKey::derive(
            &TenantId::new(tenant),
            &ServiceName::new(service),
            &RequestId::new(request),
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn idempotency_key_separates_distinct_requests(
        tenant in "[a-z]{1,8}",
        service in "[a-z]{1,8}",
        first in "[a-z0-9]{1,12}",
        second in "[a-z0-9]{1,12}",
    ) {
        prop_assume!(first != second);
        let tenant = TenantId::new(tenant);
        let service = ServiceName::new(service);
        prop_assert_ne!(
            IdempotencyKey::derive(&tenant, &service, &RequestId::new(first)),
            IdempotencyKey::derive(&tenant, &service, &RequestId::new(second)),
        );
    }
}
