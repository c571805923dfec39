// crates/ledger-bridge-runtime/src/telemetry.rs
// ============================================================================
// Module: Bridge Telemetry
// Description: Metric hooks for submission and projection outcomes.
// Purpose: Provide outcome counters and latency without hard deps.
// Dependencies: ledger-bridge-core
// ============================================================================

//! ## Overview
//! A thin metrics interface so deployments can plug in their own exporter.
//! Labels are stable strings; no payload data reaches a metric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use ledger_bridge_core::ChannelName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for ledger submissions.
pub const SUBMIT_LATENCY_BUCKETS_MS: &[u64] =
    &[5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Result of one submission attempt.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SubmissionOutcome {
    /// Ledger confirmed the transaction.
    Succeeded,
    /// Confirmed by idempotency-key lookup without resubmitting.
    Reconciled,
    /// Transient failure; rescheduled.
    Retried,
    /// Terminal failure; dead-lettered.
    Failed,
    /// Lease expired before the result was recorded.
    LeaseLost,
}

impl SubmissionOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Reconciled => "reconciled",
            Self::Retried => "retried",
            Self::Failed => "failed",
            Self::LeaseLost => "lease_lost",
        }
    }
}

/// Result of projecting one event.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ProjectionOutcome {
    /// Read model mutated.
    Applied,
    /// Already reflected.
    Duplicate,
    /// Dead-lettered and skipped.
    Skipped,
    /// Dead-lettered and the channel halted.
    Halted,
}

impl ProjectionOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::Skipped => "skipped",
            Self::Halted => "halted",
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for the bridge workers.
pub trait BridgeMetrics: Send + Sync {
    /// Records the outcome of a submission attempt.
    fn record_submission(&self, outcome: SubmissionOutcome);
    /// Records ledger call latency.
    fn record_submit_latency(&self, latency: Duration);
    /// Records the outcome of projecting an event.
    fn record_projection(&self, channel: &ChannelName, outcome: ProjectionOutcome);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl BridgeMetrics for NoopMetrics {
    fn record_submission(&self, _outcome: SubmissionOutcome) {}

    fn record_submit_latency(&self, _latency: Duration) {}

    fn record_projection(&self, _channel: &ChannelName, _outcome: ProjectionOutcome) {}
}
