// crates/ledger-bridge-runtime/src/health.rs
// ============================================================================
// Module: Lag and Health Monitor
// Description: Readiness derived from projection lag, halts, and dead letters.
// Purpose: Report whether the bridge is keeping up; never retries anything.
// Dependencies: ledger-bridge-core, ledger-bridge-config, serde
// ============================================================================

//! ## Overview
//! `lag(channel) = now - checkpoint.updated_at`. The bridge is ready only when
//! the store answers queries, every configured channel has a checkpoint whose
//! lag is below the threshold, no channel is halted, and unresolved dead
//! letters are below the ceiling. A channel with no checkpoint yet is unready.
//! A submitter stopped on a permanent store failure also makes the bridge
//! unready.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use ledger_bridge_config::HealthConfig;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::Clock;
use ledger_bridge_core::DeadLetterStore;
use ledger_bridge_core::EventId;
use ledger_bridge_core::ProjectionStore;
use ledger_bridge_core::StoreError;
use serde::Serialize;

use crate::projector::ChannelStatus;
use crate::projector::ProjectorHandle;
use crate::submitter::SubmitterHandle;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Database health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseHealth {
    /// Store answered a readiness query.
    Healthy,
    /// Store query failed.
    Unhealthy,
}

/// Aggregate projection lag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LagSummary {
    /// Worst lag across channels with a checkpoint.
    pub lag_ms: Option<u64>,
    /// Configured threshold.
    pub threshold_ms: u64,
}

/// Readiness of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReadiness {
    /// Channel name.
    pub channel: ChannelName,
    /// Checkpoint position rendered as `(block,tx)`.
    pub checkpoint: Option<String>,
    /// Lag since the checkpoint last moved.
    pub lag_ms: Option<u64>,
    /// True when the channel is halted.
    pub halted: bool,
    /// Halt reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_reason: Option<String>,
    /// Event that halted the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_event_id: Option<EventId>,
    /// Channel readiness.
    pub ready: bool,
}

/// Dead-letter pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeadLetterSummary {
    /// Unresolved dead letters.
    pub count: u64,
    /// Configured ceiling.
    pub ceiling: u64,
}

/// Readiness report served to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    /// Overall readiness.
    pub ready: bool,
    /// Database health.
    pub database: DatabaseHealth,
    /// Store error when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_error: Option<String>,
    /// Aggregate lag.
    pub projection_lag: LagSummary,
    /// Per-channel detail.
    pub channels: Vec<ChannelReadiness>,
    /// Dead-letter pressure.
    pub dead_letters: DeadLetterSummary,
    /// Failure that stopped the submitter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_stopped: Option<String>,
}

// ============================================================================
// SECTION: Monitor
// ============================================================================

/// Computes readiness on demand.
pub struct HealthMonitor {
    /// Read-model store.
    store: Arc<dyn ProjectionStore>,
    /// Dead-letter store.
    dead_letters: Arc<dyn DeadLetterStore>,
    /// Channels expected to be projected.
    channels: Vec<ChannelName>,
    /// Projector status handle.
    projectors: ProjectorHandle,
    /// Submitter stop state, when a submitter is attached.
    submitter: Option<SubmitterHandle>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Maximum tolerated lag.
    lag_threshold: Duration,
    /// Unresolved dead letters at which the bridge is unready.
    dead_letter_ceiling: u64,
}

impl HealthMonitor {
    /// Creates a monitor.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProjectionStore>,
        dead_letters: Arc<dyn DeadLetterStore>,
        channels: Vec<ChannelName>,
        projectors: ProjectorHandle,
        clock: Arc<dyn Clock>,
        config: &HealthConfig,
    ) -> Self {
        Self {
            store,
            dead_letters,
            channels,
            projectors,
            submitter: None,
            clock,
            lag_threshold: config.lag_threshold(),
            dead_letter_ceiling: config.dead_letter_ceiling,
        }
    }

    /// Attaches the submitter so a stopped worker is reported.
    #[must_use]
    pub fn with_submitter(mut self, submitter: SubmitterHandle) -> Self {
        self.submitter = Some(submitter);
        self
    }

    /// Builds a readiness report. Performs blocking store reads.
    #[must_use]
    pub fn readiness(&self) -> ReadinessReport {
        let threshold_ms = duration_ms(self.lag_threshold);
        let submitter_stopped = self.submitter.as_ref().and_then(SubmitterHandle::stopped_reason);
        match self.read_state() {
            Ok((channels, dead_letters)) => {
                let lag_ms = channels.iter().filter_map(|channel| channel.lag_ms).max();
                let ready = channels.iter().all(|channel| channel.ready)
                    && dead_letters < self.dead_letter_ceiling
                    && submitter_stopped.is_none();
                ReadinessReport {
                    ready,
                    database: DatabaseHealth::Healthy,
                    database_error: None,
                    projection_lag: LagSummary {
                        lag_ms,
                        threshold_ms,
                    },
                    channels,
                    dead_letters: DeadLetterSummary {
                        count: dead_letters,
                        ceiling: self.dead_letter_ceiling,
                    },
                    submitter_stopped,
                }
            }
            Err(err) => ReadinessReport {
                ready: false,
                database: DatabaseHealth::Unhealthy,
                database_error: Some(err.to_string()),
                projection_lag: LagSummary {
                    lag_ms: None,
                    threshold_ms,
                },
                channels: self
                    .channels
                    .iter()
                    .map(|channel| self.channel_without_checkpoint(channel))
                    .collect(),
                dead_letters: DeadLetterSummary {
                    count: 0,
                    ceiling: self.dead_letter_ceiling,
                },
                submitter_stopped,
            },
        }
    }

    /// Reads store state for every channel.
    fn read_state(&self) -> Result<(Vec<ChannelReadiness>, u64), StoreError> {
        self.store.readiness()?;
        let now = self.clock.now();
        let mut channels = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let Some(checkpoint) = self.store.checkpoint(channel)? else {
                channels.push(self.channel_without_checkpoint(channel));
                continue;
            };
            let lag = now.duration_since(checkpoint.updated_at);
            let (halted, halted_reason, halted_event_id) = self.halt_detail(channel);
            channels.push(ChannelReadiness {
                channel: channel.clone(),
                checkpoint: Some(checkpoint.position.to_string()),
                lag_ms: Some(duration_ms(lag)),
                halted,
                halted_reason,
                halted_event_id,
                ready: !halted && lag < self.lag_threshold,
            });
        }
        let dead_letters = self.dead_letters.unresolved_dead_letters()?;
        Ok((channels, dead_letters))
    }

    /// Entry for a channel that has never committed an event.
    fn channel_without_checkpoint(&self, channel: &ChannelName) -> ChannelReadiness {
        let (halted, halted_reason, halted_event_id) = self.halt_detail(channel);
        ChannelReadiness {
            channel: channel.clone(),
            checkpoint: None,
            lag_ms: None,
            halted,
            halted_reason,
            halted_event_id,
            ready: false,
        }
    }

    /// Returns halt state from the projector handle.
    fn halt_detail(&self, channel: &ChannelName) -> (bool, Option<String>, Option<EventId>) {
        match self.projectors.status(channel) {
            Some(ChannelStatus::Halted {
                reason,
                event_id,
            }) => (true, Some(reason), event_id),
            Some(ChannelStatus::Running) | None => (false, None, None),
        }
    }
}

/// Converts a duration to whole milliseconds, saturating.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
