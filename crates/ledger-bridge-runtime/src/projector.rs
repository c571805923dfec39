// crates/ledger-bridge-runtime/src/projector.rs
// ============================================================================
// Module: Channel Projector
// Description: Per-channel worker mirroring ledger events into read models.
// Purpose: Apply each committed event exactly once, in position order.
// Dependencies: ledger-bridge-core, ledger-bridge-config, serde, tokio
// ============================================================================

//! ## Overview
//! One projector runs per channel and processes events sequentially. Each
//! event is validated against the schema registry and then applied in a
//! single store transaction that also writes the apply log and checkpoint.
//!
//! Invalid events are dead-lettered. Under [`PoisonPillPolicy::Halt`] the
//! channel stops with its checkpoint unchanged; under
//! [`PoisonPillPolicy::Skip`] the checkpoint moves past the event atomically
//! with the dead letter. Consistency violations and permanent store failures
//! always halt. Transient store or feed failures leave the checkpoint alone
//! and retry on the next poll.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use ledger_bridge_config::PoisonPillPolicy;
use ledger_bridge_config::ProjectorConfig;
use ledger_bridge_core::ApplyOutcome;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::DeadLetterSource;
use ledger_bridge_core::DeadLetterStore;
use ledger_bridge_core::EventId;
use ledger_bridge_core::EventPayload;
use ledger_bridge_core::EventSource;
use ledger_bridge_core::FailureClass;
use ledger_bridge_core::LedgerEvent;
use ledger_bridge_core::NewDeadLetter;
use ledger_bridge_core::ProjectionError;
use ledger_bridge_core::ProjectionStore;
use ledger_bridge_core::SchemaRegistry;
use ledger_bridge_core::SchemaViolation;
use serde::Serialize;

use crate::audit::BridgeAuditEvent;
use crate::error::RuntimeError;
use crate::submitter::WorkerContext;
use crate::telemetry::ProjectionOutcome;

// ============================================================================
// SECTION: Channel Status
// ============================================================================

/// Lifecycle state of a projector channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Projecting normally.
    Running,
    /// Stopped until restart; the checkpoint is left at the last good event.
    Halted {
        /// Why the channel stopped.
        reason: String,
        /// Event that caused the halt.
        event_id: Option<EventId>,
    },
}

/// Shared view of every projector channel's status.
#[derive(Debug, Clone, Default)]
pub struct ProjectorHandle {
    /// Status per channel.
    statuses: Arc<Mutex<BTreeMap<ChannelName, ChannelStatus>>>,
}

impl ProjectorHandle {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a channel as running.
    pub fn register(&self, channel: &ChannelName) {
        self.lock().insert(channel.clone(), ChannelStatus::Running);
    }

    /// Returns the status of a channel.
    #[must_use]
    pub fn status(&self, channel: &ChannelName) -> Option<ChannelStatus> {
        self.lock().get(channel).cloned()
    }

    /// Returns every channel status.
    #[must_use]
    pub fn statuses(&self) -> BTreeMap<ChannelName, ChannelStatus> {
        self.lock().clone()
    }

    /// Returns true when the channel is halted.
    #[must_use]
    pub fn is_halted(&self, channel: &ChannelName) -> bool {
        matches!(self.status(channel), Some(ChannelStatus::Halted { .. }))
    }

    /// Halts a channel.
    fn halt(&self, channel: &ChannelName, reason: String, event_id: Option<EventId>) {
        self.lock().insert(
            channel.clone(),
            ChannelStatus::Halted {
                reason,
                event_id,
            },
        );
    }

    /// Locks the status map, recovering from a poisoned lock.
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ChannelName, ChannelStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Resolved projector settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectorSettings {
    /// Maximum events fetched per poll.
    pub batch_size: usize,
    /// Delay between polls when the feed is drained.
    pub poll_interval: Duration,
    /// Handling of events that fail validation.
    pub poison_pill: PoisonPillPolicy,
}

impl ProjectorSettings {
    /// Resolves settings from configuration.
    #[must_use]
    pub const fn from_config(config: &ProjectorConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            poll_interval: config.poll_interval(),
            poison_pill: config.poison_pill,
        }
    }
}

/// Counts from one projector poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Events returned by the feed.
    pub fetched: usize,
    /// Events applied.
    pub applied: usize,
    /// Events already reflected.
    pub duplicates: usize,
    /// Events dead-lettered and skipped.
    pub skipped: usize,
    /// Channel is halted.
    pub halted: bool,
}

// ============================================================================
// SECTION: Projector
// ============================================================================

/// Projector for a single channel.
pub struct ChannelProjector {
    /// Channel this projector owns.
    channel: ChannelName,
    /// Read-model store.
    store: Arc<dyn ProjectionStore>,
    /// Dead-letter store for halting failures.
    dead_letters: Arc<dyn DeadLetterStore>,
    /// Ordered event feed.
    source: Arc<dyn EventSource>,
    /// Event schema registry.
    registry: Arc<SchemaRegistry>,
    /// Ambient services.
    context: WorkerContext,
    /// Resolved settings.
    settings: ProjectorSettings,
    /// Shared status handle.
    handle: ProjectorHandle,
}

impl ChannelProjector {
    /// Creates a projector and registers its channel as running.
    #[allow(clippy::too_many_arguments, reason = "Each projector dependency is passed separately.")]
    #[must_use]
    pub fn new(
        channel: ChannelName,
        store: Arc<dyn ProjectionStore>,
        dead_letters: Arc<dyn DeadLetterStore>,
        source: Arc<dyn EventSource>,
        registry: Arc<SchemaRegistry>,
        context: WorkerContext,
        settings: ProjectorSettings,
        handle: ProjectorHandle,
    ) -> Self {
        handle.register(&channel);
        Self {
            channel,
            store,
            dead_letters,
            source,
            registry,
            context,
            settings,
            handle,
        }
    }

    /// Returns the channel.
    #[must_use]
    pub const fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Polls until shutdown is requested or the channel halts.
    ///
    /// Transient failures are retried on the next poll; any other failure
    /// halts the channel.
    pub async fn run(self) {
        let shutdown = self.context.shutdown.clone();
        while !shutdown.is_triggered() {
            let idle = match self.poll_once().await {
                Ok(summary) if summary.halted => break,
                Ok(summary) => summary.fetched == 0,
                Err(err) if err.is_transient() => {
                    self.context.audit.record(&BridgeAuditEvent::store_retry(
                        self.context.clock.now(),
                        &format!("projector[{}]", self.channel),
                        &err.to_string(),
                    ));
                    true
                }
                Err(err) => {
                    self.halt_channel(err.to_string());
                    break;
                }
            };
            if idle && shutdown.sleep(self.settings.poll_interval).await {
                break;
            }
        }
    }

    /// Fetches one batch after the checkpoint and projects it.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] on store or feed failures; nothing past the
    /// last committed event is lost.
    pub async fn poll_once(&self) -> Result<PollSummary, RuntimeError> {
        let mut summary = PollSummary::default();
        if self.handle.is_halted(&self.channel) {
            summary.halted = true;
            return Ok(summary);
        }
        let store = Arc::clone(&self.store);
        let channel = self.channel.clone();
        let checkpoint = tokio::task::spawn_blocking(move || store.checkpoint(&channel)).await??;
        let events = self
            .source
            .fetch(
                &self.channel,
                checkpoint.map(|checkpoint| checkpoint.position),
                self.settings.batch_size,
            )
            .await?;
        summary.fetched = events.len();
        for event in events {
            if self.context.shutdown.is_triggered() {
                break;
            }
            let outcome = self.project(event).await?;
            self.context.metrics.record_projection(&self.channel, outcome);
            match outcome {
                ProjectionOutcome::Applied => summary.applied += 1,
                ProjectionOutcome::Duplicate => summary.duplicates += 1,
                ProjectionOutcome::Skipped => summary.skipped += 1,
                ProjectionOutcome::Halted => {
                    summary.halted = true;
                    break;
                }
            }
        }
        Ok(summary)
    }

    /// Validates and applies one event.
    async fn project(&self, event: LedgerEvent) -> Result<ProjectionOutcome, RuntimeError> {
        if event.channel_name != self.channel {
            let reason = format!(
                "event source delivered channel {} to projector {}",
                event.channel_name, self.channel
            );
            return self.halt(&event, FailureClass::ConsistencyViolation, reason).await;
        }
        match self.registry.validate(&event.event_name, &event.event_version, &event.payload) {
            Ok(validated) => {
                if validated.deprecated {
                    self.context.audit.record(&BridgeAuditEvent::schema_deprecated(
                        self.context.clock.now(),
                        &self.channel,
                        event.event_id,
                        format!("{}@{}", event.event_name, event.event_version),
                    ));
                }
                self.apply(event, validated.payload).await
            }
            Err(violations) => self.reject(event, &violations).await,
        }
    }

    /// Applies a validated event in one store transaction.
    async fn apply(
        &self,
        event: LedgerEvent,
        payload: EventPayload,
    ) -> Result<ProjectionOutcome, RuntimeError> {
        let store = Arc::clone(&self.store);
        let now = self.context.clock.now();
        let (event, result) = tokio::task::spawn_blocking(move || {
            let result = store.apply_event(&event, &payload, now);
            (event, result)
        })
        .await?;
        self.settle(&event, result).await
    }

    /// Dead-letters an event that failed validation.
    async fn reject(
        &self,
        event: LedgerEvent,
        violations: &[SchemaViolation],
    ) -> Result<ProjectionOutcome, RuntimeError> {
        let reason =
            violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        let store = Arc::clone(&self.store);
        let event_id = event.event_id;
        if tokio::task::spawn_blocking(move || store.is_event_recorded(event_id)).await?? {
            self.context.audit.record(&BridgeAuditEvent::event_duplicate(
                self.context.clock.now(),
                &self.channel,
                event.event_id,
                event.position(),
            ));
            return Ok(ProjectionOutcome::Duplicate);
        }
        match self.settings.poison_pill {
            PoisonPillPolicy::Halt => self.halt(&event, FailureClass::Validation, reason).await,
            PoisonPillPolicy::Skip => {
                let letter = dead_letter(&event, FailureClass::Validation, reason.clone());
                let store = Arc::clone(&self.store);
                let now = self.context.clock.now();
                let (event, result) = tokio::task::spawn_blocking(move || {
                    let result = store.skip_event(&event, letter, now);
                    (event, result)
                })
                .await?;
                if matches!(result, Ok(ApplyOutcome::Skipped(_))) {
                    self.context.audit.record(&BridgeAuditEvent::event_dead_lettered(
                        now,
                        &self.channel,
                        event.event_id,
                        FailureClass::Validation,
                        &reason,
                    ));
                }
                self.settle(&event, result).await
            }
        }
    }

    /// Maps a store outcome to a projection outcome.
    async fn settle(
        &self,
        event: &LedgerEvent,
        result: Result<ApplyOutcome, ProjectionError>,
    ) -> Result<ProjectionOutcome, RuntimeError> {
        let now = self.context.clock.now();
        match result {
            Ok(ApplyOutcome::Applied(_)) => {
                self.context.audit.record(&BridgeAuditEvent::event_applied(
                    now,
                    &self.channel,
                    event.event_id,
                    event.position(),
                ));
                Ok(ProjectionOutcome::Applied)
            }
            Ok(ApplyOutcome::Skipped(_)) => Ok(ProjectionOutcome::Skipped),
            Ok(ApplyOutcome::Duplicate) => {
                self.context.audit.record(&BridgeAuditEvent::event_duplicate(
                    now,
                    &self.channel,
                    event.event_id,
                    event.position(),
                ));
                Ok(ProjectionOutcome::Duplicate)
            }
            Err(ProjectionError::Consistency(violation)) => {
                self.halt(event, FailureClass::ConsistencyViolation, violation.to_string()).await
            }
            Err(ProjectionError::Store(err)) if err.is_transient() => Err(err.into()),
            Err(ProjectionError::Store(err)) => {
                let reason = format!("store rejected event: {err}");
                self.halt(event, FailureClass::ConsistencyViolation, reason).await
            }
        }
    }

    /// Records a dead letter and halts the channel without moving the checkpoint.
    async fn halt(
        &self,
        event: &LedgerEvent,
        failure_class: FailureClass,
        reason: String,
    ) -> Result<ProjectionOutcome, RuntimeError> {
        let letter = dead_letter(event, failure_class, reason.clone());
        let dead_letters = Arc::clone(&self.dead_letters);
        let now = self.context.clock.now();
        tokio::task::spawn_blocking(move || dead_letters.record_dead_letter(letter, now))
            .await??;
        self.context.audit.record(&BridgeAuditEvent::event_dead_lettered(
            now,
            &self.channel,
            event.event_id,
            failure_class,
            &reason,
        ));
        self.context.audit.record(&BridgeAuditEvent::projector_halted(
            now,
            &self.channel,
            Some(event.event_id),
            &reason,
        ));
        self.handle.halt(&self.channel, reason, Some(event.event_id));
        Ok(ProjectionOutcome::Halted)
    }

    /// Halts the channel after a failure not tied to a single event.
    fn halt_channel(&self, reason: String) {
        self.context.audit.record(&BridgeAuditEvent::projector_halted(
            self.context.clock.now(),
            &self.channel,
            None,
            &reason,
        ));
        self.handle.halt(&self.channel, reason, None);
    }
}

/// Builds an event dead letter carrying the full envelope for triage.
fn dead_letter(event: &LedgerEvent, failure_class: FailureClass, reason: String) -> NewDeadLetter {
    NewDeadLetter {
        source_type: DeadLetterSource::Event,
        source_id: event.event_id.to_string(),
        failure_class,
        reason,
        payload_snapshot: serde_json::to_value(event).unwrap_or_else(|_| event.payload.clone()),
    }
}
