//! Projector lifecycle tests for ledger-bridge-runtime.
// crates/ledger-bridge-runtime/tests/projector_flow.rs
// ============================================================================
// Module: Projector Flow Tests
// Description: Redelivery, poison pills, halts, deprecation, and resume.
// Purpose: Drive a channel projector against an in-memory feed.
// ============================================================================

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

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use common::ledger_event;
use ledger_bridge_config::PoisonPillPolicy;
use ledger_bridge_core::ApplyOutcome;
use ledger_bridge_core::AssetId;
use ledger_bridge_core::AssetTransferRecord;
use ledger_bridge_core::AssetView;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::DeadLetterSource;
use ledger_bridge_core::DeadLetterStore;
use ledger_bridge_core::EventId;
use ledger_bridge_core::EventPayload;
use ledger_bridge_core::EventPosition;
use ledger_bridge_core::FailureClass;
use ledger_bridge_core::LedgerEvent;
use ledger_bridge_core::NewDeadLetter;
use ledger_bridge_core::ProjectionError;
use ledger_bridge_core::ProjectionStore;
use ledger_bridge_core::ProjectorCheckpoint;
use ledger_bridge_core::SchemaRegistry;
use ledger_bridge_core::StoreError;
use ledger_bridge_core::Timestamp;
use ledger_bridge_runtime::ChannelProjector;
use ledger_bridge_runtime::ChannelStatus;
use ledger_bridge_runtime::InMemoryEventFeed;
use ledger_bridge_runtime::ProjectorHandle;
use ledger_bridge_runtime::ProjectorSettings;
use ledger_bridge_store_sqlite::SqliteLedgerStore;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn channel() -> ChannelName {
    ChannelName::new("assets")
}

fn projector(
    harness: &Harness,
    feed: &Arc<InMemoryEventFeed>,
    policy: PoisonPillPolicy,
    handle: &ProjectorHandle,
) -> ChannelProjector {
    projector_over(Arc::clone(&harness.store) as _, harness, feed, policy, handle)
}

fn projector_over(
    store: Arc<dyn ProjectionStore>,
    harness: &Harness,
    feed: &Arc<InMemoryEventFeed>,
    policy: PoisonPillPolicy,
    handle: &ProjectorHandle,
) -> ChannelProjector {
    ChannelProjector::new(
        channel(),
        store,
        Arc::clone(&harness.store) as _,
        Arc::clone(feed) as _,
        Arc::new(SchemaRegistry::builtin().unwrap()),
        harness.context(),
        ProjectorSettings {
            batch_size: 100,
            poll_interval: Duration::from_millis(10),
            poison_pill: policy,
        },
        handle.clone(),
    )
}

fn registered(position: (u64, u32), asset: &str, owner: &str) -> LedgerEvent {
    ledger_event(
        "assets",
        position,
        "AssetRegistered",
        "2.0",
        json!({"asset_id": asset, "owner": owner, "value": 5}),
    )
}

/// Failure injected by [`FaultyStore`].
#[derive(Debug, Clone, Copy)]
enum Fault {
    /// `checkpoint` reports a corrupt row.
    CorruptCheckpoint,
    /// `apply_event` reports a locked database.
    BusyApply,
    /// `apply_event` rejects the event's data.
    InvalidApply,
}

/// Projection store that delegates to SQLite except for one injected failure.
struct FaultyStore {
    /// Store serving every call that is not faulted.
    inner: Arc<SqliteLedgerStore>,
    /// Injected failure.
    fault: Fault,
}

impl FaultyStore {
    fn new(harness: &Harness, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::clone(&harness.store),
            fault,
        })
    }
}

impl ProjectionStore for FaultyStore {
    fn checkpoint(
        &self,
        channel: &ChannelName,
    ) -> Result<Option<ProjectorCheckpoint>, StoreError> {
        match self.fault {
            Fault::CorruptCheckpoint => {
                Err(StoreError::Corrupt("checkpoint row unreadable".to_string()))
            }
            Fault::BusyApply | Fault::InvalidApply => self.inner.checkpoint(channel),
        }
    }

    fn is_event_recorded(&self, event_id: EventId) -> Result<bool, StoreError> {
        self.inner.is_event_recorded(event_id)
    }

    fn apply_event(
        &self,
        event: &LedgerEvent,
        payload: &EventPayload,
        now: Timestamp,
    ) -> Result<ApplyOutcome, ProjectionError> {
        match self.fault {
            Fault::BusyApply => Err(StoreError::Busy("database is locked".to_string()).into()),
            Fault::InvalidApply => {
                Err(StoreError::Invalid("value out of range".to_string()).into())
            }
            Fault::CorruptCheckpoint => self.inner.apply_event(event, payload, now),
        }
    }

    fn skip_event(
        &self,
        event: &LedgerEvent,
        dead_letter: NewDeadLetter,
        now: Timestamp,
    ) -> Result<ApplyOutcome, ProjectionError> {
        self.inner.skip_event(event, dead_letter, now)
    }

    fn asset(
        &self,
        channel: &ChannelName,
        asset_id: &AssetId,
    ) -> Result<Option<AssetView>, StoreError> {
        self.inner.asset(channel, asset_id)
    }

    fn asset_transfers(
        &self,
        channel: &ChannelName,
        asset_id: &AssetId,
    ) -> Result<Vec<AssetTransferRecord>, StoreError> {
        self.inner.asset_transfers(channel, asset_id)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}

// ============================================================================
// SECTION: Exactly Once
// ============================================================================

#[tokio::test]
async fn redelivered_event_advances_checkpoint_once() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    let event = registered((10, 0), "a-1", "alice");
    feed.publish(event.clone()).unwrap();
    feed.publish(event.clone()).unwrap();
    let handle = ProjectorHandle::new();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Halt, &handle);

    let summary = worker.poll_once().await.unwrap();
    assert_eq!((summary.fetched, summary.applied, summary.duplicates), (2, 1, 1));

    let checkpoint = harness.store.checkpoint(&channel()).unwrap().unwrap();
    assert_eq!(checkpoint.position, EventPosition::new(10, 0));
    assert_eq!(checkpoint.last_event_id, event.event_id);
    let view = harness.store.asset(&channel(), &AssetId::new("a-1")).unwrap().unwrap();
    assert_eq!(view.version, 1);

    assert_eq!(worker.poll_once().await.unwrap().fetched, 0);
    let labels = harness.audit.labels();
    assert_eq!(labels.iter().filter(|label| **label == "event_applied").count(), 1);
    assert!(labels.contains(&"event_duplicate"));
}

#[tokio::test]
async fn restart_resumes_from_persisted_checkpoint() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(registered((1, 0), "a-1", "alice")).unwrap();
    feed.publish(registered((2, 0), "a-2", "bob")).unwrap();
    let first = projector(&harness, &feed, PoisonPillPolicy::Halt, &ProjectorHandle::new());
    assert_eq!(first.poll_once().await.unwrap().applied, 2);
    drop(first);

    feed.publish(registered((3, 0), "a-3", "carol")).unwrap();
    let second = projector(&harness, &feed, PoisonPillPolicy::Halt, &ProjectorHandle::new());
    let summary = second.poll_once().await.unwrap();
    assert_eq!((summary.fetched, summary.applied), (1, 1));
    let checkpoint = harness.store.checkpoint(&channel()).unwrap().unwrap();
    assert_eq!(checkpoint.position, EventPosition::new(3, 0));
}

// ============================================================================
// SECTION: Poison Pills
// ============================================================================

#[tokio::test]
async fn unknown_schema_version_halts_with_checkpoint_unchanged() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    let poison = ledger_event(
        "assets",
        (10, 0),
        "AssetRegistered",
        "9.9",
        json!({"asset_id": "a-1", "owner": "alice", "value": 5}),
    );
    feed.publish(poison.clone()).unwrap();
    feed.publish(registered((11, 0), "a-2", "bob")).unwrap();
    let handle = ProjectorHandle::new();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Halt, &handle);

    let summary = worker.poll_once().await.unwrap();
    assert!(summary.halted);
    assert_eq!(summary.applied, 0);
    assert!(harness.store.checkpoint(&channel()).unwrap().is_none());
    assert!(harness.store.asset(&channel(), &AssetId::new("a-2")).unwrap().is_none());

    let letters = harness.store.list_dead_letters(false, 10).unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].source_type, DeadLetterSource::Event);
    assert_eq!(letters[0].source_id, poison.event_id.to_string());
    assert_eq!(letters[0].failure_class, FailureClass::Validation);
    assert!(letters[0].reason.contains("9.9"));

    match handle.status(&channel()) {
        Some(ChannelStatus::Halted {
            event_id,
            ..
        }) => assert_eq!(event_id, Some(poison.event_id)),
        other => panic!("expected halted channel, got {other:?}"),
    }
    let again = worker.poll_once().await.unwrap();
    assert!(again.halted);
    assert_eq!(again.fetched, 0);
    assert!(harness.audit.labels().contains(&"projector_halted"));
}

#[tokio::test]
async fn skip_policy_dead_letters_and_moves_past_invalid_event() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    let poison = ledger_event(
        "assets",
        (1, 0),
        "AssetRegistered",
        "2.0",
        json!({"asset_id": "a-1", "owner": "alice", "value": -1}),
    );
    feed.publish(poison.clone()).unwrap();
    feed.publish(registered((2, 0), "a-2", "bob")).unwrap();
    let handle = ProjectorHandle::new();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Skip, &handle);

    let summary = worker.poll_once().await.unwrap();
    assert_eq!((summary.skipped, summary.applied, summary.halted), (1, 1, false));
    let checkpoint = harness.store.checkpoint(&channel()).unwrap().unwrap();
    assert_eq!(checkpoint.position, EventPosition::new(2, 0));
    assert!(harness.store.is_event_recorded(poison.event_id).unwrap());
    assert_eq!(harness.store.unresolved_dead_letters().unwrap(), 1);
    assert_eq!(handle.status(&channel()), Some(ChannelStatus::Running));
    assert!(harness.audit.labels().contains(&"event_dead_lettered"));
}

#[tokio::test]
async fn consistency_violation_halts_even_under_skip_policy() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(registered((1, 0), "a-1", "alice")).unwrap();
    feed.publish(ledger_event(
        "assets",
        (2, 0),
        "AssetTransferred",
        "1.0",
        json!({"asset_id": "a-1", "from_owner": "mallory", "to_owner": "bob"}),
    ))
    .unwrap();
    let handle = ProjectorHandle::new();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Skip, &handle);

    let summary = worker.poll_once().await.unwrap();
    assert_eq!((summary.applied, summary.halted), (1, true));
    let checkpoint = harness.store.checkpoint(&channel()).unwrap().unwrap();
    assert_eq!(checkpoint.position, EventPosition::new(1, 0));
    let view = harness.store.asset(&channel(), &AssetId::new("a-1")).unwrap().unwrap();
    assert_eq!(view.owner, "alice");
    let letters = harness.store.list_dead_letters(false, 10).unwrap();
    assert_eq!(letters[0].failure_class, FailureClass::ConsistencyViolation);
    assert!(handle.is_halted(&channel()));
}

#[tokio::test]
async fn deprecated_schema_applies_and_emits_warning() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(ledger_event(
        "assets",
        (1, 0),
        "AssetRegistered",
        "1.0",
        json!({"asset_id": "a-1", "owner": "alice", "value": 5}),
    ))
    .unwrap();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Halt, &ProjectorHandle::new());

    assert_eq!(worker.poll_once().await.unwrap().applied, 1);
    let view = harness.store.asset(&channel(), &AssetId::new("a-1")).unwrap().unwrap();
    assert!(view.metadata.is_none());
    assert!(harness.audit.labels().contains(&"schema_deprecated"));
}

#[tokio::test]
async fn run_loop_stops_after_halt() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(ledger_event("assets", (1, 0), "AssetBurned", "1.0", json!({}))).unwrap();
    let handle = ProjectorHandle::new();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Halt, &handle);

    tokio::time::timeout(Duration::from_secs(5), worker.run()).await.unwrap();
    assert!(handle.is_halted(&channel()));
}

#[tokio::test]
async fn restart_under_halt_keeps_a_single_dead_letter() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    let poison = ledger_event("assets", (1, 0), "AssetBurned", "1.0", json!({}));
    feed.publish(poison.clone()).unwrap();

    let first = projector(&harness, &feed, PoisonPillPolicy::Halt, &ProjectorHandle::new());
    assert!(first.poll_once().await.unwrap().halted);
    drop(first);
    let handle = ProjectorHandle::new();
    let second = projector(&harness, &feed, PoisonPillPolicy::Halt, &handle);
    assert!(second.poll_once().await.unwrap().halted);

    assert!(handle.is_halted(&channel()));
    assert_eq!(harness.store.unresolved_dead_letters().unwrap(), 1);
    let letters = harness.store.list_dead_letters(true, 10).unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].source_id, poison.event_id.to_string());
}

#[tokio::test]
async fn value_beyond_storable_range_is_dead_lettered_as_invalid() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(ledger_event(
        "assets",
        (1, 0),
        "AssetRegistered",
        "2.0",
        json!({"asset_id": "a-1", "owner": "alice", "value": 9_223_372_036_854_775_808_u64}),
    ))
    .unwrap();
    let handle = ProjectorHandle::new();
    let worker = projector(&harness, &feed, PoisonPillPolicy::Halt, &handle);

    assert!(worker.poll_once().await.unwrap().halted);
    assert!(harness.store.checkpoint(&channel()).unwrap().is_none());
    assert!(harness.store.asset(&channel(), &AssetId::new("a-1")).unwrap().is_none());
    let letters = harness.store.list_dead_letters(false, 10).unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].failure_class, FailureClass::Validation);
}

// ============================================================================
// SECTION: Store Failures
// ============================================================================

#[tokio::test]
async fn permanent_store_rejection_halts_with_dead_letter() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    let event = registered((1, 0), "a-1", "alice");
    feed.publish(event.clone()).unwrap();
    let handle = ProjectorHandle::new();
    let store = FaultyStore::new(&harness, Fault::InvalidApply);
    let worker = projector_over(store, &harness, &feed, PoisonPillPolicy::Skip, &handle);

    let summary = worker.poll_once().await.unwrap();
    assert_eq!((summary.applied, summary.halted), (0, true));
    assert!(harness.store.checkpoint(&channel()).unwrap().is_none());

    let letters = harness.store.list_dead_letters(false, 10).unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].source_id, event.event_id.to_string());
    assert_eq!(letters[0].failure_class, FailureClass::ConsistencyViolation);
    assert!(letters[0].reason.contains("value out of range"));
    match handle.status(&channel()) {
        Some(ChannelStatus::Halted {
            event_id,
            ..
        }) => assert_eq!(event_id, Some(event.event_id)),
        other => panic!("expected halted channel, got {other:?}"),
    }
}

#[tokio::test]
async fn store_contention_is_retried_without_halting() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(registered((1, 0), "a-1", "alice")).unwrap();
    let handle = ProjectorHandle::new();
    let store = FaultyStore::new(&harness, Fault::BusyApply);
    let worker = projector_over(store, &harness, &feed, PoisonPillPolicy::Halt, &handle);

    let err = worker.poll_once().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err}");
    assert_eq!(handle.status(&channel()), Some(ChannelStatus::Running));
    assert_eq!(harness.store.unresolved_dead_letters().unwrap(), 0);
}

#[tokio::test]
async fn unreadable_checkpoint_stops_run_loop_and_halts_channel() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new(temp.path());
    let feed = Arc::new(InMemoryEventFeed::new());
    feed.publish(registered((1, 0), "a-1", "alice")).unwrap();
    let handle = ProjectorHandle::new();
    let store = FaultyStore::new(&harness, Fault::CorruptCheckpoint);
    let worker = projector_over(store, &harness, &feed, PoisonPillPolicy::Halt, &handle);

    tokio::time::timeout(Duration::from_secs(5), worker.run()).await.unwrap();
    match handle.status(&channel()) {
        Some(ChannelStatus::Halted {
            reason,
            event_id,
        }) => {
            assert!(reason.contains("checkpoint row unreadable"), "reason: {reason}");
            assert_eq!(event_id, None);
        }
        other => panic!("expected halted channel, got {other:?}"),
    }
    let labels = harness.audit.labels();
    assert!(labels.contains(&"projector_halted"));
    assert!(!labels.contains(&"store_retry"));
}
