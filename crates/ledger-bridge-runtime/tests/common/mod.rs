//! Shared fixtures for ledger-bridge-runtime integration tests.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Helpers are shared across test binaries."
)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use ledger_bridge_core::AssetId;
use ledger_bridge_core::BackoffPolicy;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::ClaimRequest;
use ledger_bridge_core::ClaimedCommand;
use ledger_bridge_core::CommandId;
use ledger_bridge_core::CommandLease;
use ledger_bridge_core::CommandOutcome;
use ledger_bridge_core::CommandStore;
use ledger_bridge_core::EnqueueOutcome;
use ledger_bridge_core::EventId;
use ledger_bridge_core::IdempotencyKey;
use ledger_bridge_core::LedgerAdapter;
use ledger_bridge_core::LedgerCommand;
use ledger_bridge_core::LedgerError;
use ledger_bridge_core::LedgerEvent;
use ledger_bridge_core::LedgerReceipt;
use ledger_bridge_core::LedgerSubmission;
use ledger_bridge_core::LedgerTxId;
use ledger_bridge_core::NewCommand;
use ledger_bridge_core::OutboxCommand;
use ledger_bridge_core::RegisterAsset;
use ledger_bridge_core::RequestId;
use ledger_bridge_core::ServiceName;
use ledger_bridge_core::StoreError;
use ledger_bridge_core::TenantId;
use ledger_bridge_core::Timestamp;
use ledger_bridge_core::WorkerId;
use ledger_bridge_runtime::AuditSink;
use ledger_bridge_runtime::BridgeAuditEvent;
use ledger_bridge_runtime::ManualClock;
use ledger_bridge_runtime::NoopMetrics;
use ledger_bridge_runtime::ShutdownSignal;
use ledger_bridge_runtime::Submitter;
use ledger_bridge_runtime::SubmitterSettings;
use ledger_bridge_runtime::WorkerContext;
use ledger_bridge_store_sqlite::SqliteLedgerStore;
use ledger_bridge_store_sqlite::SqliteStoreConfig;
use serde_json::Value;

// ============================================================================
// SECTION: Scripted Ledger
// ============================================================================

/// One scripted adapter response.
#[derive(Debug, Clone)]
pub enum Step {
    /// Never answers; the submitter's timeout fires.
    Hang,
    /// Retry-safe failure.
    Transient(&'static str),
    /// Business-rule rejection.
    Permanent(&'static str),
    /// Commit with the given transaction id.
    Commit(&'static str),
}

/// Hook run inside a submission before the adapter answers.
pub type SubmitHook = Box<dyn FnOnce() + Send>;

/// Ledger adapter that replays a script and records every call.
#[derive(Default)]
pub struct ScriptedAdapter {
    /// Remaining responses; an empty script commits with `0xdefault`.
    steps: Mutex<VecDeque<Step>>,
    /// Idempotency keys seen by `submit`, in call order.
    keys: Mutex<Vec<IdempotencyKey>>,
    /// Receipt returned by `lookup`.
    lookup_receipt: Mutex<Option<LedgerReceipt>>,
    /// Number of `lookup` calls.
    lookups: AtomicUsize,
    /// Hook run once on the next submission.
    hook: Mutex<Option<SubmitHook>>,
}

impl ScriptedAdapter {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_lookup(self, tx_id: &str) -> Self {
        *self.lookup_receipt.lock().unwrap() = Some(LedgerReceipt {
            ledger_tx_id: LedgerTxId::new(tx_id),
        });
        self
    }

    pub fn on_next_submit(&self, hook: SubmitHook) {
        *self.hook.lock().unwrap() = Some(hook);
    }

    pub fn submissions(&self) -> Vec<IdempotencyKey> {
        self.keys.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerAdapter for ScriptedAdapter {
    async fn submit(&self, submission: &LedgerSubmission) -> Result<LedgerReceipt, LedgerError> {
        self.keys.lock().unwrap().push(submission.idempotency_key.clone());
        let hook = self.hook.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Commit("0xdefault"));
        match step {
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Err(LedgerError::Transient("hung call returned".to_string()))
            }
            Step::Transient(reason) => Err(LedgerError::Transient(reason.to_string())),
            Step::Permanent(reason) => Err(LedgerError::Permanent(reason.to_string())),
            Step::Commit(tx_id) => Ok(LedgerReceipt {
                ledger_tx_id: LedgerTxId::new(tx_id),
            }),
        }
    }

    async fn lookup(&self, _key: &IdempotencyKey) -> Result<Option<LedgerReceipt>, LedgerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup_receipt.lock().unwrap().clone())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<BridgeAuditEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<BridgeAuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &BridgeAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Store, clock, audit, and shutdown shared by a test.
pub struct Harness {
    pub store: Arc<SqliteLedgerStore>,
    pub clock: Arc<ManualClock>,
    pub audit: Arc<RecordingAuditSink>,
    pub shutdown: Arc<ShutdownSignal>,
}

impl Harness {
    pub fn new(dir: &Path) -> Self {
        let store = SqliteLedgerStore::new(SqliteStoreConfig::new(dir.join("bridge.db")))
            .expect("store init");
        Self {
            store: Arc::new(store),
            clock: Arc::new(ManualClock::new(Timestamp::from_unix_millis(1_000))),
            audit: Arc::new(RecordingAuditSink::default()),
            shutdown: Arc::new(ShutdownSignal::new()),
        }
    }

    pub fn context(&self) -> WorkerContext {
        WorkerContext {
            clock: Arc::clone(&self.clock) as _,
            audit: Arc::clone(&self.audit) as _,
            metrics: Arc::new(NoopMetrics),
            shutdown: self.shutdown.subscribe(),
        }
    }
}

// ============================================================================
// SECTION: Failing Store
// ============================================================================

/// Command store whose claims always fail with a fixed error.
pub struct FailingClaims {
    /// Store serving every call except claims.
    inner: Arc<SqliteLedgerStore>,
    /// Fail with contention instead of corruption.
    busy: bool,
}

impl CommandStore for FailingClaims {
    fn enqueue(&self, request: NewCommand, now: Timestamp) -> Result<EnqueueOutcome, StoreError> {
        self.inner.enqueue(request, now)
    }

    fn claim_pending(
        &self,
        _request: &ClaimRequest,
        _now: Timestamp,
    ) -> Result<Vec<ClaimedCommand>, StoreError> {
        if self.busy {
            Err(StoreError::Busy("database is locked".to_string()))
        } else {
            Err(StoreError::Corrupt("outbox row unreadable".to_string()))
        }
    }

    fn mark_result(
        &self,
        lease: &CommandLease,
        outcome: CommandOutcome,
        now: Timestamp,
    ) -> Result<OutboxCommand, StoreError> {
        self.inner.mark_result(lease, outcome, now)
    }

    fn get_command(&self, id: CommandId) -> Result<Option<OutboxCommand>, StoreError> {
        self.inner.get_command(id)
    }

    fn find_by_request(
        &self,
        tenant_id: &TenantId,
        service: &ServiceName,
        request_id: &RequestId,
    ) -> Result<Option<OutboxCommand>, StoreError> {
        self.inner.find_by_request(tenant_id, service, request_id)
    }
}

/// Submitter over [`FailingClaims`]; `busy` selects contention over corruption.
pub fn failing_submitter(harness: &Harness, busy: bool) -> Submitter {
    let store = FailingClaims {
        inner: Arc::clone(&harness.store),
        busy,
    };
    Submitter::new(
        Arc::new(store),
        Arc::new(ScriptedAdapter::new([])),
        harness.context(),
        SubmitterSettings {
            worker_id: WorkerId::new("worker-1"),
            poll_interval: Duration::from_millis(10),
            batch_size: 8,
            lease_duration: Duration::from_secs(30),
            submit_timeout: Duration::from_millis(20),
            max_attempts: 5,
            backoff: BackoffPolicy::new(Duration::from_millis(500), Duration::from_secs(60)),
            reconcile_before_retry: false,
        },
    )
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

pub fn register_command(request_id: &str, asset: &str) -> NewCommand {
    NewCommand {
        tenant_id: TenantId::new("tenant-a"),
        service: ServiceName::new("payments"),
        request_id: RequestId::new(request_id),
        command: LedgerCommand::RegisterAsset(RegisterAsset {
            asset_id: AssetId::new(asset),
            owner: "alice".to_string(),
            value: 10,
        }),
    }
}

pub fn ledger_event(
    channel: &str,
    position: (u64, u32),
    name: &str,
    version: &str,
    payload: Value,
) -> LedgerEvent {
    LedgerEvent {
        event_id: EventId::generate(),
        event_name: name.to_string(),
        event_version: version.to_string(),
        block_number: position.0,
        tx_id: LedgerTxId::new(format!("tx-{}-{}", position.0, position.1)),
        tx_index: position.1,
        chaincode_name: "assets".to_string(),
        channel_name: ChannelName::new(channel),
        timestamp: Timestamp::from_unix_millis(900),
        payload,
    }
}
