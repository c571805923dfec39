// crates/ledger-bridge-runtime/src/submitter.rs
// ============================================================================
// Module: Outbox Submitter
// Description: Lease-based worker that delivers outbox commands to the ledger.
// Purpose: Drive PENDING -> SUBMITTING -> {SUCCESS | PENDING | FAILED}.
// Dependencies: ledger-bridge-core, ledger-bridge-config, tokio, uuid
// ============================================================================

//! ## Overview
//! Each pass claims a batch of commands under a lease, submits them one at a
//! time with a bounded timeout, and records the outcome. Claiming and marking
//! are separate short transactions run on the blocking pool; no database
//! transaction is open while the ledger call is in flight.
//!
//! A lost lease means another worker may already own the command, so the
//! result is dropped and logged. The ledger deduplicates on the idempotency
//! key, which keeps a duplicate submission harmless.
//!
//! Store contention is retried on the next poll. Any other store failure stops
//! the worker and is reported through [`SubmitterHandle`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use ledger_bridge_config::SubmitterConfig;
use ledger_bridge_core::BackoffPolicy;
use ledger_bridge_core::ClaimRequest;
use ledger_bridge_core::ClaimedCommand;
use ledger_bridge_core::Clock;
use ledger_bridge_core::CommandOutcome;
use ledger_bridge_core::CommandStatus;
use ledger_bridge_core::CommandStore;
use ledger_bridge_core::LedgerAdapter;
use ledger_bridge_core::LedgerError;
use ledger_bridge_core::LedgerReceipt;
use ledger_bridge_core::LedgerSubmission;
use ledger_bridge_core::StoreError;
use ledger_bridge_core::WorkerId;

use crate::audit::AuditSink;
use crate::audit::BridgeAuditEvent;
use crate::error::RuntimeError;
use crate::shutdown::ShutdownListener;
use crate::telemetry::BridgeMetrics;
use crate::telemetry::SubmissionOutcome;

// ============================================================================
// SECTION: Shared Worker Context
// ============================================================================

/// Ambient services shared by every worker.
#[derive(Clone)]
pub struct WorkerContext {
    /// Time source for leases, backoff, and checkpoints.
    pub clock: Arc<dyn Clock>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
    /// Metrics sink.
    pub metrics: Arc<dyn BridgeMetrics>,
    /// Cooperative stop flag.
    pub shutdown: ShutdownListener,
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Resolved submitter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterSettings {
    /// Lease owner identity.
    pub worker_id: WorkerId,
    /// Delay between polls when nothing was claimable.
    pub poll_interval: Duration,
    /// Maximum commands claimed per pass.
    pub batch_size: usize,
    /// Lease length per claim.
    pub lease_duration: Duration,
    /// Bound on one ledger call.
    pub submit_timeout: Duration,
    /// Failed attempts after which a command is dead-lettered.
    pub max_attempts: u32,
    /// Retry backoff.
    pub backoff: BackoffPolicy,
    /// Look the command up by idempotency key before resubmitting.
    pub reconcile_before_retry: bool,
}

impl SubmitterSettings {
    /// Resolves settings from configuration, generating a worker id if unset.
    #[must_use]
    pub fn from_config(config: &SubmitterConfig) -> Self {
        let worker_id = config.worker_id.as_ref().map_or_else(
            || WorkerId::new(format!("submitter-{}", uuid::Uuid::new_v4())),
            |id| WorkerId::new(id.as_str()),
        );
        Self {
            worker_id,
            poll_interval: config.poll_interval(),
            batch_size: config.batch_size,
            lease_duration: config.lease_duration(),
            submit_timeout: config.submit_timeout(),
            max_attempts: config.max_attempts,
            backoff: config.backoff(),
            reconcile_before_retry: config.reconcile_before_retry,
        }
    }
}

// ============================================================================
// SECTION: Pass Summary
// ============================================================================

/// Counts from one submitter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitterPass {
    /// Commands claimed.
    pub claimed: usize,
    /// Commands confirmed by the ledger.
    pub succeeded: usize,
    /// Commands rescheduled after a transient failure.
    pub retried: usize,
    /// Commands moved to FAILED.
    pub failed: usize,
    /// Results dropped because the lease was lost.
    pub lease_lost: usize,
    /// Claimed commands left untouched because shutdown was requested.
    pub abandoned: usize,
}

// ============================================================================
// SECTION: Submitter Handle
// ============================================================================

/// Shared view of whether the submitter stopped on a permanent failure.
#[derive(Debug, Clone, Default)]
pub struct SubmitterHandle {
    /// Failure that stopped the worker.
    stopped: Arc<Mutex<Option<String>>>,
}

impl SubmitterHandle {
    /// Creates a handle for a running submitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the failure that stopped the submitter, if any.
    #[must_use]
    pub fn stopped_reason(&self) -> Option<String> {
        self.stopped.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Records the failure that stopped the submitter.
    fn stop(&self, reason: String) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason);
    }
}

// ============================================================================
// SECTION: Submitter
// ============================================================================

/// Outbox submitter worker.
pub struct Submitter {
    /// Outbox store.
    store: Arc<dyn CommandStore>,
    /// Ledger SDK wrapper.
    adapter: Arc<dyn LedgerAdapter>,
    /// Ambient services.
    context: WorkerContext,
    /// Resolved settings.
    settings: SubmitterSettings,
    /// Stop state shared with readiness.
    handle: SubmitterHandle,
}

impl Submitter {
    /// Creates a submitter.
    #[must_use]
    pub fn new(
        store: Arc<dyn CommandStore>,
        adapter: Arc<dyn LedgerAdapter>,
        context: WorkerContext,
        settings: SubmitterSettings,
    ) -> Self {
        Self {
            store,
            adapter,
            context,
            settings,
            handle: SubmitterHandle::new(),
        }
    }

    /// Returns the resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &SubmitterSettings {
        &self.settings
    }

    /// Returns the stop-state handle.
    #[must_use]
    pub fn handle(&self) -> SubmitterHandle {
        self.handle.clone()
    }

    /// Polls until shutdown is requested or a permanent store failure occurs.
    ///
    /// Transient failures are retried on the next poll.
    pub async fn run(self) {
        let shutdown = self.context.shutdown.clone();
        while !shutdown.is_triggered() {
            let idle = match self.run_once().await {
                Ok(pass) => pass.claimed == 0,
                Err(err) if err.is_transient() => {
                    self.context.audit.record(&BridgeAuditEvent::store_retry(
                        self.context.clock.now(),
                        "submitter",
                        &err.to_string(),
                    ));
                    true
                }
                Err(err) => {
                    let reason = err.to_string();
                    self.context.audit.record(&BridgeAuditEvent::worker_stopped(
                        self.context.clock.now(),
                        "submitter",
                        &reason,
                    ));
                    self.handle.stop(reason);
                    break;
                }
            };
            if idle && shutdown.sleep(self.settings.poll_interval).await {
                break;
            }
        }
    }

    /// Claims one batch and processes it. Claims nothing once shutdown was requested.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when claiming or recording a result fails.
    pub async fn run_once(&self) -> Result<SubmitterPass, RuntimeError> {
        if self.context.shutdown.is_triggered() {
            return Ok(SubmitterPass::default());
        }
        let request = ClaimRequest {
            owner: self.settings.worker_id.clone(),
            limit: self.settings.batch_size,
            lease_duration: self.settings.lease_duration,
        };
        let store = Arc::clone(&self.store);
        let now = self.context.clock.now();
        let claimed =
            tokio::task::spawn_blocking(move || store.claim_pending(&request, now)).await??;

        let mut pass = SubmitterPass {
            claimed: claimed.len(),
            ..SubmitterPass::default()
        };
        for (index, command) in claimed.into_iter().enumerate() {
            if self.context.shutdown.is_triggered() {
                pass.abandoned = pass.claimed - index;
                break;
            }
            match self.process(command).await? {
                SubmissionOutcome::Succeeded | SubmissionOutcome::Reconciled => pass.succeeded += 1,
                SubmissionOutcome::Retried => pass.retried += 1,
                SubmissionOutcome::Failed => pass.failed += 1,
                SubmissionOutcome::LeaseLost => pass.lease_lost += 1,
            }
        }
        Ok(pass)
    }

    /// Submits one claimed command and records the outcome.
    async fn process(&self, claimed: ClaimedCommand) -> Result<SubmissionOutcome, RuntimeError> {
        let ClaimedCommand {
            command,
            lease,
        } = claimed;
        let submission = LedgerSubmission {
            command_id: command.id,
            idempotency_key: command.idempotency_key(),
            command: command.command,
        };

        let mut reconciled = false;
        let result = match self.reconcile(&submission, command.attempts).await {
            Some(receipt) => {
                reconciled = true;
                Ok(receipt)
            }
            None => self.submit(&submission).await,
        };

        let outcome = match result {
            Ok(receipt) => CommandOutcome::Succeeded {
                ledger_tx_id: receipt.ledger_tx_id,
            },
            Err(LedgerError::Transient(error)) => CommandOutcome::Retry {
                error,
                next_attempt_at: self
                    .settings
                    .backoff
                    .next_attempt_at(self.context.clock.now(), command.attempts.saturating_add(1)),
                max_attempts: self.settings.max_attempts,
            },
            Err(LedgerError::Permanent(error)) => CommandOutcome::Failed {
                error,
            },
        };

        let store = Arc::clone(&self.store);
        let now = self.context.clock.now();
        let marked =
            tokio::task::spawn_blocking(move || store.mark_result(&lease, outcome, now)).await?;
        let label = match marked {
            Ok(updated) => {
                let label = match updated.status {
                    CommandStatus::Success if reconciled => SubmissionOutcome::Reconciled,
                    CommandStatus::Success => SubmissionOutcome::Succeeded,
                    CommandStatus::Failed => SubmissionOutcome::Failed,
                    CommandStatus::Pending | CommandStatus::Submitting => {
                        SubmissionOutcome::Retried
                    }
                };
                self.context.audit.record(&BridgeAuditEvent::command_transition(
                    now,
                    updated.id,
                    updated.status,
                    updated.attempts,
                    updated.last_error.clone(),
                ));
                label
            }
            Err(StoreError::LeaseLost {
                command_id,
            }) => {
                self.context.audit.record(&BridgeAuditEvent::lease_lost(now, command_id));
                SubmissionOutcome::LeaseLost
            }
            Err(err) => return Err(err.into()),
        };
        self.context.metrics.record_submission(label);
        Ok(label)
    }

    /// Calls the adapter with the configured timeout.
    async fn submit(&self, submission: &LedgerSubmission) -> Result<LedgerReceipt, LedgerError> {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.settings.submit_timeout, self.adapter.submit(submission))
                .await;
        self.context.metrics.record_submit_latency(started.elapsed());
        result.unwrap_or_else(|_| {
            Err(LedgerError::Transient(format!(
                "ledger submission timed out after {} ms",
                self.settings.submit_timeout.as_millis()
            )))
        })
    }

    /// Looks up an earlier commit for a retried command.
    ///
    /// Lookup failures fall through to a normal resubmission.
    async fn reconcile(
        &self,
        submission: &LedgerSubmission,
        attempts: u32,
    ) -> Option<LedgerReceipt> {
        if !self.settings.reconcile_before_retry || attempts == 0 {
            return None;
        }
        let lookup = self.adapter.lookup(&submission.idempotency_key);
        match tokio::time::timeout(self.settings.submit_timeout, lookup).await {
            Ok(Ok(found)) => found,
            Ok(Err(_)) | Err(_) => None,
        }
    }
}
