// crates/ledger-bridge-runtime/src/runtime.rs
// ============================================================================
// Module: Bridge Runtime
// Description: Builds the store, registry, and workers from configuration.
// Purpose: Own worker tasks and expose intake, readiness, and shutdown.
// Dependencies: ledger-bridge-core, ledger-bridge-config, ledger-bridge-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`BridgeRuntime::start`] opens the store, compiles the schema registry,
//! and spawns one submitter plus one projector per configured channel. Every
//! component receives its dependencies as `Arc` handles; there is no global
//! state. [`BridgeRuntime::shutdown`] stops claiming, lets in-flight units
//! finish, and waits for the workers to exit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ledger_bridge_config::LedgerBridgeConfig;
use ledger_bridge_core::Clock;
use ledger_bridge_core::CommandStore;
use ledger_bridge_core::DeadLetterStore;
use ledger_bridge_core::EnqueueOutcome;
use ledger_bridge_core::EventSource;
use ledger_bridge_core::LedgerAdapter;
use ledger_bridge_core::NewCommand;
use ledger_bridge_core::ProjectionStore;
use ledger_bridge_core::SchemaRegistry;
use ledger_bridge_store_sqlite::SqliteLedgerStore;
use tokio::task::JoinHandle;

use crate::audit::AuditSink;
use crate::audit::BridgeAuditEvent;
use crate::audit::sink_from_config;
use crate::clock::SystemClock;
use crate::error::RuntimeError;
use crate::health::HealthMonitor;
use crate::health::ReadinessReport;
use crate::projector::ChannelProjector;
use crate::projector::ProjectorHandle;
use crate::projector::ProjectorSettings;
use crate::shutdown::ShutdownSignal;
use crate::submitter::Submitter;
use crate::submitter::SubmitterSettings;
use crate::submitter::WorkerContext;
use crate::telemetry::BridgeMetrics;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: Dependencies
// ============================================================================

/// External collaborators supplied by the embedding service.
pub struct RuntimeDeps {
    /// Ledger SDK wrapper.
    pub adapter: Arc<dyn LedgerAdapter>,
    /// Ledger event feed.
    pub source: Arc<dyn EventSource>,
    /// Time source; defaults to the wall clock.
    pub clock: Option<Arc<dyn Clock>>,
    /// Metrics sink; defaults to no-op.
    pub metrics: Option<Arc<dyn BridgeMetrics>>,
    /// Audit sink; defaults to the configured sink.
    pub audit: Option<Arc<dyn AuditSink>>,
}

impl RuntimeDeps {
    /// Creates dependencies with default clock, metrics, and audit sink.
    #[must_use]
    pub fn new(adapter: Arc<dyn LedgerAdapter>, source: Arc<dyn EventSource>) -> Self {
        Self {
            adapter,
            source,
            clock: None,
            metrics: None,
            audit: None,
        }
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Running ledger bridge.
pub struct BridgeRuntime {
    /// Shared store.
    store: Arc<SqliteLedgerStore>,
    /// Stop flag for every worker.
    shutdown: ShutdownSignal,
    /// Worker tasks.
    tasks: Vec<JoinHandle<()>>,
    /// Projector status handle.
    projectors: ProjectorHandle,
    /// Readiness computation.
    health: Arc<HealthMonitor>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl BridgeRuntime {
    /// Opens the store and spawns the workers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the store, schemas, or audit sink fail to
    /// initialize.
    pub async fn start(
        config: &LedgerBridgeConfig,
        deps: RuntimeDeps,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let store_config = config.store.clone();
        let store = Arc::new(
            tokio::task::spawn_blocking(move || SqliteLedgerStore::new(store_config))
                .await?
                .map_err(ledger_bridge_core::StoreError::from)?,
        );
        let registry = Arc::new(SchemaRegistry::builtin()?);
        let audit = match deps.audit {
            Some(audit) => audit,
            None => sink_from_config(&config.audit)?,
        };
        let clock = deps.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let metrics = deps.metrics.unwrap_or_else(|| Arc::new(NoopMetrics));
        let shutdown = ShutdownSignal::new();
        let context = WorkerContext {
            clock: Arc::clone(&clock),
            audit: Arc::clone(&audit),
            metrics,
            shutdown: shutdown.subscribe(),
        };

        let mut tasks = Vec::with_capacity(config.projector.channels.len() + 1);
        let submitter = Submitter::new(
            Arc::clone(&store) as Arc<dyn CommandStore>,
            deps.adapter,
            context.clone(),
            SubmitterSettings::from_config(&config.submitter),
        );
        let submitter_handle = submitter.handle();
        tasks.push(tokio::spawn(submitter.run()));

        let projectors = ProjectorHandle::new();
        let channels = config.projector.channel_names();
        let settings = ProjectorSettings::from_config(&config.projector);
        for channel in &channels {
            let projector = ChannelProjector::new(
                channel.clone(),
                Arc::clone(&store) as Arc<dyn ProjectionStore>,
                Arc::clone(&store) as Arc<dyn DeadLetterStore>,
                Arc::clone(&deps.source),
                Arc::clone(&registry),
                context.clone(),
                settings,
                projectors.clone(),
            );
            tasks.push(tokio::spawn(projector.run()));
        }

        let health = Arc::new(HealthMonitor::new(
            Arc::clone(&store) as Arc<dyn ProjectionStore>,
            Arc::clone(&store) as Arc<dyn DeadLetterStore>,
            channels,
            projectors.clone(),
            Arc::clone(&clock),
            &config.health,
        )
        .with_submitter(submitter_handle));

        Ok(Self {
            store,
            shutdown,
            tasks,
            projectors,
            health,
            audit,
            clock,
        })
    }

    /// Returns the shared store.
    #[must_use]
    pub const fn store(&self) -> &Arc<SqliteLedgerStore> {
        &self.store
    }

    /// Returns the projector status handle.
    #[must_use]
    pub const fn projectors(&self) -> &ProjectorHandle {
        &self.projectors
    }

    /// Durably enqueues a command; returns as soon as the row is committed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Store`] for invalid payloads or store failures.
    pub async fn enqueue(&self, request: NewCommand) -> Result<EnqueueOutcome, RuntimeError> {
        let store = Arc::clone(&self.store);
        let now = self.clock.now();
        let outcome = tokio::task::spawn_blocking(move || store.enqueue(request, now)).await??;
        self.audit.record(&BridgeAuditEvent::command_enqueued(
            now,
            outcome.command.id,
            outcome.created,
        ));
        Ok(outcome)
    }

    /// Computes the readiness report.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Join`] when the blocking readiness task fails.
    pub async fn readiness(&self) -> Result<ReadinessReport, RuntimeError> {
        let health = Arc::clone(&self.health);
        Ok(tokio::task::spawn_blocking(move || health.readiness()).await?)
    }

    /// Signals shutdown and waits for every worker to exit.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Join`] when a worker task panicked.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        self.shutdown.trigger();
        let mut first_error = None;
        for task in self.tasks {
            if let Err(err) = task.await {
                first_error.get_or_insert(RuntimeError::from(err));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
