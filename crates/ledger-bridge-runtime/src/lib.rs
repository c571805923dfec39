// crates/ledger-bridge-runtime/src/lib.rs
// ============================================================================
// Module: Ledger Bridge Runtime Library
// Description: Worker loops, health reporting, and runtime wiring.
// Purpose: Drive the outbox submitter and per-channel projectors.
// Dependencies: ledger-bridge-core, ledger-bridge-config, ledger-bridge-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The runtime owns the cooperative polling loops that move outbox commands
//! to the ledger and project committed ledger events into read models. All
//! components are built once by [`BridgeRuntime::start`] and shared as `Arc`
//! handles. Blocking store calls run on tokio's blocking pool so no database
//! transaction is ever held across a ledger call.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod clock;
pub mod error;
pub mod feed;
pub mod health;
pub mod projector;
pub mod runtime;
pub mod shutdown;
pub mod submitter;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::BridgeAuditEvent;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use error::RuntimeError;
pub use feed::InMemoryEventFeed;
pub use health::HealthMonitor;
pub use health::ReadinessReport;
pub use projector::ChannelProjector;
pub use projector::ChannelStatus;
pub use projector::PollSummary;
pub use projector::ProjectorHandle;
pub use projector::ProjectorSettings;
pub use runtime::BridgeRuntime;
pub use runtime::RuntimeDeps;
pub use shutdown::ShutdownListener;
pub use shutdown::ShutdownSignal;
pub use submitter::Submitter;
pub use submitter::SubmitterHandle;
pub use submitter::SubmitterPass;
pub use submitter::SubmitterSettings;
pub use submitter::WorkerContext;
pub use telemetry::BridgeMetrics;
pub use telemetry::NoopMetrics;
pub use telemetry::ProjectionOutcome;
pub use telemetry::SubmissionOutcome;
