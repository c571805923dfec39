// crates/ledger-bridge-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Ledger Bridge Store
// Description: Durable outbox, dead letters, and projection state backed by SQLite WAL.
// Purpose: Persist commands and read models with lease fencing and atomic checkpoints.
// Dependencies: ledger-bridge-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`CommandStore`], [`DeadLetterStore`], and
//! [`ProjectionStore`] on one `SQLite` database. Every mutation runs in a
//! `BEGIN IMMEDIATE` transaction so the write lock is taken before any read,
//! which makes the claim query safe across processes. Projection writes update
//! the read model, the apply log, and the checkpoint in the same transaction.
//! Undecodable rows fail closed as [`SqliteStoreError::Corrupt`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use ledger_bridge_core::ApplyDisposition;
use ledger_bridge_core::ApplyOutcome;
use ledger_bridge_core::AssetId;
use ledger_bridge_core::AssetStatus;
use ledger_bridge_core::AssetTransferRecord;
use ledger_bridge_core::AssetView;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::ClaimRequest;
use ledger_bridge_core::ClaimedCommand;
use ledger_bridge_core::CommandId;
use ledger_bridge_core::CommandLease;
use ledger_bridge_core::CommandOutcome;
use ledger_bridge_core::CommandStatus;
use ledger_bridge_core::CommandStore;
use ledger_bridge_core::CommandType;
use ledger_bridge_core::ConsistencyViolation;
use ledger_bridge_core::DeadLetterEntry;
use ledger_bridge_core::DeadLetterId;
use ledger_bridge_core::DeadLetterSource;
use ledger_bridge_core::DeadLetterStore;
use ledger_bridge_core::EnqueueOutcome;
use ledger_bridge_core::EventContext;
use ledger_bridge_core::EventId;
use ledger_bridge_core::EventPayload;
use ledger_bridge_core::EventPosition;
use ledger_bridge_core::FailureClass;
use ledger_bridge_core::LedgerCommand;
use ledger_bridge_core::LedgerEvent;
use ledger_bridge_core::LedgerTxId;
use ledger_bridge_core::NewCommand;
use ledger_bridge_core::NewDeadLetter;
use ledger_bridge_core::OutboxCommand;
use ledger_bridge_core::ProjectionError;
use ledger_bridge_core::ProjectionStore;
use ledger_bridge_core::ProjectorCheckpoint;
use ledger_bridge_core::RequestId;
use ledger_bridge_core::ServiceName;
use ledger_bridge_core::StoreError;
use ledger_bridge_core::TenantId;
use ledger_bridge_core::Timestamp;
use ledger_bridge_core::WorkerId;
use ledger_bridge_core::apply_event;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Column list shared by every outbox query.
const COMMAND_COLUMNS: &str = "command_id, tenant_id, service, request_id, command_type, \
                               payload_json, status, attempts, last_error, ledger_tx_id, \
                               next_attempt_at, lease_owner, lease_expires_at, created_at, \
                               updated_at";

/// Column list shared by every dead-letter query.
const DEAD_LETTER_COLUMNS: &str = "dead_letter_id, source_type, source_id, failure_class, \
                                   reason, payload_json, created_at, resolved_at";

/// Column list shared by every asset view query.
const ASSET_COLUMNS: &str = "channel_name, asset_id, owner, value, metadata_json, status, \
                             version, last_block_number, last_tx_index, updated_at";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` ledger bridge store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds and bounds how long a
///   writer waits for another process's `BEGIN IMMEDIATE`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw command or event payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Database locked by another writer past the busy timeout.
    #[error("sqlite store busy: {0}")]
    Busy(String),
    /// Stored row failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or request.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Referenced row does not exist.
    #[error("sqlite store row not found: {0}")]
    NotFound(String),
    /// Command is no longer leased to the caller.
    #[error("sqlite store lease lost for command {0}")]
    LeaseLost(CommandId),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Busy(message) => Self::Busy(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::LeaseLost(command_id) => Self::LeaseLost {
                command_id,
            },
        }
    }
}

impl From<SqliteStoreError> for ProjectionError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Store(error.into())
    }
}

/// Maps a `rusqlite` error, classifying lock contention as busy.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            SqliteStoreError::Busy(err.to_string())
        }
        _ => SqliteStoreError::Db(err.to_string()),
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed ledger bridge store with WAL support.
///
/// # Invariants
/// - Connection access within a process is serialized through a mutex.
/// - Every mutation holds the database write lock for its whole transaction.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Opens an `SQLite`-backed ledger bridge store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Runs `op` inside a `BEGIN IMMEDIATE` transaction; any error rolls back.
    fn with_write_tx<T, E>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<SqliteStoreError>,
    {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        let value = op(&tx)?;
        tx.commit().map_err(db_error)?;
        Ok(value)
    }

    /// Runs a read-only operation on the shared connection.
    fn with_read<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))?;
        op(&guard)
    }

    /// Counts outbox rows in a given status.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn count_commands(&self, status: CommandStatus) -> Result<u64, SqliteStoreError> {
        self.with_read(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(1) FROM outbox_commands WHERE status = ?1",
                    params![status.as_str()],
                    |row| row.get(0),
                )
                .map_err(db_error)?;
            to_u64(count, "command count")
        })
    }
}

// ============================================================================
// SECTION: Command Store
// ============================================================================

impl CommandStore for SqliteLedgerStore {
    fn enqueue(&self, request: NewCommand, now: Timestamp) -> Result<EnqueueOutcome, StoreError> {
        request.validate()?;
        let payload = request.command.payload_json()?;
        let payload_json = serde_json::to_string(&payload)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let command_id = CommandId::generate();
        self.with_write_tx(|conn| {
            let inserted = conn
                .execute(
                    "INSERT INTO outbox_commands (command_id, tenant_id, service, request_id, \
                     command_type, payload_json, status, attempts, next_attempt_at, created_at, \
                     updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8, ?8)
                     ON CONFLICT (tenant_id, service, request_id) DO NOTHING",
                    params![
                        command_id.to_string(),
                        request.tenant_id.as_str(),
                        request.service.as_str(),
                        request.request_id.as_str(),
                        request.command.command_type().as_str(),
                        payload_json,
                        CommandStatus::Pending.as_str(),
                        now.as_unix_millis(),
                    ],
                )
                .map_err(db_error)?;
            let command = query_command_by_request(
                conn,
                &request.tenant_id,
                &request.service,
                &request.request_id,
            )?
            .ok_or_else(|| SqliteStoreError::Corrupt("enqueued command missing".to_string()))?;
            Ok(EnqueueOutcome {
                command,
                created: inserted == 1,
            })
        })
    }

    fn claim_pending(
        &self,
        request: &ClaimRequest,
        now: Timestamp,
    ) -> Result<Vec<ClaimedCommand>, StoreError> {
        if request.limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(request.limit)
            .map_err(|_| SqliteStoreError::Invalid("claim limit too large".to_string()))?;
        let expires_at = now.saturating_add(request.lease_duration);
        self.with_write_tx(|conn| {
            let ids = {
                let mut stmt = conn
                    .prepare_cached(
                        "SELECT command_id FROM outbox_commands
                         WHERE (status = 'PENDING' AND next_attempt_at <= ?1)
                            OR (status = 'SUBMITTING' AND lease_expires_at <= ?1)
                         ORDER BY created_at ASC, rowid ASC
                         LIMIT ?2",
                    )
                    .map_err(db_error)?;
                let rows = stmt
                    .query_map(params![now.as_unix_millis(), limit], |row| row.get::<_, String>(0))
                    .map_err(db_error)?;
                rows.collect::<Result<Vec<String>, _>>().map_err(db_error)?
            };
            let mut claimed = Vec::with_capacity(ids.len());
            for id in ids {
                conn.execute(
                    "UPDATE outbox_commands
                     SET status = 'SUBMITTING', lease_owner = ?1, lease_expires_at = ?2, \
                     updated_at = ?3
                     WHERE command_id = ?4",
                    params![
                        request.owner.as_str(),
                        expires_at.as_unix_millis(),
                        now.as_unix_millis(),
                        id,
                    ],
                )
                .map_err(db_error)?;
                let command_id = parse_command_id(&id)?;
                let command = query_command(conn, command_id)?.ok_or_else(|| {
                    SqliteStoreError::Corrupt(format!("claimed command {id} missing"))
                })?;
                claimed.push(ClaimedCommand {
                    command,
                    lease: CommandLease {
                        command_id,
                        owner: request.owner.clone(),
                        expires_at,
                    },
                });
            }
            Ok(claimed)
        })
    }

    fn mark_result(
        &self,
        lease: &CommandLease,
        outcome: CommandOutcome,
        now: Timestamp,
    ) -> Result<OutboxCommand, StoreError> {
        self.with_write_tx(|conn| {
            let current = query_command(conn, lease.command_id)?
                .ok_or_else(|| SqliteStoreError::NotFound(lease.command_id.to_string()))?;
            let holds_lease = current.status == CommandStatus::Submitting
                && current.lease_owner.as_ref() == Some(&lease.owner)
                && current.lease_expires_at == Some(lease.expires_at);
            if !holds_lease {
                return Err(SqliteStoreError::LeaseLost(lease.command_id));
            }
            let failed_attempts = current.attempts.saturating_add(1);
            match outcome {
                CommandOutcome::Succeeded {
                    ledger_tx_id,
                } => {
                    finish_command(
                        conn,
                        &current,
                        CommandStatus::Success,
                        current.attempts,
                        None,
                        Some(&ledger_tx_id),
                        now,
                    )?;
                }
                CommandOutcome::Retry {
                    error,
                    next_attempt_at,
                    max_attempts,
                } => {
                    if failed_attempts >= max_attempts {
                        finish_command(
                            conn,
                            &current,
                            CommandStatus::Failed,
                            failed_attempts,
                            Some(&error),
                            None,
                            now,
                        )?;
                        insert_dead_letter(
                            conn,
                            &command_dead_letter(
                                &current,
                                failed_attempts,
                                FailureClass::TransientInfrastructure,
                                error,
                            ),
                            now,
                        )?;
                    } else {
                        conn.execute(
                            "UPDATE outbox_commands
                             SET status = 'PENDING', attempts = ?1, last_error = ?2, \
                             next_attempt_at = ?3, lease_owner = NULL, lease_expires_at = NULL, \
                             updated_at = ?4
                             WHERE command_id = ?5",
                            params![
                                i64::from(failed_attempts),
                                error,
                                next_attempt_at.as_unix_millis(),
                                now.as_unix_millis(),
                                current.id.to_string(),
                            ],
                        )
                        .map_err(db_error)?;
                    }
                }
                CommandOutcome::Failed {
                    error,
                } => {
                    finish_command(
                        conn,
                        &current,
                        CommandStatus::Failed,
                        failed_attempts,
                        Some(&error),
                        None,
                        now,
                    )?;
                    insert_dead_letter(
                        conn,
                        &command_dead_letter(
                            &current,
                            failed_attempts,
                            FailureClass::PermanentLedgerRejection,
                            error,
                        ),
                        now,
                    )?;
                }
            }
            query_command(conn, current.id)?
                .ok_or_else(|| SqliteStoreError::Corrupt("marked command missing".to_string()))
        })
        .map_err(StoreError::from)
    }

    fn get_command(&self, id: CommandId) -> Result<Option<OutboxCommand>, StoreError> {
        Ok(self.with_read(|conn| query_command(conn, id))?)
    }

    fn find_by_request(
        &self,
        tenant_id: &TenantId,
        service: &ServiceName,
        request_id: &RequestId,
    ) -> Result<Option<OutboxCommand>, StoreError> {
        Ok(self.with_read(|conn| query_command_by_request(conn, tenant_id, service, request_id))?)
    }
}

// ============================================================================
// SECTION: Dead Letter Store
// ============================================================================

impl DeadLetterStore for SqliteLedgerStore {
    fn record_dead_letter(
        &self,
        entry: NewDeadLetter,
        now: Timestamp,
    ) -> Result<DeadLetterId, StoreError> {
        self.with_write_tx(|conn| insert_dead_letter(conn, &entry, now)).map_err(StoreError::from)
    }

    fn list_dead_letters(
        &self,
        include_resolved: bool,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, StoreError> {
        let limit = i64::try_from(limit)
            .map_err(|_| SqliteStoreError::Invalid("dead letter limit too large".to_string()))?;
        let entries = self.with_read(|conn| {
            let sql = if include_resolved {
                format!(
                    "SELECT {DEAD_LETTER_COLUMNS} FROM dead_letters ORDER BY dead_letter_id DESC \
                     LIMIT ?1"
                )
            } else {
                format!(
                    "SELECT {DEAD_LETTER_COLUMNS} FROM dead_letters WHERE resolved_at IS NULL \
                     ORDER BY dead_letter_id DESC LIMIT ?1"
                )
            };
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let rows = stmt.query_map(params![limit], map_dead_letter_row).map_err(db_error)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row.map_err(db_error)?.into_entry()?);
            }
            Ok(entries)
        })?;
        Ok(entries)
    }

    fn resolve_dead_letter(&self, id: DeadLetterId, now: Timestamp) -> Result<bool, StoreError> {
        self.with_write_tx(|conn| {
            let updated = conn
                .execute(
                    "UPDATE dead_letters SET resolved_at = ?1
                     WHERE dead_letter_id = ?2 AND resolved_at IS NULL",
                    params![now.as_unix_millis(), id.get()],
                )
                .map_err(db_error)?;
            if updated == 1 {
                return Ok(true);
            }
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT dead_letter_id FROM dead_letters WHERE dead_letter_id = ?1",
                    params![id.get()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?;
            match exists {
                Some(_) => Ok(false),
                None => Err(SqliteStoreError::NotFound(format!("dead letter {id}"))),
            }
        })
        .map_err(StoreError::from)
    }

    fn unresolved_dead_letters(&self) -> Result<u64, StoreError> {
        Ok(self.with_read(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(1) FROM dead_letters WHERE resolved_at IS NULL",
                    params![],
                    |row| row.get(0),
                )
                .map_err(db_error)?;
            to_u64(count, "dead letter count")
        })?)
    }
}

// ============================================================================
// SECTION: Projection Store
// ============================================================================

impl ProjectionStore for SqliteLedgerStore {
    fn checkpoint(&self, channel: &ChannelName) -> Result<Option<ProjectorCheckpoint>, StoreError> {
        Ok(self.with_read(|conn| query_checkpoint(conn, channel))?)
    }

    fn is_event_recorded(&self, event_id: EventId) -> Result<bool, StoreError> {
        Ok(self.with_read(|conn| event_recorded(conn, event_id))?)
    }

    fn apply_event(
        &self,
        event: &LedgerEvent,
        payload: &EventPayload,
        now: Timestamp,
    ) -> Result<ApplyOutcome, ProjectionError> {
        self.with_write_tx(|conn| {
            if already_projected(conn, event)? {
                return Ok(ApplyOutcome::Duplicate);
            }
            let current = query_asset(conn, &event.channel_name, payload.asset_id())?;
            let ctx = EventContext {
                channel_name: event.channel_name.clone(),
                event_id: event.event_id,
                position: event.position(),
                committed_at: event.timestamp,
            };
            let change = apply_event(payload, current.as_ref(), &ctx)?;
            upsert_asset(conn, &change.view)?;
            if let Some(transfer) = &change.transfer {
                insert_transfer(conn, transfer)?;
            }
            let checkpoint = record_progress(conn, event, ApplyDisposition::Applied, now)?;
            Ok(ApplyOutcome::Applied(checkpoint))
        })
    }

    fn skip_event(
        &self,
        event: &LedgerEvent,
        dead_letter: NewDeadLetter,
        now: Timestamp,
    ) -> Result<ApplyOutcome, ProjectionError> {
        self.with_write_tx(|conn| {
            if already_projected(conn, event)? {
                return Ok(ApplyOutcome::Duplicate);
            }
            insert_dead_letter(conn, &dead_letter, now)?;
            let checkpoint = record_progress(conn, event, ApplyDisposition::Skipped, now)?;
            Ok(ApplyOutcome::Skipped(checkpoint))
        })
    }

    fn asset(
        &self,
        channel: &ChannelName,
        asset_id: &AssetId,
    ) -> Result<Option<AssetView>, StoreError> {
        Ok(self.with_read(|conn| query_asset(conn, channel, asset_id))?)
    }

    fn asset_transfers(
        &self,
        channel: &ChannelName,
        asset_id: &AssetId,
    ) -> Result<Vec<AssetTransferRecord>, StoreError> {
        Ok(self.with_read(|conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT event_id, from_owner, to_owner, block_number, tx_index
                     FROM asset_transfers
                     WHERE channel_name = ?1 AND asset_id = ?2
                     ORDER BY block_number ASC, tx_index ASC",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![channel.as_str(), asset_id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })
                .map_err(db_error)?;
            let mut transfers = Vec::new();
            for row in rows {
                let (event_id, from_owner, to_owner, block_number, tx_index) =
                    row.map_err(db_error)?;
                transfers.push(AssetTransferRecord {
                    channel_name: channel.clone(),
                    asset_id: asset_id.clone(),
                    event_id: parse_event_id(&event_id)?,
                    from_owner,
                    to_owner,
                    position: decode_position(block_number, tx_index)?,
                });
            }
            Ok(transfers)
        })?)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        Ok(self.with_read(|conn| {
            conn.query_row("SELECT 1", params![], |row| row.get::<_, i64>(0)).map_err(db_error)?;
            Ok(())
        })?)
    }
}

// ============================================================================
// SECTION: Outbox Rows
// ============================================================================

/// Raw outbox row prior to validation.
struct CommandRow {
    /// Command identifier text.
    command_id: String,
    /// Tenant identifier.
    tenant_id: String,
    /// Originating service.
    service: String,
    /// Request identifier.
    request_id: String,
    /// Command type label.
    command_type: String,
    /// Payload JSON text.
    payload_json: String,
    /// Status label.
    status: String,
    /// Failed attempt count.
    attempts: i64,
    /// Last error text.
    last_error: Option<String>,
    /// Ledger transaction id.
    ledger_tx_id: Option<String>,
    /// Earliest next attempt (ms).
    next_attempt_at: i64,
    /// Lease owner.
    lease_owner: Option<String>,
    /// Lease expiry (ms).
    lease_expires_at: Option<i64>,
    /// Creation time (ms).
    created_at: i64,
    /// Last update time (ms).
    updated_at: i64,
}

impl CommandRow {
    /// Validates and converts the row.
    fn into_command(self) -> Result<OutboxCommand, SqliteStoreError> {
        let id = parse_command_id(&self.command_id)?;
        let command_type = CommandType::parse(&self.command_type)
            .map_err(|err| SqliteStoreError::Corrupt(format!("command {id}: {err}")))?;
        let payload: Value = serde_json::from_str(&self.payload_json)
            .map_err(|err| SqliteStoreError::Corrupt(format!("command {id} payload: {err}")))?;
        let command = LedgerCommand::from_parts(command_type, payload)
            .map_err(|err| SqliteStoreError::Corrupt(format!("command {id}: {err}")))?;
        let status = CommandStatus::parse(&self.status).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("command {id} has unknown status {}", self.status))
        })?;
        let attempts = u32::try_from(self.attempts)
            .map_err(|_| SqliteStoreError::Corrupt(format!("command {id} attempts out of range")))?;
        Ok(OutboxCommand {
            id,
            tenant_id: TenantId::new(self.tenant_id),
            service: ServiceName::new(self.service),
            request_id: RequestId::new(self.request_id),
            command,
            status,
            attempts,
            last_error: self.last_error,
            ledger_tx_id: self.ledger_tx_id.map(LedgerTxId::new),
            next_attempt_at: Timestamp::from_unix_millis(self.next_attempt_at),
            lease_owner: self.lease_owner.map(WorkerId::new),
            lease_expires_at: self.lease_expires_at.map(Timestamp::from_unix_millis),
            created_at: Timestamp::from_unix_millis(self.created_at),
            updated_at: Timestamp::from_unix_millis(self.updated_at),
        })
    }
}

/// Maps a `SELECT {COMMAND_COLUMNS}` row.
fn map_command_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandRow> {
    Ok(CommandRow {
        command_id: row.get(0)?,
        tenant_id: row.get(1)?,
        service: row.get(2)?,
        request_id: row.get(3)?,
        command_type: row.get(4)?,
        payload_json: row.get(5)?,
        status: row.get(6)?,
        attempts: row.get(7)?,
        last_error: row.get(8)?,
        ledger_tx_id: row.get(9)?,
        next_attempt_at: row.get(10)?,
        lease_owner: row.get(11)?,
        lease_expires_at: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Loads a command by id.
fn query_command(
    conn: &Connection,
    id: CommandId,
) -> Result<Option<OutboxCommand>, SqliteStoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {COMMAND_COLUMNS} FROM outbox_commands WHERE command_id = ?1"),
            params![id.to_string()],
            map_command_row,
        )
        .optional()
        .map_err(db_error)?;
    row.map(CommandRow::into_command).transpose()
}

/// Loads a command by its request identity.
fn query_command_by_request(
    conn: &Connection,
    tenant_id: &TenantId,
    service: &ServiceName,
    request_id: &RequestId,
) -> Result<Option<OutboxCommand>, SqliteStoreError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COMMAND_COLUMNS} FROM outbox_commands
                 WHERE tenant_id = ?1 AND service = ?2 AND request_id = ?3"
            ),
            params![tenant_id.as_str(), service.as_str(), request_id.as_str()],
            map_command_row,
        )
        .optional()
        .map_err(db_error)?;
    row.map(CommandRow::into_command).transpose()
}

/// Moves a command to a terminal status and releases its lease.
fn finish_command(
    conn: &Connection,
    current: &OutboxCommand,
    status: CommandStatus,
    attempts: u32,
    error: Option<&str>,
    ledger_tx_id: Option<&LedgerTxId>,
    now: Timestamp,
) -> Result<(), SqliteStoreError> {
    conn.execute(
        "UPDATE outbox_commands
         SET status = ?1, attempts = ?2, last_error = COALESCE(?3, last_error), \
         ledger_tx_id = ?4, lease_owner = NULL, lease_expires_at = NULL, updated_at = ?5
         WHERE command_id = ?6",
        params![
            status.as_str(),
            i64::from(attempts),
            error,
            ledger_tx_id.map(LedgerTxId::as_str),
            now.as_unix_millis(),
            current.id.to_string(),
        ],
    )
    .map_err(db_error)?;
    Ok(())
}

/// Builds the dead letter for a failed command.
fn command_dead_letter(
    command: &OutboxCommand,
    attempts: u32,
    failure_class: FailureClass,
    reason: String,
) -> NewDeadLetter {
    let payload = command.command.payload_json().unwrap_or(Value::Null);
    NewDeadLetter {
        source_type: DeadLetterSource::Command,
        source_id: command.id.to_string(),
        failure_class,
        reason,
        payload_snapshot: json!({
            "tenant_id": command.tenant_id.as_str(),
            "service": command.service.as_str(),
            "request_id": command.request_id.as_str(),
            "command_type": command.command.command_type().as_str(),
            "payload": payload,
            "attempts": attempts,
        }),
    }
}

// ============================================================================
// SECTION: Dead Letter Rows
// ============================================================================

/// Raw dead-letter row prior to validation.
struct DeadLetterRow {
    /// Row identifier.
    id: i64,
    /// Source type label.
    source_type: String,
    /// Source identifier.
    source_id: String,
    /// Failure class label.
    failure_class: String,
    /// Failure reason.
    reason: String,
    /// Payload snapshot JSON text.
    payload_json: String,
    /// Creation time (ms).
    created_at: i64,
    /// Resolution time (ms).
    resolved_at: Option<i64>,
}

impl DeadLetterRow {
    /// Validates and converts the row.
    fn into_entry(self) -> Result<DeadLetterEntry, SqliteStoreError> {
        let source_type = DeadLetterSource::parse(&self.source_type).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("dead letter {} source type", self.id))
        })?;
        let failure_class = FailureClass::parse(&self.failure_class).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("dead letter {} failure class", self.id))
        })?;
        let payload_snapshot = serde_json::from_str(&self.payload_json).map_err(|err| {
            SqliteStoreError::Corrupt(format!("dead letter {} payload: {err}", self.id))
        })?;
        Ok(DeadLetterEntry {
            id: DeadLetterId::new(self.id),
            source_type,
            source_id: self.source_id,
            failure_class,
            reason: self.reason,
            payload_snapshot,
            created_at: Timestamp::from_unix_millis(self.created_at),
            resolved_at: self.resolved_at.map(Timestamp::from_unix_millis),
        })
    }
}

/// Maps a `SELECT {DEAD_LETTER_COLUMNS}` row.
fn map_dead_letter_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeadLetterRow> {
    Ok(DeadLetterRow {
        id: row.get(0)?,
        source_type: row.get(1)?,
        source_id: row.get(2)?,
        failure_class: row.get(3)?,
        reason: row.get(4)?,
        payload_json: row.get(5)?,
        created_at: row.get(6)?,
        resolved_at: row.get(7)?,
    })
}

/// Inserts a dead letter within the current transaction, reusing an unresolved
/// entry for the same event.
fn insert_dead_letter(
    conn: &Connection,
    entry: &NewDeadLetter,
    now: Timestamp,
) -> Result<DeadLetterId, SqliteStoreError> {
    if entry.source_type == DeadLetterSource::Event {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT dead_letter_id FROM dead_letters
                 WHERE source_type = ?1 AND source_id = ?2 AND resolved_at IS NULL
                 ORDER BY dead_letter_id ASC LIMIT 1",
                params![entry.source_type.as_str(), entry.source_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        if let Some(id) = existing {
            return Ok(DeadLetterId::new(id));
        }
    }
    let payload_json = serde_json::to_string(&entry.payload_snapshot)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    conn.execute(
        "INSERT INTO dead_letters (source_type, source_id, failure_class, reason, payload_json, \
         created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.source_type.as_str(),
            entry.source_id,
            entry.failure_class.as_str(),
            entry.reason,
            payload_json,
            now.as_unix_millis(),
        ],
    )
    .map_err(db_error)?;
    Ok(DeadLetterId::new(conn.last_insert_rowid()))
}

// ============================================================================
// SECTION: Projection Rows
// ============================================================================

/// Returns true if the event is logged or at or behind the channel checkpoint.
///
/// An event id already logged under another channel or position is a
/// [`ConsistencyViolation::Checkpoint`].
fn already_projected(conn: &Connection, event: &LedgerEvent) -> Result<bool, ProjectionError> {
    if let Some((channel, position)) = recorded_position(conn, event.event_id)? {
        if channel != event.channel_name || position != event.position() {
            return Err(ConsistencyViolation::Checkpoint {
                channel: event.channel_name.clone(),
                detail: format!(
                    "event {} was applied on {channel} at {position}, redelivered at {}",
                    event.event_id,
                    event.position()
                ),
            }
            .into());
        }
        return Ok(true);
    }
    let checkpoint = query_checkpoint(conn, &event.channel_name)?;
    Ok(checkpoint.is_some_and(|checkpoint| event.position() <= checkpoint.position))
}

/// Returns the channel and position an event id was logged at.
fn recorded_position(
    conn: &Connection,
    event_id: EventId,
) -> Result<Option<(ChannelName, EventPosition)>, SqliteStoreError> {
    let row = conn
        .query_row(
            "SELECT channel_name, block_number, tx_index FROM event_apply_log WHERE event_id = ?1",
            params![event_id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
        )
        .optional()
        .map_err(db_error)?;
    let Some((channel, block_number, tx_index)) = row else {
        return Ok(None);
    };
    let tx_index = u32::try_from(tx_index)
        .map_err(|_| SqliteStoreError::Corrupt("apply log tx_index out of range".to_string()))?;
    Ok(Some((
        ChannelName::new(channel),
        EventPosition::new(to_u64(block_number, "apply log block_number")?, tx_index),
    )))
}

/// Returns true if the event id is present in the apply log.
fn event_recorded(conn: &Connection, event_id: EventId) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM event_apply_log WHERE event_id = ?1",
            params![event_id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_error)?;
    Ok(found.is_some())
}

/// Loads the checkpoint of a channel.
fn query_checkpoint(
    conn: &Connection,
    channel: &ChannelName,
) -> Result<Option<ProjectorCheckpoint>, SqliteStoreError> {
    let row = conn
        .query_row(
            "SELECT block_number, tx_index, last_event_id, updated_at
             FROM projector_checkpoints WHERE channel_name = ?1",
            params![channel.as_str()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()
        .map_err(db_error)?;
    let Some((block_number, tx_index, last_event_id, updated_at)) = row else {
        return Ok(None);
    };
    Ok(Some(ProjectorCheckpoint {
        channel_name: channel.clone(),
        position: decode_position(block_number, tx_index)?,
        last_event_id: parse_event_id(&last_event_id)?,
        updated_at: Timestamp::from_unix_millis(updated_at),
    }))
}

/// Writes the apply-log row and advances the checkpoint for `event`.
fn record_progress(
    conn: &Connection,
    event: &LedgerEvent,
    disposition: ApplyDisposition,
    now: Timestamp,
) -> Result<ProjectorCheckpoint, SqliteStoreError> {
    let block_number = to_i64(event.block_number, "block_number")?;
    conn.execute(
        "INSERT INTO event_apply_log (event_id, channel_name, block_number, tx_index, \
         disposition, applied_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id.to_string(),
            event.channel_name.as_str(),
            block_number,
            i64::from(event.tx_index),
            disposition.as_str(),
            now.as_unix_millis(),
        ],
    )
    .map_err(db_error)?;
    conn.execute(
        "INSERT INTO projector_checkpoints (channel_name, block_number, tx_index, last_event_id, \
         updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (channel_name) DO UPDATE SET
             block_number = excluded.block_number,
             tx_index = excluded.tx_index,
             last_event_id = excluded.last_event_id,
             updated_at = excluded.updated_at",
        params![
            event.channel_name.as_str(),
            block_number,
            i64::from(event.tx_index),
            event.event_id.to_string(),
            now.as_unix_millis(),
        ],
    )
    .map_err(db_error)?;
    Ok(ProjectorCheckpoint {
        channel_name: event.channel_name.clone(),
        position: event.position(),
        last_event_id: event.event_id,
        updated_at: now,
    })
}

/// Loads an asset view.
fn query_asset(
    conn: &Connection,
    channel: &ChannelName,
    asset_id: &AssetId,
) -> Result<Option<AssetView>, SqliteStoreError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {ASSET_COLUMNS} FROM asset_views WHERE channel_name = ?1 AND asset_id = ?2"
            ),
            params![channel.as_str(), asset_id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            },
        )
        .optional()
        .map_err(db_error)?;
    let Some((owner, value, metadata_json, status, version, block_number, tx_index, updated_at)) =
        row
    else {
        return Ok(None);
    };
    let metadata = metadata_json
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|err| SqliteStoreError::Corrupt(format!("asset {asset_id} metadata: {err}")))?;
    let status = AssetStatus::parse(&status)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("asset {asset_id} status {status}")))?;
    Ok(Some(AssetView {
        channel_name: channel.clone(),
        asset_id: asset_id.clone(),
        owner,
        value: to_u64(value, "asset value")?,
        metadata,
        status,
        version: to_u64(version, "asset version")?,
        last_position: decode_position(block_number, tx_index)?,
        updated_at: Timestamp::from_unix_millis(updated_at),
    }))
}

/// Inserts or replaces an asset view.
fn upsert_asset(conn: &Connection, view: &AssetView) -> Result<(), SqliteStoreError> {
    let metadata_json = view
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    conn.execute(
        &format!(
            "INSERT INTO asset_views ({ASSET_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (channel_name, asset_id) DO UPDATE SET
                 owner = excluded.owner,
                 value = excluded.value,
                 metadata_json = excluded.metadata_json,
                 status = excluded.status,
                 version = excluded.version,
                 last_block_number = excluded.last_block_number,
                 last_tx_index = excluded.last_tx_index,
                 updated_at = excluded.updated_at"
        ),
        params![
            view.channel_name.as_str(),
            view.asset_id.as_str(),
            view.owner,
            to_i64(view.value, "asset value")?,
            metadata_json,
            view.status.as_str(),
            to_i64(view.version, "asset version")?,
            to_i64(view.last_position.block_number, "block_number")?,
            i64::from(view.last_position.tx_index),
            view.updated_at.as_unix_millis(),
        ],
    )
    .map_err(db_error)?;
    Ok(())
}

/// Appends a transfer history row.
fn insert_transfer(
    conn: &Connection,
    transfer: &AssetTransferRecord,
) -> Result<(), SqliteStoreError> {
    conn.execute(
        "INSERT INTO asset_transfers (event_id, channel_name, asset_id, from_owner, to_owner, \
         block_number, tx_index)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            transfer.event_id.to_string(),
            transfer.channel_name.as_str(),
            transfer.asset_id.as_str(),
            transfer.from_owner,
            transfer.to_owner,
            to_i64(transfer.position.block_number, "block_number")?,
            i64::from(transfer.position.tx_index),
        ],
    )
    .map_err(db_error)?;
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS outbox_commands (
                    command_id TEXT PRIMARY KEY,
                    tenant_id TEXT NOT NULL,
                    service TEXT NOT NULL,
                    request_id TEXT NOT NULL,
                    command_type TEXT NOT NULL,
                    payload_json TEXT NOT NULL,
                    status TEXT NOT NULL,
                    attempts INTEGER NOT NULL DEFAULT 0,
                    last_error TEXT,
                    ledger_tx_id TEXT,
                    next_attempt_at INTEGER NOT NULL,
                    lease_owner TEXT,
                    lease_expires_at INTEGER,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    UNIQUE (tenant_id, service, request_id)
                );
                CREATE INDEX IF NOT EXISTS idx_outbox_commands_claimable
                    ON outbox_commands (status, next_attempt_at);
                CREATE TABLE IF NOT EXISTS dead_letters (
                    dead_letter_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    source_type TEXT NOT NULL,
                    source_id TEXT NOT NULL,
                    failure_class TEXT NOT NULL,
                    reason TEXT NOT NULL,
                    payload_json TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    resolved_at INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_dead_letters_unresolved
                    ON dead_letters (resolved_at);
                CREATE TABLE IF NOT EXISTS projector_checkpoints (
                    channel_name TEXT PRIMARY KEY,
                    block_number INTEGER NOT NULL,
                    tx_index INTEGER NOT NULL,
                    last_event_id TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS event_apply_log (
                    event_id TEXT PRIMARY KEY,
                    channel_name TEXT NOT NULL,
                    block_number INTEGER NOT NULL,
                    tx_index INTEGER NOT NULL,
                    disposition TEXT NOT NULL,
                    applied_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_event_apply_log_position
                    ON event_apply_log (channel_name, block_number, tx_index);
                CREATE TABLE IF NOT EXISTS asset_views (
                    channel_name TEXT NOT NULL,
                    asset_id TEXT NOT NULL,
                    owner TEXT NOT NULL,
                    value INTEGER NOT NULL,
                    metadata_json TEXT,
                    status TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    last_block_number INTEGER NOT NULL,
                    last_tx_index INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (channel_name, asset_id)
                );
                CREATE TABLE IF NOT EXISTS asset_transfers (
                    event_id TEXT PRIMARY KEY,
                    channel_name TEXT NOT NULL,
                    asset_id TEXT NOT NULL,
                    from_owner TEXT NOT NULL,
                    to_owner TEXT NOT NULL,
                    block_number INTEGER NOT NULL,
                    tx_index INTEGER NOT NULL,
                    FOREIGN KEY (channel_name, asset_id)
                        REFERENCES asset_views(channel_name, asset_id)
                );
                CREATE INDEX IF NOT EXISTS idx_asset_transfers_asset
                    ON asset_transfers (channel_name, asset_id, block_number, tx_index);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Parses a stored command identifier.
fn parse_command_id(value: &str) -> Result<CommandId, SqliteStoreError> {
    CommandId::parse(value)
        .map_err(|err| SqliteStoreError::Corrupt(format!("invalid command id {value}: {err}")))
}

/// Parses a stored event identifier.
fn parse_event_id(value: &str) -> Result<EventId, SqliteStoreError> {
    EventId::parse(value)
        .map_err(|err| SqliteStoreError::Corrupt(format!("invalid event id {value}: {err}")))
}

/// Decodes a stored `(block_number, tx_index)` pair.
fn decode_position(block_number: i64, tx_index: i64) -> Result<EventPosition, SqliteStoreError> {
    let block_number = to_u64(block_number, "block_number")?;
    let tx_index = u32::try_from(tx_index)
        .map_err(|_| SqliteStoreError::Corrupt("tx_index out of range".to_string()))?;
    Ok(EventPosition::new(block_number, tx_index))
}

/// Converts a stored integer to `u64`.
fn to_u64(value: i64, field: &str) -> Result<u64, SqliteStoreError> {
    u64::try_from(value).map_err(|_| SqliteStoreError::Corrupt(format!("{field} is negative")))
}

/// Converts an unsigned value to a storable integer.
fn to_i64(value: u64, field: &str) -> Result<i64, SqliteStoreError> {
    i64::try_from(value).map_err(|_| SqliteStoreError::Invalid(format!("{field} exceeds i64")))
}
