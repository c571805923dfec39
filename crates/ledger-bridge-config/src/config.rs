// crates/ledger-bridge-config/src/config.rs
// ============================================================================
// Module: Ledger Bridge Configuration
// Description: Configuration loading and validation for the ledger bridge.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ledger-bridge-core, ledger-bridge-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Resolution order is explicit path, then `LEDGER_BRIDGE_CONFIG`, then
//! `ledger-bridge.toml` in the working directory. Invalid configuration fails
//! closed; nothing is silently clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use ledger_bridge_core::BackoffPolicy;
use ledger_bridge_core::ChannelName;
use ledger_bridge_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "ledger-bridge.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "LEDGER_BRIDGE_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of worker ids and channel names.
const MAX_NAME_LENGTH: usize = 128;
/// Upper bound for per-poll batch sizes.
const MAX_BATCH_SIZE: usize = 10_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Ledger bridge configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerBridgeConfig {
    /// `SQLite` store configuration.
    pub store: SqliteStoreConfig,
    /// Submitter worker configuration.
    #[serde(default)]
    pub submitter: SubmitterConfig,
    /// Projector configuration.
    pub projector: ProjectorConfig,
    /// Health monitor configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl LedgerBridgeConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.store.path.to_string_lossy())?;
        if self.store.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid("store.busy_timeout_ms must be positive".to_string()));
        }
        self.submitter.validate()?;
        self.projector.validate()?;
        self.health.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Submitter
// ============================================================================

/// Submitter worker configuration.
///
/// # Invariants
/// - `lease_duration_ms` exceeds `submit_timeout_ms` so a live worker never
///   loses its lease mid-call.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitterConfig {
    /// Lease owner identity; generated at startup when absent.
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Delay between polls when no work is claimable.
    #[serde(default = "default_submitter_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum commands claimed per poll.
    #[serde(default = "default_submitter_batch_size")]
    pub batch_size: usize,
    /// Lease length granted per claim.
    #[serde(default = "default_lease_duration_ms")]
    pub lease_duration_ms: u64,
    /// Bound on a single ledger submission.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
    /// Failed attempts after which a command is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum retry delay.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Query the ledger by idempotency key before resubmitting.
    #[serde(default)]
    pub reconcile_before_retry: bool,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            worker_id: None,
            poll_interval_ms: default_submitter_poll_interval_ms(),
            batch_size: default_submitter_batch_size(),
            lease_duration_ms: default_lease_duration_ms(),
            submit_timeout_ms: default_submit_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            reconcile_before_retry: false,
        }
    }
}

impl SubmitterConfig {
    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the lease duration.
    #[must_use]
    pub const fn lease_duration(&self) -> Duration {
        Duration::from_millis(self.lease_duration_ms)
    }

    /// Returns the submission timeout.
    #[must_use]
    pub const fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Returns the retry backoff policy.
    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_cap_ms),
        )
    }

    /// Validates submitter settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(worker_id) = &self.worker_id {
            validate_name("submitter.worker_id", worker_id)?;
        }
        require_positive("submitter.poll_interval_ms", self.poll_interval_ms)?;
        require_positive("submitter.lease_duration_ms", self.lease_duration_ms)?;
        require_positive("submitter.submit_timeout_ms", self.submit_timeout_ms)?;
        require_positive("submitter.backoff_base_ms", self.backoff_base_ms)?;
        validate_batch_size("submitter.batch_size", self.batch_size)?;
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "submitter.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(ConfigError::Invalid(
                "submitter.backoff_cap_ms must be >= submitter.backoff_base_ms".to_string(),
            ));
        }
        if self.lease_duration_ms <= self.submit_timeout_ms {
            return Err(ConfigError::Invalid(
                "submitter.lease_duration_ms must exceed submitter.submit_timeout_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default submitter poll interval.
const fn default_submitter_poll_interval_ms() -> u64 {
    1_000
}

/// Returns the default submitter batch size.
const fn default_submitter_batch_size() -> usize {
    16
}

/// Returns the default lease duration.
const fn default_lease_duration_ms() -> u64 {
    30_000
}

/// Returns the default submission timeout.
const fn default_submit_timeout_ms() -> u64 {
    10_000
}

/// Returns the default attempt ceiling.
const fn default_max_attempts() -> u32 {
    5
}

/// Returns the default backoff base.
const fn default_backoff_base_ms() -> u64 {
    500
}

/// Returns the default backoff cap.
const fn default_backoff_cap_ms() -> u64 {
    60_000
}

// ============================================================================
// SECTION: Projector
// ============================================================================

/// Handling of events that fail schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoisonPillPolicy {
    /// Dead-letter the event and stop the channel.
    #[default]
    Halt,
    /// Dead-letter the event and advance the checkpoint past it.
    Skip,
}

/// Projector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectorConfig {
    /// Channels to project; one projector loop runs per channel.
    pub channels: Vec<String>,
    /// Delay between polls when the feed is drained.
    #[serde(default = "default_projector_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum events fetched per poll.
    #[serde(default = "default_projector_batch_size")]
    pub batch_size: usize,
    /// Poison-pill policy.
    #[serde(default)]
    pub poison_pill: PoisonPillPolicy,
}

impl ProjectorConfig {
    /// Returns the configured channels as typed names.
    #[must_use]
    pub fn channel_names(&self) -> Vec<ChannelName> {
        self.channels.iter().map(|name| ChannelName::new(name.as_str())).collect()
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validates projector settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::Invalid(
                "projector.channels must list at least one channel".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for channel in &self.channels {
            validate_name("projector.channels", channel)?;
            if !seen.insert(channel.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "projector.channels contains duplicate channel {channel}"
                )));
            }
        }
        require_positive("projector.poll_interval_ms", self.poll_interval_ms)?;
        validate_batch_size("projector.batch_size", self.batch_size)
    }
}

/// Returns the default projector poll interval.
const fn default_projector_poll_interval_ms() -> u64 {
    1_000
}

/// Returns the default projector batch size.
const fn default_projector_batch_size() -> usize {
    100
}

// ============================================================================
// SECTION: Health
// ============================================================================

/// Readiness thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Maximum tolerated projection lag.
    #[serde(default = "default_lag_threshold_ms")]
    pub lag_threshold_ms: u64,
    /// Unresolved dead letters at which the service reports unready.
    #[serde(default = "default_dead_letter_ceiling")]
    pub dead_letter_ceiling: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            lag_threshold_ms: default_lag_threshold_ms(),
            dead_letter_ceiling: default_dead_letter_ceiling(),
        }
    }
}

impl HealthConfig {
    /// Returns the lag threshold.
    #[must_use]
    pub const fn lag_threshold(&self) -> Duration {
        Duration::from_millis(self.lag_threshold_ms)
    }

    /// Validates health settings.
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("health.lag_threshold_ms", self.lag_threshold_ms)?;
        require_positive("health.dead_letter_ceiling", self.dead_letter_ceiling)
    }
}

/// Returns the default lag threshold.
const fn default_lag_threshold_ms() -> u64 {
    30_000
}

/// Returns the default dead-letter ceiling.
const fn default_dead_letter_ceiling() -> u64 {
    100
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `path`.
    File,
    /// Discard audit events.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path (required for `file`).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required when audit.sink = \"file\"".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid when audit.sink = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a worker or channel name.
fn validate_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} entry exceeds {MAX_NAME_LENGTH} bytes")));
    }
    Ok(())
}

/// Rejects zero for durations and thresholds.
fn require_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be positive")));
    }
    Ok(())
}

/// Validates a batch size range.
fn validate_batch_size(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_BATCH_SIZE {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_BATCH_SIZE}"
        )));
    }
    Ok(())
}
