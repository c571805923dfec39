// crates/ledger-bridge-core/src/core/projection.rs
// ============================================================================
// Module: Ledger Bridge Projection Model
// Description: Read models, checkpoints, and the pure event apply function.
// Purpose: Map validated events onto read-model state deterministically.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`apply_event`] is the only place read-model semantics live. It is a total
//! match over [`EventPayload`] and takes the current [`AssetView`] (if any) as
//! input, returning the new state or a [`ConsistencyViolation`] when the event
//! contradicts projected history. Stores execute it inside the transaction
//! that also advances the [`ProjectorCheckpoint`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::event::EventPayload;
use crate::core::event::EventPosition;
use crate::core::identifiers::AssetId;
use crate::core::identifiers::ChannelName;
use crate::core::identifiers::EventId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Checkpoints
// ============================================================================

/// Last event position reflected in a channel's read models.
///
/// # Invariants
/// - Exactly one row per channel.
/// - Advanced only in the same commit as the corresponding read-model change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorCheckpoint {
    /// Channel name.
    pub channel_name: ChannelName,
    /// Position of the last applied or skipped event.
    pub position: EventPosition,
    /// Identifier of that event.
    pub last_event_id: EventId,
    /// Local time the checkpoint last advanced.
    pub updated_at: Timestamp,
}

/// How an event was reflected in the apply log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyDisposition {
    /// Read models were mutated.
    Applied,
    /// Event was dead-lettered and skipped under the skip policy.
    Skipped,
}

impl ApplyDisposition {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
        }
    }
}

// ============================================================================
// SECTION: Read Models
// ============================================================================

/// Asset lifecycle status in the read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    /// Asset is live.
    Active,
    /// Asset has been retired.
    Retired,
}

impl AssetStatus {
    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Retired => "RETIRED",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "ACTIVE" => Some(Self::Active),
            "RETIRED" => Some(Self::Retired),
            _ => None,
        }
    }
}

/// Query-optimized view of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetView {
    /// Channel the asset lives on.
    pub channel_name: ChannelName,
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Current owner.
    pub owner: String,
    /// Asset value in minor units.
    pub value: u64,
    /// Registration metadata.
    pub metadata: Option<Value>,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Number of events applied to this asset.
    pub version: u64,
    /// Position of the last event applied to this asset.
    pub last_position: EventPosition,
    /// Ledger timestamp of the last applied event.
    pub updated_at: Timestamp,
}

/// One row of an asset's transfer history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransferRecord {
    /// Channel name.
    pub channel_name: ChannelName,
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Event that recorded the transfer.
    pub event_id: EventId,
    /// Previous owner.
    pub from_owner: String,
    /// New owner.
    pub to_owner: String,
    /// Event position.
    pub position: EventPosition,
}

/// Read-model mutation produced by [`apply_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadModelChange {
    /// New asset view (upserted).
    pub view: AssetView,
    /// Transfer history row to append, if any.
    pub transfer: Option<AssetTransferRecord>,
}

// ============================================================================
// SECTION: Apply
// ============================================================================

/// Event metadata the apply function stamps onto read models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// Channel name.
    pub channel_name: ChannelName,
    /// Event identifier.
    pub event_id: EventId,
    /// Event position.
    pub position: EventPosition,
    /// Ledger commit timestamp.
    pub committed_at: Timestamp,
}

/// Event contradicts projected state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyViolation {
    /// Registration for an asset that already exists.
    #[error("asset {0} already registered")]
    AlreadyRegistered(AssetId),
    /// Mutation for an asset that was never registered.
    #[error("asset {0} is not registered")]
    UnknownAsset(AssetId),
    /// Mutation for a retired asset.
    #[error("asset {0} is retired")]
    Retired(AssetId),
    /// Transfer whose source owner does not match the projected owner.
    #[error("asset {asset_id} owner mismatch: projected {projected}, event {claimed}")]
    OwnerMismatch {
        /// Asset identifier.
        asset_id: AssetId,
        /// Owner in the read model.
        projected: String,
        /// Owner claimed by the event.
        claimed: String,
    },
    /// Stored checkpoint or apply log disagrees with the event being applied.
    #[error("checkpoint mismatch on channel {channel}: {detail}")]
    Checkpoint {
        /// Channel name.
        channel: ChannelName,
        /// Mismatch description.
        detail: String,
    },
}

/// Applies a validated event to the current asset state.
///
/// # Errors
///
/// Returns [`ConsistencyViolation`] when the event cannot follow `current`.
pub fn apply_event(
    payload: &EventPayload,
    current: Option<&AssetView>,
    ctx: &EventContext,
) -> Result<ReadModelChange, ConsistencyViolation> {
    match payload {
        EventPayload::AssetRegistered(event) => {
            if current.is_some() {
                return Err(ConsistencyViolation::AlreadyRegistered(event.asset_id.clone()));
            }
            Ok(ReadModelChange {
                view: AssetView {
                    channel_name: ctx.channel_name.clone(),
                    asset_id: event.asset_id.clone(),
                    owner: event.owner.clone(),
                    value: event.value,
                    metadata: event.metadata.clone(),
                    status: AssetStatus::Active,
                    version: 1,
                    last_position: ctx.position,
                    updated_at: ctx.committed_at,
                },
                transfer: None,
            })
        }
        EventPayload::AssetTransferred(event) => {
            let existing = live_asset(&event.asset_id, current)?;
            if existing.owner != event.from_owner {
                return Err(ConsistencyViolation::OwnerMismatch {
                    asset_id: event.asset_id.clone(),
                    projected: existing.owner.clone(),
                    claimed: event.from_owner.clone(),
                });
            }
            let mut view = advance(existing, ctx);
            view.owner.clone_from(&event.to_owner);
            Ok(ReadModelChange {
                view,
                transfer: Some(AssetTransferRecord {
                    channel_name: ctx.channel_name.clone(),
                    asset_id: event.asset_id.clone(),
                    event_id: ctx.event_id,
                    from_owner: event.from_owner.clone(),
                    to_owner: event.to_owner.clone(),
                    position: ctx.position,
                }),
            })
        }
        EventPayload::AssetRetired(event) => {
            let existing = live_asset(&event.asset_id, current)?;
            let mut view = advance(existing, ctx);
            view.status = AssetStatus::Retired;
            Ok(ReadModelChange {
                view,
                transfer: None,
            })
        }
    }
}

/// Returns the current view if the asset exists and is not retired.
fn live_asset<'a>(
    asset_id: &AssetId,
    current: Option<&'a AssetView>,
) -> Result<&'a AssetView, ConsistencyViolation> {
    let Some(view) = current else {
        return Err(ConsistencyViolation::UnknownAsset(asset_id.clone()));
    };
    if view.status == AssetStatus::Retired {
        return Err(ConsistencyViolation::Retired(asset_id.clone()));
    }
    Ok(view)
}

/// Copies a view with version and position bumped for the event in `ctx`.
fn advance(view: &AssetView, ctx: &EventContext) -> AssetView {
    AssetView {
        version: view.version.saturating_add(1),
        last_position: ctx.position,
        updated_at: ctx.committed_at,
        ..view.clone()
    }
}

impl fmt::Display for ApplyDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
