// crates/ledger-bridge-core/src/core/event.rs
// ============================================================================
// Module: Ledger Bridge Events
// Description: Ledger event envelopes, ordering positions, and typed payloads.
// Purpose: Define the read-side input model consumed by the projector.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`LedgerEvent`] arrives with an untrusted JSON payload. Only after schema
//! validation does it become a typed [`EventPayload`], a closed variant with one
//! shape per event name regardless of the wire version it arrived in.
//! Events are ordered within a channel by [`EventPosition`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AssetId;
use crate::core::identifiers::ChannelName;
use crate::core::identifiers::EventId;
use crate::core::identifiers::LedgerTxId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Positions
// ============================================================================

/// Ordering key of an event within a channel.
///
/// # Invariants
/// - Ordered lexicographically by `(block_number, tx_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventPosition {
    /// Block number.
    pub block_number: u64,
    /// Transaction sequence within the block.
    pub tx_index: u32,
}

impl EventPosition {
    /// Creates a position.
    #[must_use]
    pub const fn new(block_number: u64, tx_index: u32) -> Self {
        Self {
            block_number,
            tx_index,
        }
    }
}

impl fmt::Display for EventPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.block_number, self.tx_index)
    }
}

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Ledger-committed event as delivered by the event source.
///
/// # Invariants
/// - `event_id` is globally unique.
/// - `payload` is untrusted until validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Globally unique event identifier.
    pub event_id: EventId,
    /// Event name (schema lookup key).
    pub event_name: String,
    /// Event schema version (schema lookup key).
    pub event_version: String,
    /// Block number.
    pub block_number: u64,
    /// Ledger transaction identifier.
    pub tx_id: LedgerTxId,
    /// Transaction sequence within the block.
    pub tx_index: u32,
    /// Chaincode that emitted the event.
    pub chaincode_name: String,
    /// Channel the event was committed on.
    pub channel_name: ChannelName,
    /// Ledger commit timestamp.
    pub timestamp: Timestamp,
    /// Raw event payload.
    pub payload: Value,
}

impl LedgerEvent {
    /// Returns the ordering position of the event.
    #[must_use]
    pub const fn position(&self) -> EventPosition {
        EventPosition::new(self.block_number, self.tx_index)
    }
}

// ============================================================================
// SECTION: Typed Payloads
// ============================================================================

/// Closed set of event names understood by the projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// Asset registration.
    AssetRegistered,
    /// Asset ownership transfer.
    AssetTransferred,
    /// Asset retirement.
    AssetRetired,
}

impl EventName {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssetRegistered => "AssetRegistered",
            Self::AssetTransferred => "AssetTransferred",
            Self::AssetRetired => "AssetRetired",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized `AssetRegistered` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistered {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Initial owner.
    pub owner: String,
    /// Asset value in minor units.
    pub value: u64,
    /// Optional metadata (absent in version 1.0).
    pub metadata: Option<Value>,
}

/// Normalized `AssetTransferred` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransferred {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Previous owner.
    pub from_owner: String,
    /// New owner.
    pub to_owner: String,
}

/// Normalized `AssetRetired` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRetired {
    /// Asset identifier.
    pub asset_id: AssetId,
    /// Retirement reason.
    pub reason: String,
}

/// Validated, typed event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_name", content = "payload")]
pub enum EventPayload {
    /// Asset registration.
    AssetRegistered(AssetRegistered),
    /// Asset ownership transfer.
    AssetTransferred(AssetTransferred),
    /// Asset retirement.
    AssetRetired(AssetRetired),
}

impl EventPayload {
    /// Returns the event name tag.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::AssetRegistered(_) => EventName::AssetRegistered,
            Self::AssetTransferred(_) => EventName::AssetTransferred,
            Self::AssetRetired(_) => EventName::AssetRetired,
        }
    }

    /// Returns the asset the event refers to.
    #[must_use]
    pub const fn asset_id(&self) -> &AssetId {
        match self {
            Self::AssetRegistered(event) => &event.asset_id,
            Self::AssetTransferred(event) => &event.asset_id,
            Self::AssetRetired(event) => &event.asset_id,
        }
    }
}

/// Schema validation result for a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEvent {
    /// Typed payload.
    pub payload: EventPayload,
    /// True when the event used a deprecated-but-known schema version.
    pub deprecated: bool,
}
