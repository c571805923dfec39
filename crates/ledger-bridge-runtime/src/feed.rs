// crates/ledger-bridge-runtime/src/feed.rs
// ============================================================================
// Module: In-Memory Event Feed
// Description: Ordered, resumable event source held in memory.
// Purpose: Stand in for a ledger event listener in embedding and tests.
// Dependencies: ledger-bridge-core, async-trait
// ============================================================================

//! In-memory [`EventSource`] implementation for embedding and tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ledger_bridge_core::ChannelName;
use ledger_bridge_core::EventPosition;
use ledger_bridge_core::EventSource;
use ledger_bridge_core::EventSourceError;
use ledger_bridge_core::LedgerEvent;

/// Event feed backed by per-channel vectors.
///
/// # Invariants
/// - `fetch` returns events strictly after `after`, in position order.
/// - Publishing the same event twice models at-least-once redelivery.
#[derive(Debug, Default)]
pub struct InMemoryEventFeed {
    /// Events per channel in publication order.
    channels: Mutex<BTreeMap<ChannelName, Vec<LedgerEvent>>>,
}

impl InMemoryEventFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes an event on its channel.
    ///
    /// # Errors
    ///
    /// Returns [`EventSourceError::Unavailable`] when the feed lock is poisoned.
    pub fn publish(&self, event: LedgerEvent) -> Result<(), EventSourceError> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| EventSourceError::Unavailable("feed lock poisoned".to_string()))?;
        channels.entry(event.channel_name.clone()).or_default().push(event);
        Ok(())
    }
}

#[async_trait]
impl EventSource for InMemoryEventFeed {
    async fn fetch(
        &self,
        channel: &ChannelName,
        after: Option<EventPosition>,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, EventSourceError> {
        let channels = self
            .channels
            .lock()
            .map_err(|_| EventSourceError::Unavailable("feed lock poisoned".to_string()))?;
        let Some(events) = channels.get(channel) else {
            return Ok(Vec::new());
        };
        let mut selected: Vec<LedgerEvent> = events
            .iter()
            .filter(|event| after.is_none_or(|after| event.position() > after))
            .cloned()
            .collect();
        selected.sort_by_key(LedgerEvent::position);
        selected.truncate(limit);
        Ok(selected)
    }
}
