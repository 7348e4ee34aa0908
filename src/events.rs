//! Typed publish/subscribe channel for engine notifications

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::{GasStatus, OpportunitySet, PriceSnapshot, TradeOutcome};

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Each event carries a complete snapshot; subscribers never see partial updates.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    PricesUpdated(Arc<PriceSnapshot>),
    OpportunitiesUpdated(Arc<OpportunitySet>),
    TradeExecuted(TradeOutcome),
    GasUpdated(GasStatus),
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers for engine event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
