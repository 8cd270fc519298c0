pub mod source;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::{EventId, MarketId, SourceEvent, SourceMarket};

/// Lists every event id the upstream feed currently knows about.
/// The list is unordered and may repeat ids seen on earlier calls.
#[async_trait]
pub trait EventIdLister: Send + Sync {
    async fn list_event_ids(&self) -> Result<Vec<EventId>>;
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn event_by_id(&self, id: EventId) -> Result<SourceEvent>;
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn market_by_id(&self, id: MarketId) -> Result<SourceMarket>;
}
