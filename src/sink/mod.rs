pub mod rest;

use crate::model::NormalizedEvent;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Downstream store that accepts one normalized event per call.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, event: &NormalizedEvent) -> Result<()>;
}

/// Counts reported when the sink's input closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub delivered: u64,
    pub failed: u64,
}

/// Terminal stage: writes each event to the store, one at a time.
/// A failed write is logged and the event discarded.
pub struct EventSink<S> {
    store: S,
    events: mpsc::Receiver<NormalizedEvent>,
}

impl<S: EventStore> EventSink<S> {
    pub fn new(events: mpsc::Receiver<NormalizedEvent>, store: S) -> Self {
        Self { store, events }
    }

    /// Drain the input until every upstream sender is gone.
    pub async fn process_all(mut self) -> SinkSummary {
        let mut summary = SinkSummary::default();
        while let Some(event) = self.events.recv().await {
            match self.store.create(&event).await {
                Ok(()) => {
                    summary.delivered += 1;
                    tracing::debug!(event_id = %event.id, "stored event");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(event_id = %event.id, "failed to store event: {:#}", e);
                }
            }
        }
        tracing::info!(
            delivered = summary.delivered,
            failed = summary.failed,
            "event sink drained"
        );
        summary
    }
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn create(&self, event: &NormalizedEvent) -> Result<()> {
        (**self).create(event).await
    }
}
