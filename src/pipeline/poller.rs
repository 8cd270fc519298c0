use crate::feed::types::EventId;
use crate::feed::EventIdLister;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Highest event id forwarded so far. Never decreases.
///
/// Dedup is structural: an id is new only if it is strictly above the
/// cursor, so nothing below or at the cursor is ever forwarded again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryCursor {
    highest: EventId,
}

impl DiscoveryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> EventId {
        self.highest
    }

    /// Keep only ids above the cursor, ascending and without repeats, then
    /// move the cursor to the largest of them.
    pub fn advance(&mut self, listed: Vec<EventId>) -> Vec<EventId> {
        let mut fresh: Vec<EventId> = listed.into_iter().filter(|&id| id > self.highest).collect();
        fresh.sort_unstable();
        fresh.dedup();
        if let Some(&max) = fresh.last() {
            self.highest = self.highest.max(max);
        }
        fresh
    }
}

/// Discovery poller: periodically lists the upstream feed and emits ids it
/// has not forwarded before.
pub struct Feed {
    cancel: CancellationToken,
    task: JoinHandle<DiscoveryCursor>,
}

impl Feed {
    /// Start polling `checker` every `frequency` (first poll immediately).
    /// New ids arrive on the returned receiver, which closes once the feed
    /// is closed.
    pub fn spawn(
        checker: Arc<dyn EventIdLister>,
        frequency: Duration,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<EventId>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let worker = FeedWorker {
            checker,
            frequency,
            cursor: DiscoveryCursor::new(),
            new_items: tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());
        (Self { cancel, task }, rx)
    }

    /// Stop polling and close the output. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the polling task to exit and return its final cursor.
    pub async fn join(self) -> Result<DiscoveryCursor> {
        self.task.await.context("discovery poller task failed")
    }
}

struct FeedWorker {
    checker: Arc<dyn EventIdLister>,
    frequency: Duration,
    cursor: DiscoveryCursor,
    new_items: mpsc::Sender<EventId>,
    cancel: CancellationToken,
}

impl FeedWorker {
    async fn run(mut self) -> DiscoveryCursor {
        tracing::debug!(
            frequency_ms = self.frequency.as_millis() as u64,
            "discovery poller started"
        );
        let mut delay = Duration::ZERO;

        'poll: loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break 'poll,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.frequency;

            let listed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break 'poll,
                listed = self.checker.list_event_ids() => listed,
            };

            // A failed listing skips the cycle; the next poll retries.
            let listed = match listed {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!("failed to check for new event ids: {:#}", e);
                    continue;
                }
            };

            let fresh = self.cursor.advance(listed);
            if !fresh.is_empty() {
                tracing::debug!(
                    count = fresh.len(),
                    cursor = self.cursor.position(),
                    "discovered new events"
                );
            }

            for id in fresh {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break 'poll,
                    sent = self.new_items.send(id) => {
                        if sent.is_err() {
                            tracing::info!("event id receiver dropped, stopping discovery");
                            break 'poll;
                        }
                    }
                }
            }
        }

        tracing::debug!(cursor = self.cursor.position(), "discovery poller stopped");
        self.cursor
    }
}
