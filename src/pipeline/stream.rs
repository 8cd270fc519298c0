use super::convert::convert_event;
use crate::feed::types::{EventId, SourceEvent};
use crate::feed::{EventSource, MarketSource};
use crate::model::NormalizedEvent;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Channel sizes for the fetch-transform stage.
#[derive(Debug, Clone, Copy)]
pub struct StreamCapacity {
    /// Fetched source events waiting for conversion.
    pub buffer: usize,
    /// Normalized events waiting for the sink.
    pub output: usize,
}

impl Default for StreamCapacity {
    fn default() -> Self {
        Self { buffer: 16, output: 1 }
    }
}

/// Fetch-transform stage. Turns discovered ids into normalized events.
///
/// Runs as two tasks: the fetch task pulls ids and fetches source events,
/// the transform task fetches their markets and builds normalized events.
/// When the id input closes, the fetch task exits, which closes the internal
/// buffer, which ends the transform task and closes the output.
pub struct EventStream {
    cancel: CancellationToken,
    fetch_task: JoinHandle<()>,
    transform_task: JoinHandle<()>,
}

impl EventStream {
    pub fn spawn(
        new_ids: mpsc::Receiver<EventId>,
        event_src: Arc<dyn EventSource>,
        market_src: Arc<dyn MarketSource>,
        capacity: StreamCapacity,
    ) -> (Self, mpsc::Receiver<NormalizedEvent>) {
        let (fetched_tx, fetched_rx) = mpsc::channel(capacity.buffer.max(1));
        let (events_tx, events_rx) = mpsc::channel(capacity.output.max(1));
        let cancel = CancellationToken::new();

        let fetch_task = tokio::spawn(fetch_events(
            new_ids,
            event_src,
            fetched_tx,
            cancel.child_token(),
        ));
        let transform_task = tokio::spawn(transform_events(
            fetched_rx,
            market_src,
            events_tx,
            cancel.child_token(),
        ));

        (
            Self {
                cancel,
                fetch_task,
                transform_task,
            },
            events_rx,
        )
    }

    /// Stop both phases and close the output. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub async fn join(self) -> Result<()> {
        self.fetch_task.await.context("event fetch task failed")?;
        self.transform_task.await.context("event transform task failed")?;
        Ok(())
    }
}

/// Fetch phase: one source event per id. A failed fetch drops that id only.
async fn fetch_events(
    mut new_ids: mpsc::Receiver<EventId>,
    event_src: Arc<dyn EventSource>,
    fetched: mpsc::Sender<SourceEvent>,
    cancel: CancellationToken,
) {
    loop {
        let id = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            id = new_ids.recv() => match id {
                Some(id) => id,
                None => break,
            },
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = event_src.event_by_id(id) => result,
        };

        let event = match result {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event_id = id, "failed to source event: {:#}", e);
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = fetched.send(event) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("event fetch task stopped");
}

/// Transform phase: fetch markets, decode odds, emit normalized events.
/// Any failure drops the whole event.
async fn transform_events(
    mut fetched: mpsc::Receiver<SourceEvent>,
    market_src: Arc<dyn MarketSource>,
    events: mpsc::Sender<NormalizedEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = fetched.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let event_id = event.id;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = convert_event(event, market_src.as_ref()) => result,
        };

        let normalized = match result {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(event_id, "failed to convert event: {:#}", e);
                continue;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = events.send(normalized) => {
                if sent.is_err() {
                    tracing::info!("normalized event receiver dropped, stopping transform");
                    break;
                }
            }
        }
    }
    tracing::debug!("event transform task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::{MarketId, SourceMarket, SourceOption};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct Fixtures {
        events: HashMap<EventId, SourceEvent>,
        markets: HashMap<MarketId, SourceMarket>,
    }

    #[async_trait]
    impl EventSource for Fixtures {
        async fn event_by_id(&self, id: EventId) -> Result<SourceEvent> {
            self.events.get(&id).cloned().with_context(|| format!("no event {}", id))
        }
    }

    #[async_trait]
    impl MarketSource for Fixtures {
        async fn market_by_id(&self, id: MarketId) -> Result<SourceMarket> {
            self.markets.get(&id).cloned().with_context(|| format!("no market {}", id))
        }
    }

    fn fixtures() -> Arc<Fixtures> {
        let mut f = Fixtures::default();
        for (id, markets) in [(1, vec![101]), (2, vec![101, 102]), (3, vec![101]), (4, vec![103])] {
            f.events.insert(
                id,
                SourceEvent {
                    id,
                    name: format!("Event {}", id),
                    time: Utc.with_ymd_and_hms(2017, 8, 20, 15, 0, 0).unwrap(),
                    markets,
                },
            );
        }
        f.markets.insert(
            101,
            SourceMarket {
                id: "101".to_string(),
                market_type: "win-draw-win".to_string(),
                options: vec![SourceOption {
                    id: "10101".to_string(),
                    name: "Home".to_string(),
                    odds: "3/5".to_string(),
                }],
            },
        );
        f.markets.insert(
            103,
            SourceMarket {
                id: "103".to_string(),
                market_type: "win-draw-win".to_string(),
                options: vec![SourceOption {
                    id: "10301".to_string(),
                    name: "Home".to_string(),
                    odds: "x/5".to_string(),
                }],
            },
        );
        // 102 deliberately missing.
        Arc::new(f)
    }

    async fn collect(rx: &mut mpsc::Receiver<NormalizedEvent>) -> Vec<NormalizedEvent> {
        let mut out = Vec::new();
        while let Some(event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("stream did not close")
        {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_drops_failed_events_and_continues() {
        let src = fixtures();
        let (ids_tx, ids_rx) = mpsc::channel(8);
        let (stream, mut events) =
            EventStream::spawn(ids_rx, src.clone(), src, StreamCapacity::default());

        // 2: market 102 missing, 4: bad odds, 5: no such event.
        for id in [1, 2, 3, 4, 5] {
            ids_tx.send(id).await.unwrap();
        }
        drop(ids_tx);

        let ids: Vec<_> = collect(&mut events).await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
        stream.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_input_close_cascades_to_output() {
        let src = fixtures();
        let (ids_tx, ids_rx) = mpsc::channel(1);
        let (stream, mut events) =
            EventStream::spawn(ids_rx, src.clone(), src, StreamCapacity::default());
        drop(ids_tx);
        assert!(collect(&mut events).await.is_empty());
        stream.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_stops_stage_with_input_open() {
        let src = fixtures();
        let (ids_tx, ids_rx) = mpsc::channel(1);
        let (stream, mut events) =
            EventStream::spawn(ids_rx, src.clone(), src, StreamCapacity::default());

        ids_tx.send(1).await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap();
        assert_eq!(first.unwrap().id, "1");

        stream.close();
        tokio::time::timeout(Duration::from_secs(1), stream.join())
            .await
            .expect("stream did not stop")
            .unwrap();
        assert!(events.recv().await.is_none());
        // The id sender is still alive; the stage stopped on its own signal.
        drop(ids_tx);
    }
}
