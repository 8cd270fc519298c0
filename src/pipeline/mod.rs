//! The three-stage pipeline: discovery -> fetch/transform -> (sink).
//!
//! Stages are linked by bounded mpsc channels. Each stage owns a
//! `CancellationToken`; closing a stage closes its output, and the closed
//! channel ends the next stage downstream.

pub mod convert;
pub mod poller;
pub mod stream;

pub use poller::{DiscoveryCursor, Feed};
pub use stream::{EventStream, StreamCapacity};

use crate::sink::SinkSummary;
use std::future::Future;

/// Run the sink until it drains. When `shutdown` resolves `Ok` the feed is
/// closed and the sink drains whatever is already in flight. If the
/// shutdown listener itself fails, the pipeline keeps running.
pub async fn run_until_shutdown<S, F>(feed: &Feed, sink: S, shutdown: F) -> SinkSummary
where
    S: Future<Output = SinkSummary>,
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(sink);
    tokio::select! {
        summary = &mut sink => summary,
        signal = shutdown => {
            match signal {
                Ok(()) => {
                    tracing::info!("shutdown requested, closing feed");
                    feed.close();
                }
                Err(e) => {
                    tracing::warn!(
                        "failed to listen for shutdown, running until input closes: {:#}",
                        e
                    );
                }
            }
            sink.await
        }
    }
}
