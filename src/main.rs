use anyhow::Result;
use odds_pipeline::config::Config;
use odds_pipeline::feed::source::SourceClient;
use odds_pipeline::pipeline::{run_until_shutdown, EventStream, Feed, StreamCapacity};
use odds_pipeline::sink::rest::RestEventStore;
use odds_pipeline::sink::EventSink;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("odds_pipeline=info")),
        )
        .init();

    // Load saved addresses from .env (real env vars take precedence)
    Config::load_env_file();

    let mut config = Config::load_or_default(Path::new("config.toml"))?;
    config.apply_env();
    config.validate()?;

    let source = Arc::new(SourceClient::new(
        &config.source.base_url,
        config.source.request_timeout(),
    )?);
    let store = RestEventStore::new(&config.store.base_url, config.store.request_timeout())?;
    tracing::info!(url = %source.base_url(), "using feed");
    tracing::info!(url = %store.url(), "using store");

    let (feed, new_ids) = Feed::spawn(
        source.clone(),
        config.source.poll_interval(),
        config.pipeline.channel_capacity,
    );
    let (stream, events) = EventStream::spawn(
        new_ids,
        source.clone(),
        source,
        StreamCapacity {
            buffer: config.pipeline.transform_buffer,
            output: config.pipeline.channel_capacity,
        },
    );

    // Ctrl-C closes the feed; the closed channels shut the rest down in order.
    let sink = EventSink::new(events, store).process_all();
    let summary = run_until_shutdown(&feed, sink, tokio::signal::ctrl_c()).await;

    let cursor = feed.join().await?;
    stream.join().await?;
    tracing::info!(
        cursor = cursor.position(),
        delivered = summary.delivered,
        failed = summary.failed,
        "pipeline stopped"
    );
    Ok(())
}
