use super::types::*;
use super::{EventIdLister, EventSource, MarketSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

const EVENTS_PATH: &str = "/football/events";
const MARKETS_PATH: &str = "/football/markets";

/// HTTP client for the upstream football feed. One client serves id
/// discovery, event lookups and market lookups.
pub struct SourceClient {
    client: Client,
    base_url: String,
}

impl SourceClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .context("failed to build source HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn events_url(&self) -> String {
        format!("{}{}", self.base_url, EVENTS_PATH)
    }

    fn event_url(&self, id: EventId) -> String {
        format!("{}{}/{}", self.base_url, EVENTS_PATH, id)
    }

    fn market_url(&self, id: MarketId) -> String {
        format!("{}{}/{}", self.base_url, MARKETS_PATH, id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GET {} failed ({}): {}", url, status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("failed to parse response from {}", url))
    }
}

#[async_trait]
impl EventIdLister for SourceClient {
    async fn list_event_ids(&self) -> Result<Vec<EventId>> {
        self.get_json(&self.events_url()).await
    }
}

#[async_trait]
impl EventSource for SourceClient {
    async fn event_by_id(&self, id: EventId) -> Result<SourceEvent> {
        self.get_json(&self.event_url(id))
            .await
            .with_context(|| format!("failed to fetch event {}", id))
    }
}

#[async_trait]
impl MarketSource for SourceClient {
    async fn market_by_id(&self, id: MarketId) -> Result<SourceMarket> {
        self.get_json(&self.market_url(id))
            .await
            .with_context(|| format!("failed to fetch market {}", id))
    }
}
