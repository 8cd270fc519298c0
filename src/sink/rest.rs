use super::EventStore;
use crate::model::NormalizedEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const EVENT_PATH: &str = "/event";

/// HTTP event store: `POST <base>/event` with the event as JSON.
pub struct RestEventStore {
    client: Client,
    url: String,
}

impl RestEventStore {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .context("failed to build store HTTP client")?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), EVENT_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventStore for RestEventStore {
    async fn create(&self, event: &NormalizedEvent) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context("event store request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("event store rejected event {} ({}): {}", event.id, status, body);
        }
        Ok(())
    }
}
