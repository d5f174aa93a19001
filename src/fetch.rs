//! Fetching the listing page.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::{HttpConfig, SourceConfig};

/// Where the raw listing document comes from.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable location, used in logs.
    fn describe(&self) -> &str;

    /// Fetch the document body as text.
    async fn fetch(&self) -> Result<String>;
}

/// `GET` of a fixed URL with a bounded request timeout.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(source: &SourceConfig, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.fetch_timeout_secs))
            .user_agent(http.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: source.url.clone(),
        })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    fn describe(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("GET {} returned {}", self.url, status);
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", self.url))
    }
}
