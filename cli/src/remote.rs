use anyhow::{Context, Result, bail};

use quotebook_core::models::Quote;
use quotebook_core::remote::{RemoteQuotes, RemoteRecord, record_to_quote};

/// reqwest-backed remote endpoint used for both fetch (GET) and push (POST).
pub struct HttpRemote {
    client: reqwest::Client,
    url: String,
}

impl HttpRemote {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "quotebook-cli/{} (quote manager)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteQuotes for HttpRemote {
    async fn fetch(&self) -> Result<Vec<Quote>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("server responded with {status}");
        }

        let records: Vec<RemoteRecord> = resp
            .json()
            .await
            .context("Failed to parse server quotes")?;

        let fetched_at = chrono::Utc::now().timestamp_millis();
        Ok(records
            .into_iter()
            .filter_map(|r| record_to_quote(r, fetched_at))
            .collect())
    }

    async fn push(&self, quote: &Quote) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(quote)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("server responded with {status}");
        }
        Ok(())
    }
}
