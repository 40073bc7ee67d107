use super::util::with_retry;
use crate::core::rating::{FeedRating, RatingProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct RatingsResponse {
    #[serde(default)]
    data: Vec<RatingItem>,
}

#[derive(Debug, Deserialize)]
struct RatingItem {
    symbol: String,
    rating: Option<f64>,
    technical_score: Option<f64>,
    fundamental_score: Option<f64>,
}

/// Client for the Token Metrics ratings endpoint.
pub struct TokenMetricsProvider {
    base_url: String,
    api_key: String,
    retries: usize,
    client: reqwest::Client,
}

impl TokenMetricsProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration, retries: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("rating-oracle/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retries,
            client,
        })
    }
}

#[async_trait]
impl RatingProvider for TokenMetricsProvider {
    #[instrument(name = "RatingFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_latest(&self, symbol: &str) -> Result<FeedRating> {
        let url = Url::parse_with_params(
            &format!("{}/ratings", self.base_url),
            &[("symbol", symbol), ("limit", "1")],
        )
        .with_context(|| format!("Invalid feed URL: {}", self.base_url))?;
        debug!("Requesting rating from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(url.clone())
                    .header("accept", "application/json")
                    .header("api_key", &self.api_key)
                    .send()
                    .await?
                    .error_for_status()
            },
            self.retries,
            RETRY_DELAY,
        )
        .await
        .with_context(|| format!("Rating request failed for {symbol}"))?;

        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;

        let parsed: RatingsResponse = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse ratings response"
                );
                return Err(e).context("Failed to parse ratings response");
            }
        };

        let item = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rating data found for {}", symbol))?;

        let score = |name: &str, value: Option<f64>| {
            value.ok_or_else(|| anyhow!("Missing {} in rating data for {}", name, symbol))
        };

        Ok(FeedRating {
            rating: score("rating", item.rating)?,
            technical_score: score("technical_score", item.technical_score)?,
            fundamental_score: score("fundamental_score", item.fundamental_score)?,
            symbol: item.symbol,
        })
    }
}
