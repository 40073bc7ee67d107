use crate::core::address::Address;
use crate::core::stake::StakeLookup;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Value,
}

/// Reads stake balances from `GET {base_url}/stakes/{address}`.
///
/// The balance may be a JSON number or a decimal string.
pub struct HttpStakeLookup {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStakeLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("rating-oracle/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fractional amounts round up, which keeps `balance > threshold` exact
    /// for integer thresholds.
    fn parse_balance(value: &Value) -> Result<u128> {
        match value {
            Value::String(s) => {
                parse_decimal(s.trim()).ok_or_else(|| anyhow!("Invalid balance: {s}"))
            }
            Value::Number(n) => match n.as_u64() {
                Some(whole) => Ok(u128::from(whole)),
                None => n
                    .as_f64()
                    .and_then(ceil_amount)
                    .ok_or_else(|| anyhow!("Invalid balance: {n}")),
            },
            other => Err(anyhow!("Unexpected balance value: {other}")),
        }
    }
}

fn ceil_amount(value: f64) -> Option<u128> {
    (value.is_finite() && value >= 0.0).then(|| value.ceil() as u128)
}

/// Parses a non-negative decimal such as `"10"`, `"10.5"` or `"1e20"`.
fn parse_decimal(s: &str) -> Option<u128> {
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !whole.is_empty() && is_digits(whole) && is_digits(fraction) {
        let whole: u128 = whole.parse().ok()?;
        return if fraction.bytes().any(|b| b != b'0') {
            whole.checked_add(1)
        } else {
            Some(whole)
        };
    }
    s.parse::<f64>().ok().and_then(ceil_amount)
}

#[async_trait]
impl StakeLookup for HttpStakeLookup {
    async fn balance_of(&self, address: &Address) -> Result<u128> {
        let url = format!("{}/stakes/{}", self.base_url, address);
        debug!("Requesting stake balance from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Stake request failed for {address}"))?;

        let data: BalanceResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse stake response for {address}"))?;

        Self::parse_balance(&data.balance)
    }
}
