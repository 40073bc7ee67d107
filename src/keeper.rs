//! Periodic synchronization of feed ratings into the store.

use crate::core::address::Address;
use crate::core::rating::{RatingProvider, Scores};
use crate::store::{RatingStore, WriteReceipt};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("failed to fetch rating for {symbol}: {cause:#}")]
    UpstreamFetch { symbol: String, cause: anyhow::Error },

    #[error("failed to submit rating for {symbol}: {cause:#}")]
    Submission { symbol: String, cause: anyhow::Error },
}

impl KeeperError {
    pub fn symbol(&self) -> &str {
        match self {
            KeeperError::UpstreamFetch { symbol, .. } | KeeperError::Submission { symbol, .. } => {
                symbol
            }
        }
    }
}

/// Destination for keeper writes. Resolves once the write is confirmed.
#[async_trait]
pub trait RatingSink: Send + Sync {
    async fn submit(&self, symbol: &str, scores: Scores) -> Result<WriteReceipt>;
}

/// Submits updates to a [`RatingStore`] as the keeper identity.
pub struct StoreSubmitter {
    store: Arc<RatingStore>,
    keeper: Address,
}

impl StoreSubmitter {
    pub fn new(store: Arc<RatingStore>, keeper: Address) -> Self {
        Self { store, keeper }
    }
}

#[async_trait]
impl RatingSink for StoreSubmitter {
    async fn submit(&self, symbol: &str, scores: Scores) -> Result<WriteReceipt> {
        Ok(self.store.update_rating(&self.keeper, symbol, scores).await?)
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub updated: Vec<WriteReceipt>,
    pub failed: Vec<KeeperError>,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub skipped_ticks: u64,
}

pub struct Keeper {
    provider: Arc<dyn RatingProvider>,
    sink: Arc<dyn RatingSink>,
    symbols: Vec<String>,
    interval: Duration,
}

impl Keeper {
    pub fn new(
        provider: Arc<dyn RatingProvider>,
        sink: Arc<dyn RatingSink>,
        symbols: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            sink,
            symbols,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn sync_symbol(&self, symbol: &str) -> Result<WriteReceipt, KeeperError> {
        let fetch_error = |cause| KeeperError::UpstreamFetch {
            symbol: symbol.to_string(),
            cause,
        };

        debug!(symbol, "Fetching rating");
        let feed = self
            .provider
            .fetch_latest(symbol)
            .await
            .map_err(fetch_error)?;
        if !feed.symbol.eq_ignore_ascii_case(symbol) {
            return Err(fetch_error(anyhow!(
                "Feed returned rating for {} instead of {}",
                feed.symbol,
                symbol
            )));
        }
        let scores = feed.to_scores().map_err(fetch_error)?;

        let submission_error = |cause| KeeperError::Submission {
            symbol: symbol.to_string(),
            cause,
        };
        let receipt = self
            .sink
            .submit(symbol, scores)
            .await
            .map_err(submission_error)?;
        if receipt.symbol != symbol || receipt.scores != scores {
            return Err(submission_error(anyhow!(
                "Write confirmation does not match submission (sequence {})",
                receipt.sequence
            )));
        }

        Ok(receipt)
    }

    /// Updates every configured symbol in order. A failing symbol is logged
    /// and recorded in the report; the remaining symbols are still processed.
    pub async fn run_cycle(&self) -> CycleReport {
        info!(symbols = self.symbols.len(), "Starting rating update cycle");
        let mut report = CycleReport::default();

        for symbol in &self.symbols {
            match self.sync_symbol(symbol).await {
                Ok(receipt) => {
                    info!(
                        symbol = %receipt.symbol,
                        rating = receipt.scores.rating,
                        technical = receipt.scores.technical,
                        fundamental = receipt.scores.fundamental,
                        sequence = receipt.sequence,
                        "Rating updated"
                    );
                    report.updated.push(receipt);
                }
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "Failed to update rating");
                    report.failed.push(err);
                }
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Rating update cycle completed"
        );
        report
    }

    /// Runs a cycle immediately and then once per interval until `cancel`
    /// fires. Cycles never overlap: ticks that fall inside a running cycle
    /// are skipped and the schedule resumes on the next interval boundary.
    pub async fn run(&self, cancel: CancellationToken) -> RunSummary {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Keeper started"
        );
        let mut summary = RunSummary::default();
        let mut next_tick = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(cycles = summary.cycles, "Keeper stopped");
                    break;
                }
                _ = sleep_until(next_tick) => {}
            }

            self.run_cycle().await;
            summary.cycles += 1;

            next_tick += self.interval;
            let now = Instant::now();
            if next_tick < now {
                let behind = (now - next_tick).as_nanos() / self.interval.as_nanos();
                let skipped = behind as u64 + 1;
                next_tick += self.interval * skipped as u32;
                summary.skipped_ticks += skipped;
                warn!(
                    skipped,
                    "Update cycle overran the interval, skipping missed ticks"
                );
            }
        }

        summary
    }
}
