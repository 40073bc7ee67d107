//! Rating records and feed abstractions

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound of a fixed-point score (`100.00`).
pub const MAX_SCORE: u32 = 10_000;

/// Fixed-point scores with two implied decimal digits (`8570` is `85.70`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub rating: u32,
    pub technical: u32,
    pub fundamental: u32,
}

impl Scores {
    pub fn new(rating: u32, technical: u32, fundamental: u32) -> Self {
        Self {
            rating,
            technical,
            fundamental,
        }
    }

    /// Returns the name and value of the first score outside `[0, MAX_SCORE]`.
    pub fn out_of_range(&self) -> Option<(&'static str, u32)> {
        [
            ("rating", self.rating),
            ("technical", self.technical),
            ("fundamental", self.fundamental),
        ]
        .into_iter()
        .find(|(_, value)| *value > MAX_SCORE)
    }
}

/// The stored record for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub symbol: String,
    pub rating: u32,
    pub technical: u32,
    pub fundamental: u32,
    pub last_updated: DateTime<Utc>,
}

impl Rating {
    pub fn scores(&self) -> Scores {
        Scores::new(self.rating, self.technical, self.fundamental)
    }
}

/// The most recent rating tuple reported by the feed, on a 0-100 scale.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRating {
    pub symbol: String,
    pub rating: f64,
    pub technical_score: f64,
    pub fundamental_score: f64,
}

impl FeedRating {
    pub fn to_scores(&self) -> Result<Scores> {
        let convert = |name: &str, value: f64| {
            to_fixed_point(value).ok_or_else(|| {
                anyhow!(
                    "Feed value out of range for {}: {} = {}",
                    self.symbol,
                    name,
                    value
                )
            })
        };

        Ok(Scores {
            rating: convert("rating", self.rating)?,
            technical: convert("technical_score", self.technical_score)?,
            fundamental: convert("fundamental_score", self.fundamental_score)?,
        })
    }
}

/// Converts a 0-100 score to fixed point, rounding half away from zero.
pub fn to_fixed_point(value: f64) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * 100.0).round();
    if scaled < 0.0 || scaled > f64::from(MAX_SCORE) {
        return None;
    }
    Some(scaled as u32)
}

#[async_trait]
pub trait RatingProvider: Send + Sync {
    /// Fetches the single most recent rating for `symbol`.
    async fn fetch_latest(&self, symbol: &str) -> Result<FeedRating>;
}
