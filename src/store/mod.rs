pub mod disk;
pub mod memory;

use crate::core::address::Address;
use crate::core::rating::{Rating, Scores};
use crate::core::stake::{StakeGate, StakeLookup};
use chrono::{DateTime, Utc};
use memory::MemoryBackend;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unauthorized: {caller} is not the {role}")]
    Unauthorized { role: Role, caller: Address },

    #[error("caller {caller} has no stake")]
    NoStake { caller: Address },

    #[error("rating not found for symbol: {symbol}")]
    NotFound { symbol: String },

    #[error("score out of range: {field} = {value}")]
    InvalidScore { field: &'static str, value: u32 },

    #[error("symbol must not be empty or padded with whitespace")]
    InvalidSymbol,

    #[error("stake lookup failed for {caller}: {reason}")]
    StakeLookup { caller: Address, reason: String },

    #[error("store is owned by {found}, not {expected}")]
    OwnerMismatch { expected: Address, found: Address },

    #[error("store at {path} is already open in another process")]
    Locked { path: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Keeper,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => f.write_str("owner"),
            Role::Keeper => f.write_str("keeper"),
        }
    }
}

/// Confirmation of an applied rating write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub symbol: String,
    /// Store-wide write counter, starting at 1.
    pub sequence: u64,
    /// True when the write created the record.
    pub created: bool,
    pub scores: Scores,
    pub recorded_at: DateTime<Utc>,
}

/// Everything a backend needs to restore a store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub owner: Option<Address>,
    pub keeper: Option<Address>,
    /// Records in registry order.
    pub ratings: Vec<Rating>,
    pub sequence: u64,
}

/// Durable home of the store state. Each method must apply atomically.
pub trait StateBackend: Send + Sync {
    fn load(&self) -> anyhow::Result<Snapshot>;

    fn claim_owner(&self, owner: &Address) -> anyhow::Result<()>;

    fn write_keeper(&self, keeper: &Address) -> anyhow::Result<()>;

    /// `registry_slot` is set when the symbol is new to the registry.
    fn write_rating(
        &self,
        rating: &Rating,
        registry_slot: Option<u64>,
        sequence: u64,
    ) -> anyhow::Result<()>;
}

#[derive(Default)]
struct StoreState {
    keeper: Option<Address>,
    ratings: HashMap<String, Rating>,
    symbols: Vec<String>,
    sequence: u64,
}

/// Keyed rating records with an owner-assigned keeper for writes and a
/// stake gate for reads.
pub struct RatingStore {
    owner: Address,
    state: RwLock<StoreState>,
    stakes: Arc<dyn StakeLookup>,
    gate: StakeGate,
    backend: Box<dyn StateBackend>,
}

impl RatingStore {
    /// Creates an empty store that keeps its state in memory only.
    pub fn new(owner: Address, stakes: Arc<dyn StakeLookup>, gate: StakeGate) -> Self {
        Self {
            owner,
            state: RwLock::new(StoreState::default()),
            stakes,
            gate,
            backend: Box::new(MemoryBackend),
        }
    }

    /// Opens a store on `backend`, restoring any state it already holds.
    pub fn open(
        owner: Address,
        stakes: Arc<dyn StakeLookup>,
        gate: StakeGate,
        backend: Box<dyn StateBackend>,
    ) -> Result<Self, StoreError> {
        let snapshot = backend.load().map_err(backend_error)?;

        match snapshot.owner {
            Some(found) if found != owner => {
                return Err(StoreError::OwnerMismatch {
                    expected: owner,
                    found,
                });
            }
            Some(_) => {}
            None => backend.claim_owner(&owner).map_err(backend_error)?,
        }

        let mut state = StoreState {
            keeper: snapshot.keeper,
            sequence: snapshot.sequence,
            ..StoreState::default()
        };
        for rating in snapshot.ratings {
            state.symbols.push(rating.symbol.clone());
            state.ratings.insert(rating.symbol.clone(), rating);
        }
        info!(
            %owner,
            symbols = state.symbols.len(),
            sequence = state.sequence,
            "Opened rating store"
        );

        Ok(Self {
            owner,
            state: RwLock::new(state),
            stakes,
            gate,
            backend,
        })
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub async fn keeper(&self) -> Option<Address> {
        self.state.read().await.keeper.clone()
    }

    /// Replaces the active keeper. Owner only.
    pub async fn set_keeper(&self, caller: &Address, new_keeper: Address) -> Result<(), StoreError> {
        if *caller != self.owner {
            return Err(StoreError::Unauthorized {
                role: Role::Owner,
                caller: caller.clone(),
            });
        }

        let mut state = self.state.write().await;
        self.backend
            .write_keeper(&new_keeper)
            .map_err(backend_error)?;
        info!(previous = ?state.keeper, keeper = %new_keeper, "Keeper rotated");
        state.keeper = Some(new_keeper);
        Ok(())
    }

    /// Creates or overwrites the record for `symbol`. Keeper only.
    pub async fn update_rating(
        &self,
        caller: &Address,
        symbol: &str,
        scores: Scores,
    ) -> Result<WriteReceipt, StoreError> {
        let mut state = self.state.write().await;

        if state.keeper.as_ref() != Some(caller) {
            return Err(StoreError::Unauthorized {
                role: Role::Keeper,
                caller: caller.clone(),
            });
        }
        if symbol.is_empty() || symbol.trim() != symbol {
            return Err(StoreError::InvalidSymbol);
        }
        if let Some((field, value)) = scores.out_of_range() {
            return Err(StoreError::InvalidScore { field, value });
        }

        let created = !state.ratings.contains_key(symbol);
        let registry_slot = created.then_some(state.symbols.len() as u64);
        let sequence = state.sequence + 1;
        let rating = Rating {
            symbol: symbol.to_string(),
            rating: scores.rating,
            technical: scores.technical,
            fundamental: scores.fundamental,
            last_updated: Utc::now(),
        };

        // persist first so a backend failure leaves memory untouched
        self.backend
            .write_rating(&rating, registry_slot, sequence)
            .map_err(backend_error)?;

        if created {
            state.symbols.push(rating.symbol.clone());
        }
        state.sequence = sequence;
        let receipt = WriteReceipt {
            symbol: rating.symbol.clone(),
            sequence,
            created,
            scores,
            recorded_at: rating.last_updated,
        };
        state.ratings.insert(rating.symbol.clone(), rating);

        debug!(symbol, sequence, created, "Rating stored");
        Ok(receipt)
    }

    /// Returns the record for `symbol` if `caller` passes the stake gate.
    pub async fn get_rating(&self, caller: &Address, symbol: &str) -> Result<Rating, StoreError> {
        let balance = self
            .stakes
            .balance_of(caller)
            .await
            .map_err(|e| StoreError::StakeLookup {
                caller: caller.clone(),
                reason: format!("{e:#}"),
            })?;
        if !self.gate.allows(balance) {
            return Err(StoreError::NoStake {
                caller: caller.clone(),
            });
        }

        self.state
            .read()
            .await
            .ratings
            .get(symbol)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    /// Every symbol that has been updated, in first-update order.
    pub async fn all_symbols(&self) -> Vec<String> {
        self.state.read().await.symbols.clone()
    }
}

fn backend_error(e: anyhow::Error) -> StoreError {
    StoreError::Backend(format!("{e:#}"))
}
