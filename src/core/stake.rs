//! Stake balance lookups and the read gate built on them

use super::address::Address;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait StakeLookup: Send + Sync {
    async fn balance_of(&self, address: &Address) -> Result<u128>;
}

/// Read access is granted only when the stake balance is strictly above `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StakeGate {
    pub threshold: u128,
}

impl StakeGate {
    pub fn new(threshold: u128) -> Self {
        Self { threshold }
    }

    pub fn allows(&self, balance: u128) -> bool {
        balance > self.threshold
    }
}

/// Balance table held in process. Unknown addresses have zero stake.
#[derive(Default)]
pub struct StaticStakes {
    balances: RwLock<HashMap<Address, u128>>,
}

impl StaticStakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(balances: impl IntoIterator<Item = (Address, u128)>) -> Self {
        Self {
            balances: RwLock::new(balances.into_iter().collect()),
        }
    }

    pub async fn set_balance(&self, address: Address, balance: u128) {
        debug!(%address, %balance, "Setting static stake balance");
        self.balances.write().await.insert(address, balance);
    }
}

#[async_trait]
impl StakeLookup for StaticStakes {
    async fn balance_of(&self, address: &Address) -> Result<u128> {
        Ok(self
            .balances
            .read()
            .await
            .get(address)
            .copied()
            .unwrap_or(0))
    }
}
