pub mod cli;
pub mod core;
pub mod keeper;
pub mod providers;
pub mod store;

use crate::core::address::Address;
use crate::core::config::{AppConfig, KeeperSettings, StoreSettings};
use crate::core::stake::{StakeGate, StakeLookup, StaticStakes};
use crate::keeper::{Keeper, StoreSubmitter};
use crate::providers::{stake_api::HttpStakeLookup, token_metrics::TokenMetricsProvider};
use crate::store::{RatingStore, disk::DiskBackend};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub enum AppCommand {
    /// Run the keeper loop until interrupted
    Run,
    /// Run a single update cycle
    Cycle,
    SetKeeper { caller: Address, keeper: Address },
    Get { caller: Address, symbol: String },
    Symbols,
}

/// Opens the on-disk store described by `settings`.
pub fn open_store(
    settings: &StoreSettings,
    stakes: Arc<dyn StakeLookup>,
    gate: StakeGate,
) -> Result<RatingStore> {
    let backend = DiskBackend::open(&settings.path)?;
    Ok(RatingStore::open(
        settings.owner.clone(),
        stakes,
        gate,
        Box::new(backend),
    )?)
}

/// Wires the feed client and a store submitter into a keeper.
pub fn build_keeper(settings: &KeeperSettings, store: Arc<RatingStore>) -> Result<Keeper> {
    let provider = TokenMetricsProvider::new(
        &settings.feed_url,
        &settings.api_key,
        settings.timeout,
        settings.retries,
    )?;
    let sink = StoreSubmitter::new(store, settings.keeper.clone());

    Ok(Keeper::new(
        Arc::new(provider),
        Arc::new(sink),
        settings.symbols.clone(),
        settings.interval,
    ))
}

fn build_stakes(config: &AppConfig) -> Result<Arc<dyn StakeLookup>> {
    match &config.stake.base_url {
        Some(base_url) => Ok(Arc::new(HttpStakeLookup::new(
            base_url,
            config.request_timeout()?,
        )?)),
        None => {
            debug!("No stake API configured, every caller has zero stake");
            Ok(Arc::new(StaticStakes::new()))
        }
    }
}

fn open_configured_store(config: &AppConfig) -> Result<RatingStore> {
    open_store(
        &config.store_settings()?,
        build_stakes(config)?,
        StakeGate::new(config.stake.threshold.into()),
    )
}

async fn start_keeper(config: &AppConfig) -> Result<(Arc<RatingStore>, Keeper)> {
    let settings = config.keeper_settings()?;
    let store = Arc::new(open_configured_store(config)?);

    if store.keeper().await.as_ref() != Some(&settings.keeper) {
        warn!(
            keeper = %settings.keeper,
            "Configured keeper is not the active keeper of the store, updates will be rejected"
        );
    }

    let keeper = build_keeper(&settings, Arc::clone(&store))?;
    Ok((store, keeper))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Run => {
            let (_store, keeper) = start_keeper(&config).await?;
            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Interrupt received, stopping after the current cycle");
                        cancel.cancel();
                    }
                }
            });
            let summary = keeper.run(cancel).await;
            info!(
                cycles = summary.cycles,
                skipped_ticks = summary.skipped_ticks,
                "Keeper finished"
            );
        }
        AppCommand::Cycle => {
            let (_store, keeper) = start_keeper(&config).await?;
            let report = keeper.run_cycle().await;
            println!("{}", cli::ratings::cycle_report(&report));
        }
        AppCommand::SetKeeper { caller, keeper } => {
            let store = open_configured_store(&config)?;
            store.set_keeper(&caller, keeper.clone()).await?;
            println!("Keeper set to {keeper}");
        }
        AppCommand::Get { caller, symbol } => {
            let store = open_configured_store(&config)?;
            let rating = store.get_rating(&caller, &symbol).await?;
            println!("{}", cli::ratings::rating_table(&rating));
        }
        AppCommand::Symbols => {
            let store = open_configured_store(&config)?;
            println!("{}", cli::ratings::symbols_list(&store.all_symbols().await));
        }
    }

    Ok(())
}
