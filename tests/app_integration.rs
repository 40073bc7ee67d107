use rating_oracle::AppCommand;
use rating_oracle::core::address::Address;
use rating_oracle::core::config::{AppConfig, ConfigError};
use rating_oracle::core::rating::Scores;
use rating_oracle::core::stake::{StakeGate, StaticStakes};
use rating_oracle::store::{StoreError, WriteReceipt};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const OWNER: &str = "0x00000000000000000000000000000000000000a1";
const KEEPER: &str = "0x00000000000000000000000000000000000000b2";
const STAKED_USER: &str = "0x00000000000000000000000000000000000000c3";
const UNSTAKED_USER: &str = "0x00000000000000000000000000000000000000d4";

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Feed that serves `symbols` and answers every other symbol with no data.
    pub async fn create_feed_mock_server(symbols: &[(&str, f64, f64, f64)]) -> MockServer {
        let mock_server = MockServer::start().await;

        for (symbol, rating, technical, fundamental) in symbols {
            let body = format!(
                r#"{{"data": [{{"symbol": "{symbol}", "rating": {rating}, "technical_score": {technical}, "fundamental_score": {fundamental}}}]}}"#
            );
            Mock::given(method("GET"))
                .and(path("/ratings"))
                .and(query_param("symbol", *symbol))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&mock_server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/ratings"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": []}"#))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_stake_mock_server(address: &str, balance: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/stakes/{address}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!(r#"{{"balance": "{balance}"}}"#)),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"balance": "0"}"#))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn write_config(dir: &Path, feed_url: &str, stake_url: Option<&str>, symbols: &str) -> String {
    let stake_section = stake_url
        .map(|url| format!("stake:\n  base_url: \"{url}\"\n"))
        .unwrap_or_default();
    let config_content = format!(
        r#"
feed:
  base_url: "{feed_url}"
  api_key: "test-key"
  timeout_ms: 5000
store:
  path: "{store}"
  owner: "{OWNER}"
  keeper: "{KEEPER}"
{stake_section}
keeper:
  interval_ms: 1000
  symbols: [{symbols}]
"#,
        store = dir.join("store").display(),
    );

    let config_path = dir.join("config.yaml");
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_str().unwrap().to_string()
}

#[test_log::test(tokio::test)]
async fn test_cycle_isolates_failing_symbol() {
    let mock_server =
        test_utils::create_feed_mock_server(&[("A", 85.7, 82.3, 88.1), ("C", 75.6, 72.3, 77.1)])
            .await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &mock_server.uri(), None, "A, B, C");

    rating_oracle::run_command(
        AppCommand::SetKeeper {
            caller: addr(OWNER),
            keeper: addr(KEEPER),
        },
        Some(&config_path),
    )
    .await
    .expect("Owner should be able to set the keeper");

    let result = rating_oracle::run_command(AppCommand::Cycle, Some(&config_path)).await;
    assert!(result.is_ok(), "Cycle failed with: {:?}", result.err());

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let stakes = Arc::new(StaticStakes::with_balances([(addr(STAKED_USER), 10)]));
    let store = rating_oracle::open_store(
        &config.store_settings().unwrap(),
        stakes,
        StakeGate::default(),
    )
    .unwrap();

    assert_eq!(store.all_symbols().await, vec!["A", "C"]);
    let a = store.get_rating(&addr(STAKED_USER), "A").await.unwrap();
    assert_eq!(a.scores(), Scores::new(8570, 8230, 8810));
    let c = store.get_rating(&addr(STAKED_USER), "C").await.unwrap();
    assert_eq!(c.scores(), Scores::new(7560, 7230, 7710));
    assert!(matches!(
        store.get_rating(&addr(STAKED_USER), "B").await,
        Err(StoreError::NotFound { .. })
    ));
    info!(?a, ?c, "Store contents after cycle");
}

#[test_log::test(tokio::test)]
async fn test_reads_are_stake_gated() {
    let feed = test_utils::create_feed_mock_server(&[("ETH", 90.2, 89.5, 91.5)]).await;
    let stake = test_utils::create_stake_mock_server(STAKED_USER, "10").await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &feed.uri(), Some(&stake.uri()), "ETH");

    rating_oracle::run_command(
        AppCommand::SetKeeper {
            caller: addr(OWNER),
            keeper: addr(KEEPER),
        },
        Some(&config_path),
    )
    .await
    .unwrap();
    rating_oracle::run_command(AppCommand::Cycle, Some(&config_path))
        .await
        .unwrap();

    let result = rating_oracle::run_command(
        AppCommand::Get {
            caller: addr(STAKED_USER),
            symbol: "ETH".to_string(),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Staked read failed with: {:?}", result.err());

    let err = rating_oracle::run_command(
        AppCommand::Get {
            caller: addr(UNSTAKED_USER),
            symbol: "ETH".to_string(),
        },
        Some(&config_path),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::NoStake { .. })
    ));

    let err = rating_oracle::run_command(
        AppCommand::Get {
            caller: addr(UNSTAKED_USER),
            symbol: "NONEXISTENT".to_string(),
        },
        Some(&config_path),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::NoStake { .. })
    ));

    let err = rating_oracle::run_command(
        AppCommand::Get {
            caller: addr(STAKED_USER),
            symbol: "NONEXISTENT".to_string(),
        },
        Some(&config_path),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::NotFound { .. })
    ));
}

#[test_log::test(tokio::test)]
async fn test_only_owner_sets_keeper() {
    let feed = test_utils::create_feed_mock_server(&[]).await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &feed.uri(), None, "BTC");

    let err = rating_oracle::run_command(
        AppCommand::SetKeeper {
            caller: addr(KEEPER),
            keeper: addr(KEEPER),
        },
        Some(&config_path),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::Unauthorized { .. })
    ));

    // without an assigned keeper the cycle completes but writes nothing
    rating_oracle::run_command(AppCommand::Cycle, Some(&config_path))
        .await
        .unwrap();
    rating_oracle::run_command(AppCommand::Symbols, Some(&config_path))
        .await
        .unwrap();
}

#[test_log::test(tokio::test)]
async fn test_missing_api_key_aborts_startup() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = dir.path().join("config.yaml");
    fs::write(
        &config_path,
        format!(
            r#"
store:
  path: "{}"
  owner: "{OWNER}"
  keeper: "{KEEPER}"
"#,
            dir.path().join("store").display()
        ),
    )
    .unwrap();

    let err = rating_oracle::run_command(AppCommand::Cycle, config_path.to_str())
        .await
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::Missing {
            key: "feed.api_key",
            env: "TM_API_KEY"
        })
    );
}

#[test_log::test(tokio::test)]
async fn test_keeper_with_in_memory_store() {
    use rating_oracle::keeper::{Keeper, RatingSink, StoreSubmitter};
    use rating_oracle::providers::token_metrics::TokenMetricsProvider;
    use rating_oracle::store::RatingStore;
    use std::time::Duration;

    let feed = test_utils::create_feed_mock_server(&[("ETH", 90.2, 89.5, 91.5)]).await;
    let stakes = Arc::new(StaticStakes::new());
    stakes.set_balance(addr(STAKED_USER), 10).await;
    let store = Arc::new(RatingStore::new(addr(OWNER), stakes, StakeGate::default()));
    store.set_keeper(&addr(OWNER), addr(KEEPER)).await.unwrap();

    let provider =
        TokenMetricsProvider::new(&feed.uri(), "test-key", Duration::from_secs(5), 0).unwrap();
    let sink: Arc<dyn RatingSink> = Arc::new(StoreSubmitter::new(Arc::clone(&store), addr(KEEPER)));
    let keeper = Keeper::new(
        Arc::new(provider),
        sink,
        vec!["ETH".to_string()],
        Duration::from_secs(3600),
    );

    let report = keeper.run_cycle().await;
    assert!(report.is_complete());
    let receipts: Vec<&WriteReceipt> = report.updated.iter().collect();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].scores, Scores::new(9020, 8950, 9150));

    let rating = store.get_rating(&addr(STAKED_USER), "ETH").await.unwrap();
    assert_eq!(rating.symbol, "ETH");
    assert_eq!(rating.scores(), Scores::new(9020, 8950, 9150));
    assert!(matches!(
        store.get_rating(&addr(UNSTAKED_USER), "ETH").await,
        Err(StoreError::NoStake { .. })
    ));
    assert_eq!(store.all_symbols().await, vec!["ETH"]);
}

#[test_log::test(tokio::test)]
async fn test_commands_refuse_a_store_held_elsewhere() {
    let feed = test_utils::create_feed_mock_server(&[]).await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &feed.uri(), None, "BTC");

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let held = rating_oracle::open_store(
        &config.store_settings().unwrap(),
        Arc::new(StaticStakes::new()),
        StakeGate::default(),
    )
    .unwrap();

    let err = rating_oracle::run_command(
        AppCommand::SetKeeper {
            caller: addr(OWNER),
            keeper: addr(KEEPER),
        },
        Some(&config_path),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::Locked { .. })
    ));
    assert_eq!(held.keeper().await, None);

    drop(held);
    rating_oracle::run_command(
        AppCommand::SetKeeper {
            caller: addr(OWNER),
            keeper: addr(KEEPER),
        },
        Some(&config_path),
    )
    .await
    .unwrap();
}
