pub mod stake_api;
pub mod token_metrics;
pub mod util;
