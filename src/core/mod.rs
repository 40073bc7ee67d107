//! Domain types shared by the store, the keeper and the command line

pub mod address;
pub mod config;
pub mod log;
pub mod rating;
pub mod stake;

// Re-export main types for cleaner imports
pub use address::Address;
pub use rating::{FeedRating, Rating, RatingProvider, Scores};
pub use stake::{StakeGate, StakeLookup, StaticStakes};
