pub mod ratings;
pub mod setup;
pub mod ui;
