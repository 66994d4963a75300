pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod metrics;
pub mod optimizer;
pub mod packs;
