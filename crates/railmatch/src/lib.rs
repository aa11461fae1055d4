//! Rail freight marketplace: explainable offer/request matching and deal lifecycle tracking.

pub mod config;
pub mod error;
pub mod matching;
pub mod telemetry;
