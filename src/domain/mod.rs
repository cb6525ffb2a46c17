//! Core domain types and the decision engine.

pub mod bar;
pub mod history;
pub mod position;
pub mod portfolio;
pub mod signal;
pub mod strategy;
pub mod config_validation;
pub mod trend_filter;
pub mod sizing;
pub mod risk;
pub mod rebalance;
pub mod engine;
pub mod backtest;
pub mod metrics;
pub mod universe;
pub mod error;
