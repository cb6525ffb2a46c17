//! alloctrader: constant-allocation trend strategy engine and backtester.
//!
//! Hexagonal architecture: the decision engine and its state in [`domain`],
//! port traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
