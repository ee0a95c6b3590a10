//! nmltrader: bar aggregation, indicator DAG and rule-based strategy
//! evaluation for No-Man's-Land Bollinger strategies.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command line in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
