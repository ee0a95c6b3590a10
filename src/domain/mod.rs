//! Core domain types and logic.

pub mod record;
pub mod bar;
pub mod aggregator;
pub mod indicator;
pub mod rule;
pub mod rule_eval;
pub mod trade;
pub mod execution;
pub mod strategy;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
