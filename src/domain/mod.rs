//! Core domain types and logic.

pub mod batch;
pub mod config_validation;
pub mod default_rules;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod price;
pub mod rule;
pub mod rule_definition;
pub mod rule_eval;
pub mod rule_parser;
pub mod signal;
pub mod watchlist;
