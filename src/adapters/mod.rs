//! Concrete adapter implementations for ports.

pub mod cached_price_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_rule_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
