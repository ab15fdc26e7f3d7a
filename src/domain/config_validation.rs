//! Configuration validation.
//!
//! Reads every section through `ConfigPort` and turns it into typed settings.
//! Any invalid value is a fatal `ConfigInvalid` before evaluation starts.

use crate::domain::batch::{RecomputeConfig, DEFAULT_MAX_WORKERS, DEFAULT_TIMEOUT_SECS};
use crate::domain::error::SignalwatchError;
use crate::domain::indicator::{bollinger, kdj, macd, rsi, IndicatorParams, DEFAULT_MA_PERIODS};
use crate::domain::watchlist::parse_instruments;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;
pub const DEFAULT_SQLITE_PATH: &str = "signalwatch.db";
pub const DEFAULT_POOL_SIZE: i64 = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Sqlite,
    Csv { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleSource {
    Sqlite,
    Json { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqliteSettings {
    pub path: PathBuf,
    pub pool_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

/// Everything a run needs, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub indicators: IndicatorParams,
    pub recompute: RecomputeConfig,
    /// `None` disables the price cache.
    pub cache_ttl: Option<Duration>,
    pub data_source: DataSource,
    pub rule_source: RuleSource,
    pub sqlite: SqliteSettings,
    pub watchlist: Vec<String>,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalwatchError> {
        Ok(Self {
            indicators: build_indicator_params(config)?,
            recompute: build_recompute_config(config)?,
            cache_ttl: build_cache_ttl(config)?,
            data_source: build_data_source(config)?,
            rule_source: build_rule_source(config)?,
            sqlite: build_sqlite_settings(config)?,
            watchlist: build_watchlist(config)?,
            logging: build_logging_settings(config)?,
        })
    }

    pub fn uses_sqlite(&self) -> bool {
        self.data_source == DataSource::Sqlite || self.rule_source == RuleSource::Sqlite
    }
}

pub fn build_indicator_params(
    config: &dyn ConfigPort,
) -> Result<IndicatorParams, SignalwatchError> {
    let ma_periods = match config.get_string("indicators", "ma_periods") {
        Some(raw) => parse_ma_periods(&raw)?,
        None => DEFAULT_MA_PERIODS.to_vec(),
    };

    let macd_fast = positive(config, "indicators", "macd_fast", macd::DEFAULT_FAST)?;
    let macd_slow = positive(config, "indicators", "macd_slow", macd::DEFAULT_SLOW)?;
    let macd_signal = positive(config, "indicators", "macd_signal", macd::DEFAULT_SIGNAL)?;
    if macd_slow <= macd_fast {
        return Err(invalid(
            "indicators",
            "macd_slow",
            "macd_slow must be greater than macd_fast",
        ));
    }

    let bollinger_k = config.get_double("indicators", "bollinger_k", bollinger::DEFAULT_K);
    if !bollinger_k.is_finite() || bollinger_k <= 0.0 {
        return Err(invalid(
            "indicators",
            "bollinger_k",
            "bollinger_k must be positive",
        ));
    }

    Ok(IndicatorParams {
        ma_periods,
        macd_fast,
        macd_slow,
        macd_signal,
        rsi_period: positive(config, "indicators", "rsi_period", rsi::DEFAULT_PERIOD)?,
        kdj_n: positive(config, "indicators", "kdj_n", kdj::DEFAULT_N)?,
        kdj_m1: positive(config, "indicators", "kdj_m1", kdj::DEFAULT_M1)?,
        kdj_m2: positive(config, "indicators", "kdj_m2", kdj::DEFAULT_M2)?,
        bollinger_period: positive(
            config,
            "indicators",
            "bollinger_period",
            bollinger::DEFAULT_PERIOD,
        )?,
        bollinger_k,
    })
}

fn parse_ma_periods(raw: &str) -> Result<Vec<usize>, SignalwatchError> {
    let mut periods = Vec::new();
    let mut seen = HashSet::new();
    for token in raw.split(',') {
        let period = token
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&p| p > 0)
            .ok_or_else(|| {
                invalid(
                    "indicators",
                    "ma_periods",
                    &format!("'{}' is not a positive period", token.trim()),
                )
            })?;
        if !seen.insert(period) {
            return Err(invalid(
                "indicators",
                "ma_periods",
                &format!("duplicate period {}", period),
            ));
        }
        periods.push(period);
    }
    Ok(periods)
}

pub fn build_recompute_config(
    config: &dyn ConfigPort,
) -> Result<RecomputeConfig, SignalwatchError> {
    let max_workers = positive(config, "recompute", "max_workers", DEFAULT_MAX_WORKERS)?;
    let timeout_secs = positive(
        config,
        "recompute",
        "timeout_secs",
        DEFAULT_TIMEOUT_SECS as usize,
    )?;
    Ok(RecomputeConfig {
        max_workers,
        instrument_timeout: Duration::from_secs(timeout_secs as u64),
    })
}

fn build_cache_ttl(config: &dyn ConfigPort) -> Result<Option<Duration>, SignalwatchError> {
    let secs = config.get_int("recompute", "cache_ttl_secs", DEFAULT_CACHE_TTL_SECS);
    if secs < 0 {
        return Err(invalid(
            "recompute",
            "cache_ttl_secs",
            "cache_ttl_secs must be non-negative",
        ));
    }
    Ok((secs > 0).then(|| Duration::from_secs(secs as u64)))
}

fn build_data_source(config: &dyn ConfigPort) -> Result<DataSource, SignalwatchError> {
    match source(config, "data").as_str() {
        "sqlite" => Ok(DataSource::Sqlite),
        "csv" => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(DataSource::Csv {
                dir: PathBuf::from(dir.trim()),
            }),
            _ => Err(SignalwatchError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            }),
        },
        other => Err(invalid(
            "data",
            "source",
            &format!("unknown data source '{}', expected sqlite or csv", other),
        )),
    }
}

fn build_rule_source(config: &dyn ConfigPort) -> Result<RuleSource, SignalwatchError> {
    match source(config, "rules").as_str() {
        "sqlite" => Ok(RuleSource::Sqlite),
        "json" => match config.get_string("rules", "path") {
            Some(path) if !path.trim().is_empty() => Ok(RuleSource::Json {
                path: PathBuf::from(path.trim()),
            }),
            _ => Err(SignalwatchError::ConfigMissing {
                section: "rules".to_string(),
                key: "path".to_string(),
            }),
        },
        other => Err(invalid(
            "rules",
            "source",
            &format!("unknown rule source '{}', expected sqlite or json", other),
        )),
    }
}

fn build_sqlite_settings(config: &dyn ConfigPort) -> Result<SqliteSettings, SignalwatchError> {
    let path = config
        .get_string("sqlite", "path")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string());
    let pool_size = config.get_int("sqlite", "pool_size", DEFAULT_POOL_SIZE);
    if !(1..=u32::MAX as i64).contains(&pool_size) {
        return Err(invalid(
            "sqlite",
            "pool_size",
            "pool_size must be at least 1",
        ));
    }
    Ok(SqliteSettings {
        path: PathBuf::from(path),
        pool_size: pool_size as u32,
    })
}

fn build_watchlist(config: &dyn ConfigPort) -> Result<Vec<String>, SignalwatchError> {
    match config.get_string("watchlist", "instruments") {
        Some(raw) if !raw.trim().is_empty() => parse_instruments(&raw)
            .map_err(|e| invalid("watchlist", "instruments", &e.to_string())),
        _ => Ok(Vec::new()),
    }
}

fn build_logging_settings(config: &dyn ConfigPort) -> Result<LoggingSettings, SignalwatchError> {
    let level = config
        .get_string("logging", "level")
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_else(|| "info".to_string());
    if !matches!(
        level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    ) {
        return Err(invalid(
            "logging",
            "level",
            &format!("unknown level '{}'", level),
        ));
    }

    let json = match config
        .get_string("logging", "format")
        .map(|f| f.trim().to_lowercase())
        .as_deref()
    {
        None | Some("text") => false,
        Some("json") => true,
        Some(other) => {
            return Err(invalid(
                "logging",
                "format",
                &format!("unknown format '{}', expected text or json", other),
            ))
        }
    };

    Ok(LoggingSettings { level, json })
}

fn source(config: &dyn ConfigPort, section: &str) -> String {
    config
        .get_string(section, "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "sqlite".to_string())
}

fn positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SignalwatchError> {
    let value = config.get_int(section, key, default as i64);
    if value < 1 {
        return Err(invalid(section, key, &format!("{} must be at least 1", key)));
    }
    Ok(value as usize)
}

fn invalid(section: &str, key: &str, reason: &str) -> SignalwatchError {
    SignalwatchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
