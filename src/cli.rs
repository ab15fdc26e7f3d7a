//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::cached_price_adapter::CachedPriceHistory;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_rule_adapter::JsonRuleAdapter;
#[cfg(feature = "sqlite")]
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::batch::{CancelFlag, RecomputeCoordinator};
use crate::domain::config_validation::{build_indicator_params, DataSource, RuleSource, Settings};
use crate::domain::engine::RuleEngine;
use crate::domain::error::SignalwatchError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::rule::RuleType;
use crate::domain::rule_parser::compile_rule;
use crate::domain::watchlist::parse_instruments;
use crate::logging::init_logging;
use crate::ports::price_port::PriceHistoryPort;
use crate::ports::rule_port::RuleStorePort;
use crate::ports::signal_port::SignalStorePort;

#[derive(Parser, Debug)]
#[command(name = "signalwatch", about = "Technical indicator trading signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recompute and store the latest signal for every watched instrument
    Recompute {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma separated instruments, overriding the configured watchlist
        #[arg(long)]
        instruments: Option<String>,
    },
    /// Evaluate one instrument and print its signal as JSON
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: String,
        /// Only evaluate buy or sell rules
        #[arg(long)]
        rule_type: Option<RuleType>,
        /// Use this price instead of the latest close
        #[arg(long)]
        price: Option<f64>,
    },
    /// Compile every rule in a JSON rule file
    Validate {
        #[arg(short, long)]
        rules: PathBuf,
        /// Config whose [indicators] section the rules are checked against
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Insert the built-in rule set into the SQLite rule store
    SeedRules {
        #[arg(short, long)]
        config: PathBuf,
        /// Replace existing rules with the same ids
        #[arg(long)]
        force: bool,
    },
    /// Load `<instrument>.csv` price files into SQLite and watch them
    ImportCsv {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn execute(command: Command) -> Result<(), SignalwatchError> {
    match command {
        Command::Recompute {
            config,
            instruments,
        } => run_recompute(&config, instruments.as_deref()),
        Command::Evaluate {
            config,
            instrument,
            rule_type,
            price,
        } => run_evaluate(&config, &instrument, rule_type, price),
        Command::Validate { rules, config } => run_validate(&rules, config.as_deref()),
        Command::SeedRules { config, force } => run_seed_rules(&config, force),
        Command::ImportCsv { config, dir } => run_import_csv(&config, &dir),
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, SignalwatchError> {
    let config = FileConfigAdapter::from_file(path)?;
    let settings = Settings::from_config(&config)?;
    init_logging(&settings.logging)?;
    Ok(settings)
}

/// Ports wired from validated settings.
struct Backends {
    prices: Arc<dyn PriceHistoryPort>,
    rules: Arc<dyn RuleStorePort>,
    signals: Option<Arc<dyn SignalStorePort>>,
    csv: Option<Arc<CsvAdapter>>,
    #[cfg(feature = "sqlite")]
    store: Option<Arc<SqliteAdapter>>,
}

impl Backends {
    /// Opens SQLite only when a port needs it or signals are to be persisted.
    fn open(settings: &Settings, persist: bool) -> Result<Self, SignalwatchError> {
        #[cfg(feature = "sqlite")]
        let store = if persist || settings.uses_sqlite() {
            Some(open_store(settings)?)
        } else {
            None
        };

        let csv = match &settings.data_source {
            DataSource::Csv { dir } => Some(Arc::new(CsvAdapter::new(dir.clone()))),
            DataSource::Sqlite => None,
        };

        let raw_prices: Arc<dyn PriceHistoryPort> = match &csv {
            Some(csv) => csv.clone(),
            #[cfg(feature = "sqlite")]
            None => require_store(&store)?,
            #[cfg(not(feature = "sqlite"))]
            None => return Err(sqlite_disabled()),
        };
        let prices: Arc<dyn PriceHistoryPort> = match settings.cache_ttl {
            Some(ttl) => Arc::new(CachedPriceHistory::new(raw_prices, ttl)),
            None => raw_prices,
        };

        let rules: Arc<dyn RuleStorePort> = match &settings.rule_source {
            RuleSource::Json { path } => Arc::new(JsonRuleAdapter::new(path.clone())),
            #[cfg(feature = "sqlite")]
            RuleSource::Sqlite => require_store(&store)?,
            #[cfg(not(feature = "sqlite"))]
            RuleSource::Sqlite => return Err(sqlite_disabled()),
        };

        #[cfg(feature = "sqlite")]
        let signals = store.clone().map(|s| s as Arc<dyn SignalStorePort>);
        #[cfg(not(feature = "sqlite"))]
        let signals = {
            let _ = persist;
            None
        };

        Ok(Self {
            prices,
            rules,
            signals,
            csv,
            #[cfg(feature = "sqlite")]
            store,
        })
    }

    /// Configured watchlist, else the SQLite watchlist, else every CSV file.
    fn default_instruments(&self, settings: &Settings) -> Result<Vec<String>, SignalwatchError> {
        if !settings.watchlist.is_empty() {
            return Ok(settings.watchlist.clone());
        }
        #[cfg(feature = "sqlite")]
        if let Some(store) = &self.store {
            let watched = store.list_watchlist()?;
            if !watched.is_empty() {
                return Ok(watched);
            }
        }
        match &self.csv {
            Some(csv) => csv.list_instruments(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_store(settings: &Settings) -> Result<Arc<SqliteAdapter>, SignalwatchError> {
    let store = SqliteAdapter::from_settings(&settings.sqlite)?;
    store.initialize_schema()?;
    Ok(Arc::new(store))
}

#[cfg(feature = "sqlite")]
fn require_store(
    store: &Option<Arc<SqliteAdapter>>,
) -> Result<Arc<SqliteAdapter>, SignalwatchError> {
    store.clone().ok_or_else(|| SignalwatchError::Database {
        reason: "sqlite store was not opened".to_string(),
    })
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_disabled() -> SignalwatchError {
    SignalwatchError::Database {
        reason: "built without the sqlite feature".to_string(),
    }
}

fn run_recompute(config_path: &Path, instruments: Option<&str>) -> Result<(), SignalwatchError> {
    let settings = load_settings(config_path)?;
    let backends = Backends::open(&settings, true)?;

    let instruments = match instruments {
        Some(raw) => parse_instruments(raw).map_err(|e| SignalwatchError::ConfigInvalid {
            section: "cli".to_string(),
            key: "instruments".to_string(),
            reason: e.to_string(),
        })?,
        None => backends.default_instruments(&settings)?,
    };
    if instruments.is_empty() {
        warn!("no instruments to recompute");
    }

    let signals = backends
        .signals
        .clone()
        .ok_or_else(|| SignalwatchError::Database {
            reason: "signals are persisted to SQLite, which is not available".to_string(),
        })?;
    let coordinator = RecomputeCoordinator::new(
        Arc::clone(&backends.prices),
        Arc::clone(&backends.rules),
        signals,
        settings.indicators.clone(),
        settings.recompute.clone(),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let summary = runtime.block_on(async {
        let cancel = CancelFlag::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, waiting for running instruments");
                on_interrupt.cancel();
            }
        });
        coordinator.recompute_all(&instruments, &cancel).await
    })?;

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn run_evaluate(
    config_path: &Path,
    instrument: &str,
    rule_type: Option<RuleType>,
    price: Option<f64>,
) -> Result<(), SignalwatchError> {
    let settings = load_settings(config_path)?;
    let backends = Backends::open(&settings, false)?;

    let definitions = backends.rules.get_enabled_rules(rule_type)?;
    let engine = RuleEngine::new(&definitions, settings.indicators.clone());
    let bars = backends.prices.get_price_series(instrument)?;

    let signal = match rule_type {
        Some(rule_type) => engine.evaluate(instrument, &bars, rule_type, price)?,
        None => engine.evaluate_all(instrument, &bars, price)?,
    };
    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(())
}

fn run_validate(rules_path: &Path, config_path: Option<&Path>) -> Result<(), SignalwatchError> {
    let params = match config_path {
        Some(path) => build_indicator_params(&FileConfigAdapter::from_file(path)?)?,
        None => IndicatorParams::default(),
    };

    eprintln!("Validating rules: {}", rules_path.display());
    let definitions = JsonRuleAdapter::new(rules_path.to_path_buf()).load_all()?;

    let mut failed = 0;
    for definition in &definitions {
        match compile_rule(definition, &params) {
            Ok(rule) => {
                let state = if rule.enabled { "" } else { " (disabled)" };
                eprintln!(
                    "\n#{} {} [{}, priority {}]{}",
                    rule.id, rule.name, rule.rule_type, rule.priority, state
                );
                for condition in &rule.conditions {
                    eprintln!("  {}", condition);
                }
            }
            Err(e) => {
                eprintln!("\nerror: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(SignalwatchError::RuleInvalid {
            reason: format!("{} of {} rules failed to compile", failed, definitions.len()),
        });
    }
    eprintln!("\n{} rules are valid.", definitions.len());
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_seed_rules(config_path: &Path, force: bool) -> Result<(), SignalwatchError> {
    use crate::domain::default_rules::default_rules;

    let settings = load_settings(config_path)?;
    let store = open_store(&settings)?;

    let existing = store.count_rules()?;
    if existing > 0 && !force {
        warn!(existing, "rule store is not empty, use --force to overwrite");
        eprintln!("Rule store already has {} rules; nothing seeded.", existing);
        return Ok(());
    }

    let rules = default_rules();
    for rule in &rules {
        store.insert_rule(rule)?;
    }
    info!(count = rules.len(), "seeded default rules");
    eprintln!("Seeded {} rules into {}", rules.len(), settings.sqlite.path.display());
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_seed_rules(_config_path: &Path, _force: bool) -> Result<(), SignalwatchError> {
    Err(sqlite_disabled())
}

#[cfg(feature = "sqlite")]
fn run_import_csv(config_path: &Path, dir: &Path) -> Result<(), SignalwatchError> {
    let settings = load_settings(config_path)?;
    let store = open_store(&settings)?;
    let csv = CsvAdapter::new(dir.to_path_buf());

    let instruments = csv.list_instruments()?;
    for instrument in &instruments {
        let bars = csv.get_price_series(instrument)?;
        store.insert_bars(instrument, &bars)?;
        store.add_to_watchlist(instrument)?;
        info!(instrument = %instrument, bars = bars.len(), "imported");
    }
    eprintln!("Imported {} instruments from {}", instruments.len(), dir.display());
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import_csv(_config_path: &Path, _dir: &Path) -> Result<(), SignalwatchError> {
    Err(sqlite_disabled())
}
