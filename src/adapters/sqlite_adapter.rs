//! SQLite storage adapter.
//!
//! One database holds price bars, rule definitions, computed signals and the
//! watchlist. Rule conditions and price configs are stored as JSON text.

use crate::domain::config_validation::SqliteSettings;
use crate::domain::error::SignalwatchError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::rule::RuleType;
use crate::domain::rule_definition::RuleDefinition;
use crate::domain::signal::{Signal, SignalType};
use crate::ports::price_port::PriceHistoryPort;
use crate::ports::rule_port::RuleStorePort;
use crate::ports::signal_port::SignalStorePort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_settings(settings: &SqliteSettings) -> Result<Self, SignalwatchError> {
        let manager = SqliteConnectionManager::file(&settings.path);
        let pool = Pool::builder()
            .max_size(settings.pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| SignalwatchError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, SignalwatchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| SignalwatchError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, SignalwatchError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| SignalwatchError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), SignalwatchError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ohlcv (
                instrument_id TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                PRIMARY KEY (instrument_id, date)
            );
            CREATE TABLE IF NOT EXISTS trading_rules (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                rule_type TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                priority INTEGER NOT NULL DEFAULT 0,
                strength INTEGER NOT NULL DEFAULT 3,
                conditions TEXT NOT NULL,
                price_config TEXT NOT NULL,
                description_template TEXT
            );
            CREATE TABLE IF NOT EXISTS signals (
                instrument_id TEXT NOT NULL,
                signal_date TEXT NOT NULL,
                signal_type TEXT NOT NULL,
                current_price REAL NOT NULL,
                entry_price REAL,
                stop_loss REAL,
                take_profit REAL,
                strength INTEGER,
                triggers TEXT NOT NULL,
                indicators TEXT NOT NULL,
                source_rule_id INTEGER,
                rule_name TEXT,
                message TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (instrument_id, signal_date)
            );
            CREATE TABLE IF NOT EXISTS watchlist (
                instrument_id TEXT PRIMARY KEY,
                added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_rules_type_priority
                ON trading_rules(rule_type, priority);
            CREATE INDEX IF NOT EXISTS idx_signals_date ON signals(signal_date);",
        )
        .map_err(|e: rusqlite::Error| SignalwatchError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    pub fn insert_bars(
        &self,
        instrument_id: &str,
        bars: &[PriceBar],
    ) -> Result<(), SignalwatchError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (instrument_id, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    instrument_id,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(())
    }

    /// Inserts or replaces the definition with the same id.
    pub fn insert_rule(&self, rule: &RuleDefinition) -> Result<(), SignalwatchError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO trading_rules
                (id, name, rule_type, enabled, priority, strength, conditions, price_config,
                 description_template)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rule.id,
                rule.name,
                rule.rule_type.as_str(),
                rule.enabled,
                rule.priority,
                rule.strength,
                serde_json::to_string(&rule.conditions)?,
                serde_json::to_string(&rule.price_config)?,
                rule.description_template,
            ],
        )
        .map_err(query_error)?;
        Ok(())
    }

    pub fn count_rules(&self) -> Result<usize, SignalwatchError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM trading_rules", [], |row| row.get(0))
            .map_err(query_error)?;
        Ok(count as usize)
    }

    pub fn get_signal(
        &self,
        instrument_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Signal>, SignalwatchError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT instrument_id, signal_date, signal_type, current_price, entry_price,
                        stop_loss, take_profit, strength, triggers, indicators,
                        source_rule_id, rule_name, message
                 FROM signals WHERE instrument_id = ?1 AND signal_date = ?2",
                params![instrument_id, date.format(DATE_FORMAT).to_string()],
                |row| {
                    Ok(SignalRow {
                        instrument_id: row.get(0)?,
                        signal_date: row.get(1)?,
                        signal_type: row.get(2)?,
                        current_price: row.get(3)?,
                        entry_price: row.get(4)?,
                        stop_loss: row.get(5)?,
                        take_profit: row.get(6)?,
                        strength: row.get(7)?,
                        triggers: row.get(8)?,
                        indicators: row.get(9)?,
                        source_rule_id: row.get(10)?,
                        rule_name: row.get(11)?,
                        message: row.get(12)?,
                    })
                },
            )
            .optional()
            .map_err(query_error)?;

        row.map(SignalRow::into_signal).transpose()
    }

    pub fn add_to_watchlist(&self, instrument_id: &str) -> Result<(), SignalwatchError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO watchlist (instrument_id) VALUES (?1)",
            params![instrument_id],
        )
        .map_err(query_error)?;
        Ok(())
    }

    pub fn list_watchlist(&self) -> Result<Vec<String>, SignalwatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT instrument_id FROM watchlist ORDER BY instrument_id")
            .map_err(query_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_error)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(query_error)
    }
}

impl PriceHistoryPort for SqliteAdapter {
    fn get_price_series(&self, instrument_id: &str) -> Result<Vec<PriceBar>, SignalwatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume
                 FROM ohlcv
                 WHERE instrument_id = ?1
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![instrument_id], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(PriceBar {
                    date,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }
}

impl RuleStorePort for SqliteAdapter {
    fn get_enabled_rules(
        &self,
        rule_type: Option<RuleType>,
    ) -> Result<Vec<RuleDefinition>, SignalwatchError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, rule_type, enabled, priority, strength, conditions,
                        price_config, description_template
                 FROM trading_rules
                 WHERE enabled = 1 AND (?1 IS NULL OR rule_type = ?1)
                 ORDER BY priority DESC, id ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![rule_type.map(|t| t.as_str())], |row| {
                Ok(RuleRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    rule_type: row.get(2)?,
                    enabled: row.get(3)?,
                    priority: row.get(4)?,
                    strength: row.get(5)?,
                    conditions: row.get(6)?,
                    price_config: row.get(7)?,
                    description_template: row.get(8)?,
                })
            })
            .map_err(query_error)?;

        let mut rules = Vec::new();
        for row in rows {
            let row = row.map_err(query_error)?;
            let id = row.id;
            match row.into_definition() {
                Ok(rule) => rules.push(rule),
                Err(e) => warn!(rule_id = id, error = %e, "skipping malformed stored rule"),
            }
        }
        Ok(rules)
    }
}

impl SignalStorePort for SqliteAdapter {
    fn upsert_signal(
        &self,
        instrument_id: &str,
        date: NaiveDate,
        signal: &Signal,
    ) -> Result<(), SignalwatchError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals
                (instrument_id, signal_date, signal_type, current_price, entry_price, stop_loss,
                 take_profit, strength, triggers, indicators, source_rule_id, rule_name, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(instrument_id, signal_date) DO UPDATE SET
                signal_type = excluded.signal_type,
                current_price = excluded.current_price,
                entry_price = excluded.entry_price,
                stop_loss = excluded.stop_loss,
                take_profit = excluded.take_profit,
                strength = excluded.strength,
                triggers = excluded.triggers,
                indicators = excluded.indicators,
                source_rule_id = excluded.source_rule_id,
                rule_name = excluded.rule_name,
                message = excluded.message,
                updated_at = CURRENT_TIMESTAMP",
            params![
                instrument_id,
                date.format(DATE_FORMAT).to_string(),
                signal.signal_type.as_str(),
                signal.current_price,
                signal.entry_price,
                signal.stop_loss,
                signal.take_profit,
                signal.strength,
                serde_json::to_string(&signal.triggers)?,
                serde_json::to_string(&signal.indicators)?,
                signal.source_rule_id,
                signal.rule_name,
                signal.message,
            ],
        )
        .map_err(query_error)?;
        Ok(())
    }
}

fn query_error(e: rusqlite::Error) -> SignalwatchError {
    SignalwatchError::DatabaseQuery {
        reason: e.to_string(),
    }
}

struct RuleRow {
    id: i64,
    name: String,
    rule_type: String,
    enabled: bool,
    priority: i64,
    strength: i64,
    conditions: String,
    price_config: String,
    description_template: Option<String>,
}

impl RuleRow {
    fn into_definition(self) -> Result<RuleDefinition, SignalwatchError> {
        let rule_type = self
            .rule_type
            .parse::<RuleType>()
            .map_err(|reason| SignalwatchError::RuleInvalid {
                reason: format!("rule {}: {}", self.id, reason),
            })?;
        Ok(RuleDefinition {
            id: self.id,
            name: self.name,
            rule_type,
            enabled: self.enabled,
            priority: self.priority,
            strength: self.strength,
            conditions: serde_json::from_str(&self.conditions)?,
            price_config: serde_json::from_str(&self.price_config)?,
            description_template: self.description_template,
        })
    }
}

struct SignalRow {
    instrument_id: String,
    signal_date: String,
    signal_type: String,
    current_price: f64,
    entry_price: Option<f64>,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    strength: Option<u8>,
    triggers: String,
    indicators: String,
    source_rule_id: Option<i64>,
    rule_name: Option<String>,
    message: String,
}

impl SignalRow {
    fn into_signal(self) -> Result<Signal, SignalwatchError> {
        let date = NaiveDate::parse_from_str(&self.signal_date, DATE_FORMAT).map_err(
            |e: chrono::ParseError| SignalwatchError::DatabaseQuery {
                reason: format!("invalid signal_date '{}': {}", self.signal_date, e),
            },
        )?;
        let signal_type = self
            .signal_type
            .parse::<SignalType>()
            .map_err(|reason| SignalwatchError::DatabaseQuery { reason })?;
        Ok(Signal {
            instrument_id: self.instrument_id,
            date,
            signal_type,
            current_price: self.current_price,
            entry_price: self.entry_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            strength: self.strength,
            triggers: serde_json::from_str(&self.triggers)?,
            indicators: serde_json::from_str(&self.indicators)?,
            source_rule_id: self.source_rule_id,
            rule_name: self.rule_name,
            message: self.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_rules::default_rules;
    use serde_json::json;

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    fn signal(date: NaiveDate, signal_type: SignalType, message: &str) -> Signal {
        Signal {
            instrument_id: "600519".into(),
            date,
            signal_type,
            current_price: 10.0,
            entry_price: Some(9.8),
            stop_loss: Some(9.31),
            take_profit: None,
            strength: Some(3),
            triggers: vec!["MA.MA5 cross_above MA.MA20".into()],
            indicators: json!({"MA": {"MA5": 10.1}}),
            source_rule_id: Some(1),
            rule_name: Some("MA golden cross".into()),
            message: message.into(),
        }
    }

    #[test]
    fn in_memory_initialization_is_idempotent() {
        let adapter = adapter();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn price_series_is_ascending() {
        let adapter = adapter();
        adapter
            .insert_bars("600519", &[bar(3, 12.0), bar(1, 10.0), bar(2, 11.0)])
            .unwrap();
        adapter.insert_bars("000001", &[bar(1, 5.0)]).unwrap();

        let bars = adapter.get_price_series("600519").unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 11.0, 12.0]);
        assert_eq!(bars[0].high, 11.0);
        assert!(adapter.get_price_series("999999").unwrap().is_empty());
    }

    #[test]
    fn rules_round_trip_in_priority_order() {
        let adapter = adapter();
        for rule in default_rules() {
            adapter.insert_rule(&rule).unwrap();
        }
        assert_eq!(adapter.count_rules().unwrap(), 8);

        let all = adapter.get_enabled_rules(None).unwrap();
        assert_eq!(all.len(), 8);
        let priorities: Vec<i64> = all.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert_eq!(all[0].id, 1);

        let stored = all.iter().find(|r| r.id == 3).unwrap();
        let original = default_rules().into_iter().find(|r| r.id == 3).unwrap();
        assert_eq!(stored, &original);

        let sells = adapter.get_enabled_rules(Some(RuleType::Sell)).unwrap();
        assert_eq!(sells.len(), 4);
        assert!(sells.iter().all(|r| r.rule_type == RuleType::Sell));
    }

    #[test]
    fn disabled_rules_are_not_returned() {
        let adapter = adapter();
        let mut rule = default_rules().remove(0);
        rule.enabled = false;
        adapter.insert_rule(&rule).unwrap();
        assert!(adapter.get_enabled_rules(None).unwrap().is_empty());
    }

    #[test]
    fn corrupt_rules_are_skipped() {
        let adapter = adapter();
        for rule in default_rules() {
            adapter.insert_rule(&rule).unwrap();
        }
        adapter
            .conn()
            .unwrap()
            .execute_batch(
                "INSERT INTO trading_rules (id, name, rule_type, priority, conditions, price_config)
                 VALUES (98, 'not json', 'buy', 200, 'not json', '{}');
                 INSERT INTO trading_rules (id, name, rule_type, priority, conditions, price_config)
                 VALUES (99, 'no field', 'buy', 200,
                         '[{\"indicator\": \"RSI\", \"operator\": \"lt\", \"target_value\": 20}]',
                         '{}');
                 INSERT INTO trading_rules (id, name, rule_type, conditions, price_config)
                 VALUES (97, 'bad type', 'short', '[]', '{}');",
            )
            .unwrap();

        let rules = adapter.get_enabled_rules(None).unwrap();
        assert_eq!(rules.len(), 8);
        assert!(rules.iter().all(|r| r.id <= 8));
        assert_eq!(rules[0].id, 1);
    }

    #[test]
    fn upsert_overwrites_same_day() {
        let adapter = adapter();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        adapter
            .upsert_signal("600519", date, &signal(date, SignalType::Buy, "first"))
            .unwrap();
        let mut second = signal(date, SignalType::Sell, "second");
        second.entry_price = None;
        adapter.upsert_signal("600519", date, &second).unwrap();

        let stored = adapter.get_signal("600519", date).unwrap().unwrap();
        assert_eq!(stored, second);

        let count: i64 = adapter
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM signals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn get_signal_missing_is_none() {
        let adapter = adapter();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(adapter.get_signal("600519", date).unwrap().is_none());
    }

    #[test]
    fn watchlist_add_and_list() {
        let adapter = adapter();
        adapter.add_to_watchlist("600519").unwrap();
        adapter.add_to_watchlist("000001").unwrap();
        adapter.add_to_watchlist("600519").unwrap();
        assert_eq!(adapter.list_watchlist().unwrap(), vec!["000001", "600519"]);
    }
}
