//! Batch signal recompute across a watchlist.
//!
//! Rules are loaded and compiled once per batch. Instruments then run on a
//! bounded pool: a `Semaphore` caps concurrency, each instrument runs its
//! synchronous port calls in `spawn_blocking`, and a failure only affects its
//! own instrument. Fetch and evaluation run under a per-instrument deadline; the
//! signal write starts only before that deadline and is never abandoned.

use crate::domain::engine::RuleEngine;
use crate::domain::error::SignalwatchError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::signal::Signal;
use crate::ports::price_port::PriceHistoryPort;
use crate::ports::rule_port::RuleStorePort;
use crate::ports::signal_port::SignalStorePort;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_WORKERS: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeConfig {
    pub max_workers: usize,
    pub instrument_timeout: Duration,
}

impl Default for RecomputeConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            instrument_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
}

impl RecomputeSummary {
    pub fn total(&self) -> usize {
        self.success_count + self.error_count + self.skipped_count
    }
}

/// Cooperative cancellation shared between the caller and a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct RecomputeCoordinator {
    prices: Arc<dyn PriceHistoryPort>,
    rules: Arc<dyn RuleStorePort>,
    signals: Arc<dyn SignalStorePort>,
    params: IndicatorParams,
    config: RecomputeConfig,
}

impl RecomputeCoordinator {
    pub fn new(
        prices: Arc<dyn PriceHistoryPort>,
        rules: Arc<dyn RuleStorePort>,
        signals: Arc<dyn SignalStorePort>,
        params: IndicatorParams,
        config: RecomputeConfig,
    ) -> Self {
        Self {
            prices,
            rules,
            signals,
            params,
            config,
        }
    }

    /// Recomputes and persists one signal per instrument.
    ///
    /// Only a rule store failure fails the batch; per-instrument failures are
    /// logged and counted. Instruments not started when `cancel` is set are
    /// counted as skipped.
    pub async fn recompute_all(
        &self,
        instruments: &[String],
        cancel: &CancelFlag,
    ) -> Result<RecomputeSummary, SignalwatchError> {
        let definitions = self.rules.get_enabled_rules(None)?;
        let engine = Arc::new(RuleEngine::new(&definitions, self.params.clone()));
        info!(
            instruments = instruments.len(),
            rules = engine.rule_count(),
            workers = self.config.max_workers,
            "recompute started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut summary = RecomputeSummary::default();

        for instrument in instruments {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                summary.skipped_count += 1;
                continue;
            };
            if cancel.is_cancelled() {
                summary.skipped_count += 1;
                continue;
            }

            let job = Job {
                instrument: instrument.clone(),
                prices: Arc::clone(&self.prices),
                signals: Arc::clone(&self.signals),
                engine: Arc::clone(&engine),
                limit: self.config.instrument_timeout,
            };
            tasks.spawn(async move {
                let _permit = permit;
                let result = job.run().await;
                (job.instrument, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((instrument, Ok(signal))) => {
                    debug!(instrument = %instrument, signal = %signal.signal_type, "signal stored");
                    summary.success_count += 1;
                }
                Ok((instrument, Err(e))) => {
                    warn!(instrument = %instrument, error = %e, "recompute failed");
                    summary.error_count += 1;
                }
                Err(e) => {
                    warn!(error = %e, "recompute task aborted");
                    summary.error_count += 1;
                }
            }
        }

        info!(
            success = summary.success_count,
            errors = summary.error_count,
            skipped = summary.skipped_count,
            "recompute finished"
        );
        Ok(summary)
    }
}

struct Job {
    instrument: String,
    prices: Arc<dyn PriceHistoryPort>,
    signals: Arc<dyn SignalStorePort>,
    engine: Arc<RuleEngine>,
    limit: Duration,
}

impl Job {
    /// Fetch and evaluate under the deadline, then persist.
    ///
    /// The write only starts while the deadline has not passed, and a started
    /// write is awaited to completion so the outcome matches the store.
    async fn run(&self) -> Result<Signal, SignalwatchError> {
        let deadline = Instant::now() + self.limit;

        let (instrument, prices, engine) = (
            self.instrument.clone(),
            Arc::clone(&self.prices),
            Arc::clone(&self.engine),
        );
        let signal = self
            .blocking(Some(deadline), move || {
                let bars = prices.get_price_series(&instrument)?;
                engine.evaluate_all(&instrument, &bars, None)
            })
            .await?;

        if Instant::now() >= deadline {
            return Err(self.timed_out());
        }

        let (instrument, signals, stored) = (
            self.instrument.clone(),
            Arc::clone(&self.signals),
            signal.clone(),
        );
        self.blocking(None, move || {
            signals.upsert_signal(&instrument, stored.date, &stored)
        })
        .await?;

        Ok(signal)
    }

    async fn blocking<T, F>(&self, deadline: Option<Instant>, f: F) -> Result<T, SignalwatchError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, SignalwatchError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        let joined = match deadline {
            Some(deadline) => match timeout_at(deadline, task).await {
                Ok(joined) => joined,
                Err(_) => return Err(self.timed_out()),
            },
            None => task.await,
        };
        joined.unwrap_or_else(|e| {
            Err(SignalwatchError::Worker {
                instrument: self.instrument.clone(),
                reason: e.to_string(),
            })
        })
    }

    fn timed_out(&self) -> SignalwatchError {
        SignalwatchError::Timeout {
            instrument: self.instrument.clone(),
            seconds: self.limit.as_secs(),
        }
    }
}
