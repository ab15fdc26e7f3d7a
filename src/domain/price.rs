//! Two-phase price target resolution.
//!
//! The entry is resolved first and wrapped in `ResolvedEntry`; exit targets
//! relative to the entry can only be computed from that value, so an exit can
//! never be resolved against an entry that does not exist. Arithmetic is full
//! precision; rounding for display happens when a signal is built.

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::rule::{EntryTarget, ExitTarget, PriceBase, PriceConfig};

/// Inputs shared by every target of one rule.
#[derive(Debug, Clone, Copy)]
pub struct PriceContext<'a> {
    pub current_price: f64,
    pub snapshot: &'a IndicatorSnapshot,
}

/// An entry price that has been resolved in phase one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEntry(f64);

impl ResolvedEntry {
    pub fn value(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedPrices {
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

pub fn resolve_entry(target: &EntryTarget, ctx: &PriceContext) -> Option<ResolvedEntry> {
    let value = match target {
        EntryTarget::Current => Some(ctx.current_price),
        EntryTarget::Percentage(pct) => Some(ctx.current_price * (1.0 + pct)),
        EntryTarget::Indicator(field) => field.value_in(ctx.snapshot, ctx.current_price),
    };
    value.filter(|v| v.is_finite()).map(ResolvedEntry)
}

/// Resolves an exit target given the phase-one entry.
pub fn resolve_dependent(
    target: &ExitTarget,
    ctx: &PriceContext,
    entry: &ResolvedEntry,
) -> Option<f64> {
    match target {
        ExitTarget::Percentage {
            base: PriceBase::Entry,
            value,
        } => finite(entry.value() * (1.0 + value)),
        other => resolve_standalone(other, ctx),
    }
}

/// Resolves an exit target without an entry. Entry-relative targets are absent.
pub fn resolve_standalone(target: &ExitTarget, ctx: &PriceContext) -> Option<f64> {
    match target {
        ExitTarget::Current => finite(ctx.current_price),
        ExitTarget::Percentage {
            base: PriceBase::Current,
            value,
        } => finite(ctx.current_price * (1.0 + value)),
        ExitTarget::Percentage {
            base: PriceBase::Entry,
            ..
        } => None,
        ExitTarget::Indicator(field) => field.value_in(ctx.snapshot, ctx.current_price),
    }
}

pub fn resolve(
    config: &PriceConfig,
    current_price: f64,
    snapshot: &IndicatorSnapshot,
) -> ResolvedPrices {
    let ctx = PriceContext {
        current_price,
        snapshot,
    };
    let entry = resolve_entry(&config.entry, &ctx);
    let exit = |target: &Option<ExitTarget>| {
        target.as_ref().and_then(|t| match &entry {
            Some(e) => resolve_dependent(t, &ctx, e),
            None => resolve_standalone(t, &ctx),
        })
    };

    ResolvedPrices {
        entry: entry.map(|e| e.value()),
        stop_loss: exit(&config.stop_loss),
        take_profit: exit(&config.take_profit),
    }
}

/// Rounds to two decimals for emitted signals.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn finite(value: f64) -> Option<f64> {
    Some(value).filter(|v| v.is_finite())
}
