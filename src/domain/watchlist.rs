//! Watchlist parsing.
//!
//! Instrument lists come from the `[watchlist]` config section or the CLI as
//! comma separated identifiers.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WatchlistError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

/// Splits on commas, trimming each identifier. Order is preserved.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, WatchlistError> {
    let mut instruments = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let instrument = token.trim();
        if instrument.is_empty() {
            return Err(WatchlistError::EmptyToken);
        }
        if !seen.insert(instrument) {
            return Err(WatchlistError::DuplicateInstrument(instrument.to_string()));
        }
        instruments.push(instrument.to_string());
    }

    Ok(instruments)
}
