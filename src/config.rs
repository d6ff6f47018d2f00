/// Instrument and feed configuration
///
/// Each instrument gets a dense price ladder spanning `[min_price, max_price]`
/// in steps of `tick_size`. All checks run once, at load time; a range that
/// cannot hold the instrument's prices is a configuration error, never a
/// per-message one.

use crate::framing::MAX_MESSAGES_PER_FRAME;
use crate::protocol::{Price, SYMBOL_LEN};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Upper bound on ladder size per side
pub const MAX_LADDER_LEVELS: usize = 20_000_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{symbol}: symbol must be 1..={max} characters", max = SYMBOL_LEN)]
    InvalidSymbol { symbol: String },

    #[error("{symbol}: tick size must be non-zero")]
    ZeroTickSize { symbol: String },

    #[error("{symbol}: min price {min} is above max price {max}")]
    InvertedRange { symbol: String, min: Price, max: Price },

    #[error("{symbol}: price range {min}..={max} is not a whole number of {tick} ticks")]
    RangeNotOnTick { symbol: String, min: Price, max: Price, tick: Price },

    #[error("{symbol}: ladder of {levels} levels exceeds limit {limit}")]
    TooManyLevels { symbol: String, levels: usize, limit: usize },

    #[error("stock locate {0} configured twice")]
    DuplicateLocate(u16),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub stock_locate: u16,
    pub tick_size: Price,
    pub min_price: Price,
    pub max_price: Price,
}

impl InstrumentConfig {
    pub fn new(symbol: &str, stock_locate: u16, tick_size: Price, min_price: Price, max_price: Price) -> Self {
        InstrumentConfig {
            symbol: symbol.to_string(),
            stock_locate,
            tick_size,
            min_price,
            max_price,
        }
    }

    /// Number of ladder slots per side
    pub fn levels(&self) -> usize {
        match self.tick_size {
            0 => 0,
            tick => (self.max_price.saturating_sub(self.min_price) / tick) as usize + 1,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let symbol = || self.symbol.clone();

        if self.symbol.is_empty() || self.symbol.len() > SYMBOL_LEN || !self.symbol.is_ascii() {
            return Err(ConfigError::InvalidSymbol { symbol: symbol() });
        }
        if self.tick_size == 0 {
            return Err(ConfigError::ZeroTickSize { symbol: symbol() });
        }
        if self.min_price > self.max_price {
            return Err(ConfigError::InvertedRange {
                symbol: symbol(),
                min: self.min_price,
                max: self.max_price,
            });
        }
        if (self.max_price - self.min_price) % self.tick_size != 0 {
            return Err(ConfigError::RangeNotOnTick {
                symbol: symbol(),
                min: self.min_price,
                max: self.max_price,
                tick: self.tick_size,
            });
        }
        let levels = self.levels();
        if levels > MAX_LADDER_LEVELS {
            return Err(ConfigError::TooManyLevels {
                symbol: symbol(),
                levels,
                limit: MAX_LADDER_LEVELS,
            });
        }
        Ok(())
    }
}

fn default_max_messages() -> u16 {
    MAX_MESSAGES_PER_FRAME
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub instruments: Vec<InstrumentConfig>,
    /// Frames declaring more messages than this are rejected as corrupt
    #[serde(default = "default_max_messages")]
    pub max_messages_per_frame: u16,
}

impl FeedConfig {
    pub fn new(instruments: Vec<InstrumentConfig>) -> Self {
        FeedConfig {
            instruments,
            max_messages_per_frame: MAX_MESSAGES_PER_FRAME,
        }
    }

    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        let config: FeedConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::with_capacity(self.instruments.len());
        for inst in &self.instruments {
            inst.validate()?;
            if !seen.insert(inst.stock_locate) {
                return Err(ConfigError::DuplicateLocate(inst.stock_locate));
            }
        }
        Ok(())
    }
}
