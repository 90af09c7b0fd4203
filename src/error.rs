//! Error types
//!
//! Configuration problems fail fast; nothing here is recoverable by the player.

use thiserror::Error;

use crate::sim::UpgradeKind;

/// Errors raised while composing a table or starting a level.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("reserve would be negative: {balls_per_level} balls per level, {active_limit} active")]
    NegativeReserve { balls_per_level: i64, active_limit: i64 },
    #[error("active ball limit must be at least 1, got {0}")]
    NoActiveBalls(i64),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("failed to parse settings: {0}")]
    Parse(String),
    #[error("failed to read settings file: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

/// Errors raised when buying an upgrade.
#[derive(Debug, Error, PartialEq)]
pub enum PurchaseError {
    #[error("{kind:?} upgrade costs {price} but only {coin} coin available")]
    InsufficientCoin { kind: UpgradeKind, price: u64, coin: u64 },
}
