//! Table settings
//!
//! Everything tunable about a table in one serde record. Missing fields fall
//! back to defaults, so a settings file only needs the values it changes.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{GROUP_REACTIVATE_DELAY, GROUP_REWARD, LOW_TIME_THRESHOLD};
use crate::error::ConfigError;
use crate::sim::energy::EnergySettings;
use crate::tuning::Tuning;

/// Table configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Progression economy
    pub tuning: Tuning,
    /// Ball energy model
    pub energy: EnergySettings,

    /// Where balls are (re)loaded
    pub spawn_point: Vec3,
    /// Level timer value that triggers the low-time cue
    pub low_time_threshold: f32,

    // === Button groups ===
    /// Coin granted when every button of a group is hit
    pub group_reward: u64,
    /// Simulated seconds before a cleared group lights up again
    pub group_reactivate_delay: f32,

    // === Simulation ===
    /// Seed for target selection
    pub seed: u64,
    /// Multiplier applied to every tick's dt (0 pauses)
    pub time_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            energy: EnergySettings::default(),

            spawn_point: Vec3::new(4.5, 0.5, -8.0),
            low_time_threshold: LOW_TIME_THRESHOLD,

            group_reward: GROUP_REWARD,
            group_reactivate_delay: GROUP_REACTIVATE_DELAY,

            seed: 0x5eed,
            time_scale: 1.0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values no table can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidSettings(msg));

        if self.tuning.bonus_coin_per_score < 1 {
            return invalid(format!(
                "bonus_coin_per_score must be at least 1, got {}",
                self.tuning.bonus_coin_per_score
            ));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return invalid(format!("time_scale must be >= 0, got {}", self.time_scale));
        }
        if !(self.group_reactivate_delay.is_finite() && self.group_reactivate_delay >= 0.0) {
            return invalid(format!(
                "group_reactivate_delay must be >= 0, got {}",
                self.group_reactivate_delay
            ));
        }
        if !self.spawn_point.is_finite() {
            return invalid("spawn_point must be finite".to_string());
        }
        if !self.energy.min_speed.is_finite() {
            return invalid("energy.min_speed must be finite".to_string());
        }
        Ok(())
    }
}
