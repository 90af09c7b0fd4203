//! Data-driven progression economy
//!
//! Every requirement, reward and price is a linear (or, for ball mass,
//! exponential) function of the level or upgrade index. Integer results floor
//! the float expression. Nothing is cached and no index is bounded.

use serde::{Deserialize, Serialize};

/// Balance table for levels and upgrades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Score step between coin bonuses (also the first threshold of a level)
    pub bonus_coin_per_score: i64,
    pub base_coin_award: f64,
    pub coin_award_increase_per_level: f64,

    // === Missions ===
    pub base_score_requirement: f64,
    pub score_mult_add_per_level: f64,
    pub base_sps_requirement: f64,
    pub sps_mult_add_per_level: f64,
    pub base_hit_target: i64,
    pub hit_target_add_per_level: f64,

    // === Time ===
    pub time_limit: f32,
    pub time_removed_per_level: f32,

    // === Ball mass (HyperBall) ===
    pub base_ball_mass: f32,
    pub mass_multiplier_per_upgrade: f32,
    pub mass_price_base: f64,
    pub mass_price_increase: f64,

    // === Ball count (MoreTries) ===
    pub starting_balls: i64,
    pub balls_add_per_upgrade: i64,
    pub ball_price_base: f64,
    pub ball_price_increase: f64,

    // === Active balls (MultiLaunch) ===
    pub starting_active: i64,
    pub active_add_per_upgrade: i64,
    pub active_price_base: f64,
    pub active_price_increase: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            bonus_coin_per_score: 50_000,
            base_coin_award: 1.0,
            coin_award_increase_per_level: 0.8,

            base_score_requirement: 100_000.0,
            score_mult_add_per_level: 1.0,
            base_sps_requirement: 3_000.0,
            sps_mult_add_per_level: 1.0,
            base_hit_target: 3,
            hit_target_add_per_level: 0.7,

            time_limit: 300.0,
            time_removed_per_level: 60.0,

            base_ball_mass: 0.4,
            mass_multiplier_per_upgrade: 0.9,
            mass_price_base: 1.0,
            mass_price_increase: 1.0,

            starting_balls: 3,
            balls_add_per_upgrade: 1,
            ball_price_base: 3.0,
            ball_price_increase: 3.0,

            starting_active: 1,
            active_add_per_upgrade: 1,
            active_price_base: 5.0,
            active_price_increase: 5.0,
        }
    }
}

/// Steps above the first index (level 1 / upgrade 1 is the base value)
#[inline]
fn steps(index: u32) -> f64 {
    index as f64 - 1.0
}

impl Tuning {
    /// Coin granted for completing `level`
    pub fn coin_award(&self, level: u32) -> i64 {
        (self.base_coin_award + self.coin_award_increase_per_level * steps(level)).floor() as i64
    }

    /// Cumulative score needed for the Score mission
    pub fn score_requirement(&self, level: u32) -> i64 {
        let base = self.base_score_requirement;
        (base + base * steps(level) * self.score_mult_add_per_level).floor() as i64
    }

    /// Score within one second needed for the ScorePerSecond mission
    pub fn sps_requirement(&self, level: u32) -> i64 {
        let base = self.base_sps_requirement;
        (base + base * steps(level) * self.sps_mult_add_per_level).floor() as i64
    }

    /// Targets to strike for the HitTarget mission
    pub fn hit_target_requirement(&self, level: u32) -> i64 {
        self.base_hit_target + (self.hit_target_add_per_level * steps(level)).floor() as i64
    }

    /// Level time limit. Not clamped: late levels may get zero or negative limits.
    pub fn time_limit(&self, level: u32) -> f32 {
        self.time_limit - self.time_removed_per_level * (level as f32 - 1.0)
    }

    pub fn ball_mass(&self, upgrade: u32) -> f32 {
        self.base_ball_mass * self.mass_multiplier_per_upgrade.powi(upgrade as i32 - 1)
    }

    pub fn mass_price(&self, upgrade: u32) -> i64 {
        (self.mass_price_base + self.mass_price_increase * steps(upgrade)).floor() as i64
    }

    /// Total balls a level may lose before game over
    pub fn balls_per_level(&self, upgrade: u32) -> i64 {
        self.starting_balls + self.balls_add_per_upgrade * (upgrade as i64 - 1)
    }

    pub fn ball_price(&self, upgrade: u32) -> i64 {
        (self.ball_price_base + self.ball_price_increase * steps(upgrade)).floor() as i64
    }

    /// Balls launched together at level start
    pub fn active_ball_limit(&self, upgrade: u32) -> i64 {
        self.starting_active + self.active_add_per_upgrade * (upgrade as i64 - 1)
    }

    pub fn active_price(&self, upgrade: u32) -> i64 {
        (self.active_price_base + self.active_price_increase * steps(upgrade)).floor() as i64
    }
}
