//! Pinball Core - progression and impact resolution for an arcade table
//!
//! Core modules:
//! - `sim`: Level lifecycle, interactive elements, impact resolution, scheduling
//! - `tuning`: Data-driven progression economy
//! - `settings`: Table configuration loaded from JSON
//! - `platform`: Collaborator contracts (physics, presentation, input)
//! - `audio`: Fire-and-forget audio cues

pub mod audio;
pub mod error;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use audio::AudioCue;
pub use error::{ConfigError, PurchaseError};
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Trailing window for score-per-second aggregation (simulated seconds)
    pub const SCORE_WINDOW: f64 = 1.0;
    /// Remaining time at which the low-time cue fires
    pub const LOW_TIME_THRESHOLD: f32 = 10.0;

    /// Score per second that adds 1.0 to the spin multiplier
    pub const SPIN_SPS_DIVISOR: f64 = 1000.0;

    /// Impact score is divided by this before reaching the level score
    pub const IMPACT_SCORE_DIVISOR: f32 = 100.0;
    /// One particle per this much ball speed on impact
    pub const PARTICLE_SPEED_DIVISOR: f32 = 20.0;

    /// Energy floor; also the value a ball spawns with
    pub const MIN_ENERGY: f32 = 1.0;
    /// Speed below which the energy curve starts (curve is sampled at speed - this)
    pub const ENERGY_MIN_SPEED: f32 = 60.0;

    /// Delay before a cleared button group comes back
    pub const GROUP_REACTIVATE_DELAY: f32 = 0.5;
    /// Coin granted when a button group is cleared
    pub const GROUP_REWARD: u64 = 1;
}

/// Floor a float to a non-negative integer count, warning when the input was negative.
#[inline]
pub(crate) fn floor_to_count(value: f64, what: &str) -> u64 {
    let floored = value.floor();
    if floored.is_nan() || floored < 0.0 {
        log::warn!("{} evaluated to {}, clamping to 0", what, value);
        0
    } else {
        floored as u64
    }
}
