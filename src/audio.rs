//! Audio cues
//!
//! The core never plays sound itself. It names a cue and hands it to whatever
//! sink the table was built with; no acknowledgement is expected.

use serde::{Deserialize, Serialize};

/// Sound cue identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// Ball struck a bumper, button or target
    Bumper,
    /// Coin balance went up
    Coin,
    /// Level timer dropped to the low-time threshold
    LowTime,
    /// A level started
    LevelStart,
    /// Every button of a group has been hit
    GroupClear,
    /// A ball was (re)loaded at the spawn point
    BallLoad,
    /// A binary switch flipped
    Switch,
}

impl AudioCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCue::Bumper => "bumper",
            AudioCue::Coin => "coin",
            AudioCue::LowTime => "low_time",
            AudioCue::LevelStart => "level_start",
            AudioCue::GroupClear => "group_clear",
            AudioCue::BallLoad => "ball_load",
            AudioCue::Switch => "switch",
        }
    }
}

/// Receiver of audio cues. Implementations must swallow their own failures.
pub trait AudioCueSink {
    fn play(&mut self, cue: AudioCue);
}

/// Sink that drops every cue
#[derive(Debug, Default)]
pub struct SilentAudio;

impl AudioCueSink for SilentAudio {
    fn play(&mut self, _cue: AudioCue) {}
}

/// Sink that writes cues to the debug log
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioCueSink for LogAudio {
    fn play(&mut self, cue: AudioCue) {
        log::debug!("audio cue: {}", cue.as_str());
    }
}
