//! Core simulation types
//!
//! Identifiers, the ball entity, mission/upgrade enums, the score log and the
//! events the core hands to its collaborators.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::audio::AudioCue;
use crate::consts::{MIN_ENERGY, SCORE_WINDOW};

/// Ball identifier (index into the ball pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallId(pub u32);

/// Interactive element identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Button group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

/// Target pool identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub u32);

/// Level completion condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mission {
    /// Reach a cumulative score
    #[default]
    Score,
    /// Score a given amount within one second
    ScorePerSecond,
    /// Strike a number of pool targets
    HitTarget,
}

/// Purchasable upgrade tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Ball mass ("HyperBall")
    Mass,
    /// Balls per level ("MoreTries")
    Count,
    /// Concurrently active balls ("MultiLaunch")
    Active,
}

/// Current upgrade tier of each track (all start at 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub mass: u32,
    pub count: u32,
    pub active: u32,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            mass: 1,
            count: 1,
            active: 1,
        }
    }
}

impl Upgrades {
    pub fn get(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Mass => self.mass,
            UpgradeKind::Count => self.count,
            UpgradeKind::Active => self.active,
        }
    }

    pub fn bump(&mut self, kind: UpgradeKind) {
        match kind {
            UpgradeKind::Mass => self.mass += 1,
            UpgradeKind::Count => self.count += 1,
            UpgradeKind::Active => self.active += 1,
        }
    }
}

/// Level lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LevelPhase {
    /// No level has been started yet
    #[default]
    Idle,
    /// Level in progress
    Running,
    /// Mission accomplished, waiting for the next start
    Complete,
    /// Ran out of balls
    GameOver,
}

/// A ball entity. Position and velocity live in the physics collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    /// Speed-derived score multiplier, never below `MIN_ENERGY`
    pub energy: f32,
    pub mass: f32,
}

impl Ball {
    pub fn new(id: BallId, mass: f32) -> Self {
        Self {
            id,
            energy: MIN_ENERGY,
            mass,
        }
    }

    /// Back to spawn condition (velocity and position are reset by physics)
    pub fn reset(&mut self) {
        self.energy = MIN_ENERGY;
    }
}

/// One score contribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub amount: f64,
    pub time: f64,
}

/// Time-stamped score contributions for the trailing one-second window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreLog {
    entries: Vec<ScoreEntry>,
}

impl ScoreLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, amount: f64, time: f64) {
        self.entries.push(ScoreEntry { amount, time });
    }

    /// Drop entries outside `[now - SCORE_WINDOW, now]`.
    ///
    /// Entries stamped after `now` only arise from clock skew and are dropped too.
    pub fn prune(&mut self, now: f64) {
        self.entries.retain(|e| {
            let age = now - e.time;
            (0.0..=SCORE_WINDOW).contains(&age)
        });
    }

    /// Prune, then sum what is left
    pub fn per_second(&mut self, now: f64) -> f64 {
        self.prune(now);
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Plain values for the HUD, sent on every mutation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HudUpdate {
    Score(u64),
    Coin(u64),
    TimeLeft(f32),
    Reserve(u32),
    TargetHits(u32),
    ScorePerSecond(f64),
    /// Signed spin speed factor for the table centerpiece
    SpinMultiplier(f64),
    Level(u32),
    Mission { mission: Mission, requirement: i64 },
    Upgrades(Upgrades),
}

/// Everything the core reports outward during an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Cue(AudioCue),
    Hud(HudUpdate),
    /// Push a ball (direction already scaled by force)
    Impulse { ball: BallId, impulse: Vec3 },
    /// Move a ball to `at` and zero its velocity
    Respawn { ball: BallId, at: Vec3 },
    SetMass { ball: BallId, mass: f32 },
    FlipperLock(bool),
    /// Cosmetic particle burst on impact
    Particles { ball: BallId, count: u32 },
    ElementChanged { element: ElementId, active: bool },
    SwitchChanged { element: ElementId, on: bool },
    GroupCleared { group: GroupId, reward: u64 },
    LevelStarted { level: u32 },
    LevelComplete { level: u32, award: u64 },
    GameOver { level: u32 },
}
