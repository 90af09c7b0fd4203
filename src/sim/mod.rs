//! Deterministic simulation module
//!
//! All gameplay rules live here. This module must stay deterministic:
//! - Simulated time only (the table clock), never wall time
//! - Seeded RNG only
//! - Stable iteration order (elements in insertion order, balls by id)
//! - No physics, rendering or audio backends; those are collaborators

pub mod elements;
pub mod energy;
pub mod impact;
pub mod level;
pub mod state;
pub mod table;
pub mod tick;
pub mod timer;

pub use elements::{
    BinarySwitch, Brick, Element, ElementGroup, ElementKind, Impactable, SingleToggle, TargetPool,
    ToggleNotice, Toggleable,
};
pub use energy::{EnergyCurve, EnergySettings};
pub use impact::{ContactEvent, DirectionPolicy, ImpactProfile, ScoreOutcome, particle_count};
pub use level::{LevelController, UpgradePreview};
pub use state::{
    Ball, BallId, ElementId, GameEvent, GroupId, HudUpdate, LevelPhase, Mission, PoolId,
    ScoreEntry, ScoreLog, UpgradeKind, Upgrades,
};
pub use table::{Table, TableBuilder, TaskOwner};
pub use tick::{TickInput, tick};
pub use timer::Scheduler;
