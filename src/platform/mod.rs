//! Collaborator contracts
//!
//! The core talks to the outside world only through these traits. Physics
//! owns ball motion, presentation shows values, input owns the flippers.
//! Audio lives in `crate::audio`.

use glam::Vec3;

use crate::sim::state::{BallId, GameEvent};

/// Rigid-body side of the table
pub trait PhysicsCollaborator {
    fn position(&self, ball: BallId) -> Vec3;

    /// Velocity magnitude
    fn speed(&self, ball: BallId) -> f32;

    fn apply_impulse(&mut self, ball: BallId, impulse: Vec3);

    /// Move the ball to `at` with zero velocity
    fn respawn(&mut self, ball: BallId, at: Vec3);

    fn set_mass(&mut self, ball: BallId, mass: f32);
}

/// HUD, particles, element visuals. Receives values, never mutates the core.
pub trait Presentation {
    fn show(&mut self, event: &GameEvent);
}

/// Flipper lock consumer
pub trait InputLock {
    fn set_flipper_lock(&mut self, locked: bool);
}

/// Presentation that ignores everything
#[derive(Debug, Default)]
pub struct NoPresentation;

impl Presentation for NoPresentation {
    fn show(&mut self, _event: &GameEvent) {}
}

/// Presentation that logs lifecycle notices and nothing else
#[derive(Debug, Default)]
pub struct LogPresentation;

impl Presentation for LogPresentation {
    fn show(&mut self, event: &GameEvent) {
        match event {
            GameEvent::LevelStarted { .. }
            | GameEvent::LevelComplete { .. }
            | GameEvent::GameOver { .. }
            | GameEvent::GroupCleared { .. } => log::info!("{:?}", event),
            _ => log::trace!("{:?}", event),
        }
    }
}
