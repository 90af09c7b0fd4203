//! Impact resolution
//!
//! Turns a contact between a ball and an element into an impulse request and
//! a score/energy delta. The physics itself happens elsewhere; this module only
//! computes the vector and the numbers.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Ball, BallId, ElementId};
use crate::consts::{IMPACT_SCORE_DIVISOR, PARTICLE_SPEED_DIVISOR};

/// A contact reported by the physics collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub ball: BallId,
    pub element: ElementId,
    pub point: Vec3,
    /// Surface normal at the first contact point
    pub normal: Vec3,
    pub relative_speed: f32,
}

/// How an element picks the direction it pushes the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionPolicy {
    /// From the element's center toward the ball
    #[default]
    Radial,
    /// Straight out of the struck surface (against the contact normal)
    Surface,
}

impl DirectionPolicy {
    /// Unit push direction, or zero when the geometry is degenerate
    pub fn direction(&self, ball_pos: Vec3, element_pos: Vec3, contact: &ContactEvent) -> Vec3 {
        let raw = match self {
            DirectionPolicy::Radial => ball_pos - element_pos,
            DirectionPolicy::Surface => -contact.normal,
        };
        raw.normalize_or_zero()
    }
}

/// Impact parameters of a bumper-like element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactProfile {
    /// Impulse magnitude
    pub force: f32,
    /// Score scale; also the flat energy charge per hit
    pub base_score: f32,
    pub policy: DirectionPolicy,
}

impl Default for ImpactProfile {
    fn default() -> Self {
        Self {
            force: 10.0,
            base_score: 10.0,
            policy: DirectionPolicy::Radial,
        }
    }
}

impl ImpactProfile {
    pub fn surface(force: f32, base_score: f32) -> Self {
        Self {
            force,
            base_score,
            policy: DirectionPolicy::Surface,
        }
    }

    /// Impulse vector to hand to physics
    pub fn impulse(&self, ball_pos: Vec3, element_pos: Vec3, contact: &ContactEvent) -> Vec3 {
        self.policy.direction(ball_pos, element_pos, contact) * self.force
    }

    /// Score and energy effect of striking this element at `speed`
    pub fn score(&self, ball: &Ball, speed: f32) -> ScoreOutcome {
        let raw = self.base_score * ball.energy * speed;
        ScoreOutcome {
            score: raw / IMPACT_SCORE_DIVISOR,
            charge: self.base_score,
            particles: particle_count(speed),
        }
    }
}

/// Score/energy part of an impact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    /// Already divided down for `add_score`
    pub score: f32,
    /// Flat energy added to the ball
    pub charge: f32,
    /// Cosmetic particle request
    pub particles: u32,
}

/// Particles emitted for an impact at `speed`
pub fn particle_count(speed: f32) -> u32 {
    if speed.is_finite() && speed > 0.0 {
        (speed / PARTICLE_SPEED_DIVISOR) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(normal: Vec3) -> ContactEvent {
        ContactEvent {
            ball: BallId(0),
            element: ElementId(0),
            point: Vec3::ZERO,
            normal,
            relative_speed: 0.0,
        }
    }

    #[test]
    fn test_radial_pushes_away_from_center() {
        let profile = ImpactProfile::default();
        let impulse = profile.impulse(
            Vec3::new(3.0, 4.0, 0.0),
            Vec3::ZERO,
            &contact(Vec3::X),
        );
        assert!((impulse - Vec3::new(6.0, 8.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_surface_pushes_against_normal() {
        let profile = ImpactProfile::surface(5.0, 10.0);
        let impulse = profile.impulse(
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::ZERO,
            &contact(Vec3::new(0.0, 0.0, 2.0)),
        );
        assert!((impulse - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn test_degenerate_direction_is_zero() {
        let profile = ImpactProfile::default();
        let impulse = profile.impulse(Vec3::ONE, Vec3::ONE, &contact(Vec3::X));
        assert_eq!(impulse, Vec3::ZERO);
    }

    #[test]
    fn test_score_scales_with_energy_and_speed() {
        let profile = ImpactProfile::default();
        let mut ball = Ball::new(BallId(0), 0.4);
        ball.energy = 2.0;
        let outcome = profile.score(&ball, 50.0);
        // 10 * 2 * 50 / 100
        assert!((outcome.score - 10.0).abs() < 1e-5);
        assert_eq!(outcome.charge, 10.0);
        assert_eq!(outcome.particles, 2);
    }

    #[test]
    fn test_particle_count() {
        assert_eq!(particle_count(19.9), 0);
        assert_eq!(particle_count(40.0), 2);
        assert_eq!(particle_count(-5.0), 0);
        assert_eq!(particle_count(f32::NAN), 0);
    }
}
