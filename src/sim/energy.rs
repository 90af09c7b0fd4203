//! Ball energy
//!
//! Energy grows with speed according to a configurable curve, is topped up
//! directly by impacts, and never drops below `MIN_ENERGY`.

use serde::{Deserialize, Serialize};

use super::state::Ball;
use crate::consts::MIN_ENERGY;

/// Piecewise-linear control curve: `(x, y)` keys sorted by `x`.
///
/// Outside the key range the curve holds its end values. An empty curve is flat zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(f32, f32)>", into = "Vec<(f32, f32)>")]
pub struct EnergyCurve {
    keys: Vec<(f32, f32)>,
}

impl From<Vec<(f32, f32)>> for EnergyCurve {
    fn from(keys: Vec<(f32, f32)>) -> Self {
        Self::new(keys)
    }
}

impl From<EnergyCurve> for Vec<(f32, f32)> {
    fn from(curve: EnergyCurve) -> Self {
        curve.keys
    }
}

impl Default for EnergyCurve {
    /// Slow bleed when under the minimum speed, growing gain above it
    fn default() -> Self {
        Self::new(vec![(-60.0, -2.0), (0.0, 0.0), (40.0, 0.5), (140.0, 2.0)])
    }
}

impl EnergyCurve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.retain(|(x, y)| x.is_finite() && y.is_finite());
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    /// Sample the curve at `x`
    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                let span = x1 - x0;
                if span <= f32::EPSILON {
                    return y1;
                }
                let t = (x - x0) / span;
                return y0 + (y1 - y0) * t;
            }
        }
        last.1
    }
}

/// Energy model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySettings {
    /// The curve is sampled at `speed - min_speed`
    pub min_speed: f32,
    pub curve: EnergyCurve,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            min_speed: crate::consts::ENERGY_MIN_SPEED,
            curve: EnergyCurve::default(),
        }
    }
}

impl Ball {
    /// Per-tick energy update from the ball's current speed
    pub fn decay_energy(&mut self, settings: &EnergySettings, speed: f32, dt: f32) {
        let gain = settings.curve.evaluate(speed - settings.min_speed);
        self.energy += gain * dt;
        self.enforce_energy_floor();
    }

    /// Add energy directly (impacts)
    pub fn charge(&mut self, amount: f32) {
        self.energy += amount;
        self.enforce_energy_floor();
    }

    fn enforce_energy_floor(&mut self) {
        if self.energy.is_nan() {
            log::warn!("Ball {} energy became NaN, resetting", self.id.0);
            self.energy = MIN_ENERGY;
        } else if self.energy < MIN_ENERGY {
            self.energy = MIN_ENERGY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::BallId;
    use proptest::prelude::*;

    fn ball() -> Ball {
        Ball::new(BallId(0), 0.4)
    }

    #[test]
    fn test_curve_interpolates_and_clamps() {
        let curve = EnergyCurve::new(vec![(10.0, 1.0), (0.0, 0.0)]);
        assert_eq!(curve.evaluate(-5.0), 0.0);
        assert_eq!(curve.evaluate(5.0), 0.5);
        assert_eq!(curve.evaluate(25.0), 1.0);
        assert_eq!(EnergyCurve::new(Vec::new()).evaluate(3.0), 0.0);
    }

    #[test]
    fn test_curve_from_json_is_sorted() {
        let curve: EnergyCurve = serde_json::from_str("[[10.0, 1.0], [0.0, 0.0]]").unwrap();
        assert_eq!(curve.keys(), &[(0.0, 0.0), (10.0, 1.0)]);
    }

    #[test]
    fn test_decay_gains_above_min_speed() {
        let settings = EnergySettings {
            min_speed: 60.0,
            curve: EnergyCurve::new(vec![(0.0, 0.0), (100.0, 10.0)]),
        };
        let mut b = ball();
        b.decay_energy(&settings, 110.0, 0.5);
        assert!((b.energy - 3.5).abs() < 1e-5, "energy was {}", b.energy);
    }

    #[test]
    fn test_decay_floors_at_one() {
        let settings = EnergySettings::default();
        let mut b = ball();
        b.energy = 1.2;
        // Standing still samples the negative end of the curve
        for _ in 0..120 {
            b.decay_energy(&settings, 0.0, 1.0 / 120.0);
        }
        assert_eq!(b.energy, MIN_ENERGY);
    }

    #[test]
    fn test_charge_is_unbounded_above() {
        let mut b = ball();
        b.charge(1.0e6);
        assert_eq!(b.energy, 1.0e6 + 1.0);
    }

    proptest! {
        #[test]
        fn prop_energy_never_below_floor(
            speeds in proptest::collection::vec(0.0f32..400.0, 1..50),
            charges in proptest::collection::vec(-50.0f32..50.0, 1..50),
        ) {
            let settings = EnergySettings::default();
            let mut b = ball();
            for (speed, amount) in speeds.iter().zip(charges.iter()) {
                b.decay_energy(&settings, *speed, crate::consts::SIM_DT);
                prop_assert!(b.energy >= MIN_ENERGY);
                b.charge(*amount);
                prop_assert!(b.energy >= MIN_ENERGY);
            }
        }
    }
}
