use std::f64::consts::TAU;

use bevy::math::{DMat3, DVec3};

/// Classical Keplerian elements of a closed orbit around the parent body.
/// Angles are radians, distances kilometers, the period seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub eccentricity: f64,
    pub semi_major_axis: f64,
    pub inclination: f64,
    pub ascending_node: f64,
    pub arg_periapsis: f64,
    pub period: f64,
    pub mean_anomaly_epoch: f64,
}

// fixed so positions are bit-reproducible for a given (orbit, epoch)
const KEPLER_ITERATIONS: usize = 10;

/// Solve Kepler's equation M = E - e·sin(E) for the eccentric anomaly.
/// Newton-Raphson with a fixed iteration count, no early out.
fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let mut ea = mean_anomaly;
    for _ in 0..KEPLER_ITERATIONS {
        ea -= (ea - eccentricity * ea.sin() - mean_anomaly) / (1.0 - eccentricity * ea.cos());
    }
    ea
}

impl Orbit {
    /// Position relative to the parent at the given epoch (seconds).
    /// Pure: same inputs always give the same output.
    pub fn position_at(&self, epoch: f64) -> DVec3 {
        let e = self.eccentricity;

        // propagate the mean anomaly, wrapped to [0, 2pi)
        let m = (self.mean_anomaly_epoch + TAU * epoch / self.period).rem_euclid(TAU);
        let ea = solve_kepler(m, e);

        // true anomaly and radius from the eccentric anomaly
        let nu = 2.0
            * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos());
        let r = self.semi_major_axis * (1.0 - e * ea.cos());

        let in_plane = DVec3::new(r * nu.cos(), r * nu.sin(), 0.0);

        // 3-1-3 rotation out of the orbital plane:
        // argument of periapsis, inclination, longitude of ascending node
        let rot = DMat3::from_rotation_z(self.ascending_node)
            * DMat3::from_rotation_x(self.inclination)
            * DMat3::from_rotation_z(self.arg_periapsis);
        rot * in_plane
    }
}
