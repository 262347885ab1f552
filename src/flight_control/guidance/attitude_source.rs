use super::attitude_controller::wrap_angle;
use crate::flight_control::actuation::Thruster;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Supplies the heading measurement for each guidance step.
///
/// `active` is the thruster currently driven so that simulated plants can
/// integrate the control torque; hardware sensors ignore it.
pub trait AttitudeSource {
    /// Returns the current heading in degrees after `dt` seconds.
    fn sample(&mut self, dt: f32, active: Option<Thruster>) -> f32;
}

/// Single-axis rigid cylinder spun by two opposing cold-gas thrusters and a
/// random disturbance torque.
#[derive(Debug)]
pub struct SimulatedAttitude {
    /// Moment of inertia, kg·m².
    inertia: f32,
    /// Radians.
    theta: f32,
    /// Radians per second.
    omega: f32,
    thrust_torque: f32,
    max_disturbance: f32,
    rng: StdRng,
}

impl SimulatedAttitude {
    const MASS_KG: f32 = 10.0;
    const RADIUS_M: f32 = 0.25;
    const THRUST_TORQUE_NM: f32 = 1.5;
    const MAX_DISTURBANCE_NM: f32 = 1.0;

    pub fn new(initial_heading_deg: f32, seed: u64) -> Self {
        Self {
            inertia: 0.5 * Self::MASS_KG * Self::RADIUS_M * Self::RADIUS_M,
            theta: initial_heading_deg.to_radians(),
            omega: 0.0,
            thrust_torque: Self::THRUST_TORQUE_NM,
            max_disturbance: Self::MAX_DISTURBANCE_NM,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Disables the random disturbance torque.
    pub fn without_disturbance(mut self) -> Self {
        self.max_disturbance = 0.0;
        self
    }

    pub fn heading(&self) -> f32 { wrap_angle(self.theta.to_degrees()) }
    pub fn angular_rate(&self) -> f32 { self.omega.to_degrees() }
}

impl AttitudeSource for SimulatedAttitude {
    fn sample(&mut self, dt: f32, active: Option<Thruster>) -> f32 {
        if dt > 0.0 {
            let control = match active {
                Some(Thruster::Left) => self.thrust_torque,
                Some(Thruster::Right) => -self.thrust_torque,
                None => 0.0,
            };
            let disturbance = if self.max_disturbance > 0.0 {
                self.rng.random_range(-self.max_disturbance..=self.max_disturbance)
            } else {
                0.0
            };
            let alpha = (control + disturbance) / self.inertia;
            self.theta += self.omega * dt + 0.5 * alpha * dt * dt;
            self.omega += alpha * dt;
            self.theta = wrap_angle(self.theta.to_degrees()).to_radians();
        }
        self.heading()
    }
}
