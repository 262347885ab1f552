//! Single-axis PID heading controller.
//!
//! Angles are degrees. The error is wrapped into `[-180, 180)` so the
//! controller always turns the short way round.

/// Bound of the integral accumulator (anti-windup), in degree-seconds.
pub const INTEGRAL_LIMIT: f32 = 100.0;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self { Self { kp, ki, kd } }
}

impl Default for PidGains {
    fn default() -> Self { Self::new(1.0, 0.0, 0.1) }
}

/// Maps any finite angle into `[-180, 180)` in constant time.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid may round up to the modulus itself for tiny negative inputs
    if wrapped >= 180.0 { wrapped - 360.0 } else { wrapped }
}

#[derive(Debug, Clone)]
pub struct AttitudeController {
    gains: PidGains,
    /// Desired heading in degrees.
    setpoint: f32,
    last_error: f32,
    last_derivative: f32,
    last_output: f32,
    integral: f32,
}

impl AttitudeController {
    pub fn new(gains: PidGains, setpoint: f32) -> Self {
        Self {
            gains,
            setpoint,
            last_error: 0.0,
            last_derivative: 0.0,
            last_output: 0.0,
            integral: 0.0,
        }
    }

    /// Replaces the gains, keeping the accumulated history.
    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) { self.gains = PidGains::new(kp, ki, kd); }

    /// Replaces the setpoint, keeping the accumulated history.
    pub fn set_setpoint(&mut self, setpoint: f32) { self.setpoint = setpoint; }

    /// Runs one controller step.
    ///
    /// # Arguments
    /// - `measurement`: current heading in degrees.
    /// - `dt`: seconds since the previous step. A non-positive value (first call,
    ///   clock hiccup) drops the derivative term. The integral still takes `error * dt`.
    ///
    /// # Returns
    /// The signed correction `kp*e + kd*d + ki*i`.
    pub fn compute(&mut self, measurement: f32, dt: f32) -> f32 {
        let error = wrap_angle(self.setpoint - measurement);

        let derivative = if dt > 0.0 { (error - self.last_error) / dt } else { 0.0 };

        self.integral = (self.integral + error * dt).clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT);

        let output = self.gains.kp * error + self.gains.kd * derivative + self.gains.ki * self.integral;

        self.last_error = error;
        self.last_derivative = derivative;
        self.last_output = output;
        output
    }

    /// Clears error history and integral. Gains and setpoint stay.
    pub fn reset(&mut self) {
        self.last_error = 0.0;
        self.last_derivative = 0.0;
        self.last_output = 0.0;
        self.integral = 0.0;
    }

    pub fn gains(&self) -> PidGains { self.gains }
    pub fn setpoint(&self) -> f32 { self.setpoint }
    pub fn last_error(&self) -> f32 { self.last_error }
    pub fn last_derivative(&self) -> f32 { self.last_derivative }
    pub fn last_output(&self) -> f32 { self.last_output }
    pub fn integral(&self) -> f32 { self.integral }
}
