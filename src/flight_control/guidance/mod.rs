//! Closed-loop heading control used while the mission is in the guidance phase.

pub(crate) mod attitude_controller;
pub(crate) mod attitude_source;

pub use attitude_controller::{AttitudeController, PidGains};
pub use attitude_source::{AttitudeSource, SimulatedAttitude};
