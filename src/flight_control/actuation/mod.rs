//! Thruster and pyro outputs.

pub(crate) mod actuator_driver;
pub(crate) mod pins;

pub use actuator_driver::{ActuatorConfig, ActuatorDriver, PyroFireResult, PyroState};
pub use pins::{ActuatorPins, LoggedPins, OutputLine, PyroChannel, Thruster};
