use super::pins::{ActuatorPins, OutputLine, PyroChannel, Thruster};
use crate::{error, info, warn};
use chrono::TimeDelta;
use strum::IntoEnumIterator;

/// Tuning of the actuator policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorConfig {
    /// Controller output magnitude below which no thruster is driven.
    pub deadzone: f32,
    /// Shortest time a thruster stays on once activated.
    pub min_pulse: TimeDelta,
    /// How long the pyro channels are held high after a fire command.
    pub pyro_hold: TimeDelta,
}

impl ActuatorConfig {
    pub const DEADZONE: f32 = 0.05;
    pub const MIN_THRUSTER_PULSE: TimeDelta = TimeDelta::milliseconds(50);
    pub const PYRO_HOLD: TimeDelta = TimeDelta::milliseconds(1_000);
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            deadzone: Self::DEADZONE,
            min_pulse: Self::MIN_THRUSTER_PULSE,
            pyro_hold: Self::PYRO_HOLD,
        }
    }
}

/// Pyro latch. Charges are consumed once per process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyroState {
    Safe,
    Firing { since: TimeDelta },
    Fired,
}

/// Outcome of a fire command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyroFireResult {
    /// All channels driven high; released after the hold.
    Fired,
    /// The pin layer reported an open firing circuit; nothing was driven.
    NoContinuity(PyroChannel),
    /// The charges were already fired (or are firing).
    AlreadyFired,
}

/// Turns controller output and pyro commands into digital outputs.
///
/// Only one thruster is ever on. Both share the `on_since` timer that
/// enforces the minimum pulse.
#[derive(Debug)]
pub struct ActuatorDriver<P: ActuatorPins> {
    pins: P,
    config: ActuatorConfig,
    left_on: bool,
    right_on: bool,
    on_since: Option<TimeDelta>,
    pyro: PyroState,
}

impl<P: ActuatorPins> ActuatorDriver<P> {
    /// Takes ownership of the pin layer and forces every output low.
    pub fn new(pins: P, config: ActuatorConfig) -> Self {
        let mut driver = Self {
            pins,
            config,
            left_on: false,
            right_on: false,
            on_since: None,
            pyro: PyroState::Safe,
        };
        driver.disable_all_actuators();
        driver
    }

    pub fn left_thruster_on(&self) -> bool { self.left_on }
    pub fn right_thruster_on(&self) -> bool { self.right_on }
    pub fn pyro_state(&self) -> PyroState { self.pyro }
    pub fn pins(&self) -> &P { &self.pins }

    /// The thruster currently driven, if any.
    pub fn active_thruster(&self) -> Option<Thruster> {
        match (self.left_on, self.right_on) {
            (true, _) => Some(Thruster::Left),
            (_, true) => Some(Thruster::Right),
            _ => None,
        }
    }

    /// Applies a signed controller output.
    ///
    /// Positive output selects the left thruster, negative the right one,
    /// anything inside the deadzone (or non-finite) selects neither. A
    /// change of selection is suppressed while the active thruster has been
    /// on for less than the minimum pulse; repeating the current selection
    /// is a no-op and does not restart the pulse timer.
    pub fn control_thrusters(&mut self, output: f32, now: TimeDelta) {
        let requested = if !output.is_finite() || output.abs() < self.config.deadzone {
            None
        } else if output > 0.0 {
            Some(Thruster::Left)
        } else {
            Some(Thruster::Right)
        };

        let active = self.active_thruster();
        if requested == active {
            return;
        }
        if let (Some(_), Some(since)) = (active, self.on_since) {
            if now - since < self.config.min_pulse {
                return;
            }
        }
        self.drive_thrusters(requested, now);
    }

    /// Switches both thrusters off regardless of the minimum pulse.
    pub fn release_thrusters(&mut self) {
        self.pins.write(OutputLine::Thruster(Thruster::Left), false);
        self.pins.write(OutputLine::Thruster(Thruster::Right), false);
        self.left_on = false;
        self.right_on = false;
        self.on_since = None;
    }

    fn drive_thrusters(&mut self, selected: Option<Thruster>, now: TimeDelta) {
        let Some(thruster) = selected else {
            self.release_thrusters();
            return;
        };
        let other = match thruster {
            Thruster::Left => Thruster::Right,
            Thruster::Right => Thruster::Left,
        };
        self.pins.write(OutputLine::Thruster(other), false);
        self.pins.write(OutputLine::Thruster(thruster), true);
        self.left_on = thruster == Thruster::Left;
        self.right_on = thruster == Thruster::Right;
        self.on_since = Some(now);
    }

    /// Commands every pyro channel.
    ///
    /// Channels are checked for continuity first where the pin layer can
    /// tell; an unknown continuity does not block the fire. The channels stay
    /// high for the configured hold and are released by [`Self::update`].
    pub fn fire_pyros(&mut self, now: TimeDelta) -> PyroFireResult {
        if self.pyro != PyroState::Safe {
            warn!("Pyro fire requested again, charges already spent");
            return PyroFireResult::AlreadyFired;
        }
        if let Some(open) =
            PyroChannel::iter().find(|ch| self.pins.continuity(*ch) == Some(false))
        {
            error!("No continuity on pyro channel {open}, not firing!");
            return PyroFireResult::NoContinuity(open);
        }

        info!("FIRING PYRO CHARGES!");
        for ch in PyroChannel::iter() {
            self.pins.write(OutputLine::Pyro(ch), true);
        }
        self.pyro = PyroState::Firing { since: now };
        self.update(now);
        PyroFireResult::Fired
    }

    /// Releases the pyro channels once the hold has elapsed.
    pub fn update(&mut self, now: TimeDelta) {
        if let PyroState::Firing { since } = self.pyro {
            if now - since >= self.config.pyro_hold {
                self.release_pyros();
                info!("Pyro firing complete");
            }
        }
    }

    fn release_pyros(&mut self) {
        for ch in PyroChannel::iter() {
            self.pins.write(OutputLine::Pyro(ch), false);
        }
        if self.pyro != PyroState::Safe {
            self.pyro = PyroState::Fired;
        }
    }

    /// Forces every output low and clears the thruster flags.
    ///
    /// A pyro hold in progress is cut short; the charges count as fired.
    pub fn disable_all_actuators(&mut self) {
        self.release_thrusters();
        self.release_pyros();
    }
}
