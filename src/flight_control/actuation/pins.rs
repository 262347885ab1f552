use crate::event;
use std::fmt;
use strum_macros::{Display, EnumIter};

/// Pyrotechnic firing channels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display, EnumIter)]
pub enum PyroChannel {
    #[strum(to_string = "DETACH_1")]
    Detach1,
    #[strum(to_string = "DETACH_2")]
    Detach2,
    #[strum(to_string = "POP")]
    Pop,
}

/// Thrusters of the roll pair.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Thruster {
    /// Positive torque.
    Left,
    /// Negative torque.
    Right,
}

/// A single digital output line.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum OutputLine {
    Thruster(Thruster),
    Pyro(PyroChannel),
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputLine::Thruster(t) => write!(f, "THRUSTER_{t}"),
            OutputLine::Pyro(ch) => write!(f, "PYRO_{ch}"),
        }
    }
}

/// Digital output layer below the actuator driver.
pub trait ActuatorPins {
    /// Drives `line` high (`true`) or low.
    fn write(&mut self, line: OutputLine, high: bool);

    /// Electrical continuity of a pyro channel.
    ///
    /// `None` means the hardware has no sensing circuit for the channel, which
    /// is the case for every board flown so far.
    fn continuity(&self, _channel: PyroChannel) -> Option<bool> { None }
}

/// Host-side pin layer that only reports level changes on the event log.
#[derive(Debug, Default)]
pub struct LoggedPins {
    high: Vec<OutputLine>,
}

impl LoggedPins {
    pub fn is_high(&self, line: OutputLine) -> bool { self.high.contains(&line) }
}

impl ActuatorPins for LoggedPins {
    fn write(&mut self, line: OutputLine, high: bool) {
        if high == self.is_high(line) {
            return;
        }
        if high {
            self.high.push(line);
        } else {
            self.high.retain(|l| *l != line);
        }
        event!("{line} -> {}", if high { "HIGH" } else { "LOW" });
    }
}
