pub(crate) mod actuation;
mod control_loop;
pub(crate) mod guidance;
mod mission_clock;
pub(crate) mod sequencing;
#[cfg(test)]
mod tests;

pub use control_loop::{CommandError, CommandHandle, ControlLoop, MissionStatus, TickReport};
pub use mission_clock::MissionClock;
