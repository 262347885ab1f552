use chrono::TimeDelta;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use strum_macros::{Display, EnumIter, EnumString};

/// Discrete steps of the mission, in nominal order of progression.
///
/// The ordering is informational only: ABORT may force any phase back to
/// [`MissionPhase::Ground`], so no phase is terminal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, EnumIter)]
pub enum MissionPhase {
    /// On the ground, pre-launch.
    Ground,
    /// Armed and waiting for the launch command.
    Armed,
    /// Powered ascent, guidance still inactive.
    Ascent,
    /// Closed-loop attitude control running.
    GuidanceActive,
    /// Pyro charges commanded.
    PyroFired,
    /// Payload has landed.
    Landed,
}

impl MissionPhase {
    /// The status string reported to the ground console.
    pub fn as_str(self) -> &'static str {
        match self {
            MissionPhase::Ground => "GROUND",
            MissionPhase::Armed => "ARMED",
            MissionPhase::Ascent => "ASCENT",
            MissionPhase::GuidanceActive => "GNC_ACTIVE",
            MissionPhase::PyroFired => "PYRO_FIRED",
            MissionPhase::Landed => "LANDED",
        }
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Operator commands accepted on every command channel.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MissionCommand {
    Arm,
    Launch,
    Abort,
}

impl MissionCommand {
    /// Phase the command must be issued from, `None` if it is valid everywhere.
    pub fn required_phase(self) -> Option<MissionPhase> {
        COMMAND_TABLE.iter().find(|(cmd, _, _)| *cmd == self).and_then(|(_, from, _)| *from)
    }
}

/// `(command, required source phase, target phase)`.
const COMMAND_TABLE: [(MissionCommand, Option<MissionPhase>, MissionPhase); 3] = [
    (MissionCommand::Arm, Some(MissionPhase::Ground), MissionPhase::Armed),
    (MissionCommand::Launch, Some(MissionPhase::Armed), MissionPhase::Ascent),
    (MissionCommand::Abort, None, MissionPhase::Ground),
];

/// Resolves an operator command against the current phase.
///
/// # Returns
/// - `Some(target)` if the command is legal in `phase`.
/// - `None` if the command requires a different source phase.
pub fn transition(phase: MissionPhase, command: MissionCommand) -> Option<MissionPhase> {
    COMMAND_TABLE.iter().find(|(cmd, _, _)| *cmd == command).and_then(|(_, from, to)| match from {
        Some(required) if *required != phase => None,
        _ => Some(*to),
    })
}

/// Which timestamp an automatic advance measures its dwell from.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PhaseClock {
    /// Time of the last transition into the current phase.
    PhaseEntry,
    /// Time of the last entry into [`MissionPhase::GuidanceActive`].
    GuidanceEntry,
}

/// A timer-driven transition out of a phase.
#[derive(Debug, Clone, Copy)]
pub struct AutoAdvance {
    pub next: MissionPhase,
    pub dwell: TimeDelta,
    pub clock: PhaseClock,
}

pub const ASCENT_DWELL: TimeDelta = TimeDelta::milliseconds(10_000);
pub const GUIDANCE_DWELL: TimeDelta = TimeDelta::milliseconds(15_000);
pub const PYRO_FIRED_DWELL: TimeDelta = TimeDelta::milliseconds(5_000);

/// Automatic advances keyed by source phase. Phases without an entry only
/// change on operator request.
pub static AUTO_ADVANCE_LOOKUP: LazyLock<HashMap<MissionPhase, AutoAdvance>> =
    LazyLock::new(|| {
        let mut lookup = HashMap::new();
        let advances = vec![
            (MissionPhase::Ascent, MissionPhase::GuidanceActive, ASCENT_DWELL, PhaseClock::PhaseEntry),
            (MissionPhase::GuidanceActive, MissionPhase::PyroFired, GUIDANCE_DWELL, PhaseClock::GuidanceEntry),
            (MissionPhase::PyroFired, MissionPhase::Landed, PYRO_FIRED_DWELL, PhaseClock::PhaseEntry),
        ];

        for (from, next, dwell, clock) in advances {
            lookup.insert(from, AutoAdvance { next, dwell, clock });
        }
        lookup
    });
