use super::mission_phase::{
    AUTO_ADVANCE_LOOKUP, MissionCommand, MissionPhase, PhaseClock, transition,
};
use crate::info;
use chrono::TimeDelta;
use std::fmt;

/// Returned when an operator command is not legal in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerError {
    InvalidTransition { command: MissionCommand, phase: MissionPhase },
}

impl SequencerError {
    /// Short rejection code reported to the ground console.
    pub fn rejection_code(&self) -> &'static str {
        match self {
            SequencerError::InvalidTransition { command, .. } => match command.required_phase() {
                Some(MissionPhase::Ground) => "NOT_GROUND",
                Some(MissionPhase::Armed) => "NOT_ARMED",
                _ => "REJECTED",
            },
        }
    }
}

impl fmt::Display for SequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerError::InvalidTransition { command, phase } => {
                write!(f, "{command} rejected in phase {phase} ({})", self.rejection_code())
            }
        }
    }
}

impl std::error::Error for SequencerError {}

/// Observable record of a single phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: MissionPhase,
    pub to: MissionPhase,
    /// Mission time of the transition.
    pub at: TimeDelta,
}

/// Owns the mission phase and the two phase clocks.
///
/// All timestamps are mission time, i.e. monotonic time since boot.
#[derive(Debug)]
pub struct MissionSequencer {
    phase: MissionPhase,
    previous_phase: MissionPhase,
    phase_entry: TimeDelta,
    /// Only set while the mission went through guidance since the last ground phase.
    guidance_entry: Option<TimeDelta>,
}

impl MissionSequencer {
    /// Creates a sequencer on [`MissionPhase::Ground`] entered at `now`.
    pub fn new(now: TimeDelta) -> Self {
        Self {
            phase: MissionPhase::Ground,
            previous_phase: MissionPhase::Ground,
            phase_entry: now,
            guidance_entry: None,
        }
    }

    pub fn phase(&self) -> MissionPhase { self.phase }
    pub fn previous_phase(&self) -> MissionPhase { self.previous_phase }
    pub fn phase_entry(&self) -> TimeDelta { self.phase_entry }
    pub fn guidance_entry(&self) -> Option<TimeDelta> { self.guidance_entry }

    /// Applies an operator command.
    ///
    /// ABORT always succeeds, even from [`MissionPhase::Ground`], and restamps
    /// the phase entry. ARM and LAUNCH are rejected with
    /// [`SequencerError::InvalidTransition`] outside their source phase; a
    /// rejection leaves the state untouched.
    pub fn request_transition(
        &mut self,
        command: MissionCommand,
        now: TimeDelta,
    ) -> Result<PhaseTransition, SequencerError> {
        let target = transition(self.phase, command)
            .ok_or(SequencerError::InvalidTransition { command, phase: self.phase })?;
        Ok(self.transition_to(target, now))
    }

    /// Evaluates the timer-driven advances. At most one phase change per call;
    /// a dwell is complete once the elapsed time reaches it.
    pub fn tick(&mut self, now: TimeDelta) -> Option<PhaseTransition> {
        let advance = AUTO_ADVANCE_LOOKUP.get(&self.phase)?;
        let started = match advance.clock {
            PhaseClock::PhaseEntry => self.phase_entry,
            PhaseClock::GuidanceEntry => self.guidance_entry.unwrap_or(self.phase_entry),
        };
        if now - started >= advance.dwell {
            Some(self.transition_to(advance.next, now))
        } else {
            None
        }
    }

    fn transition_to(&mut self, target: MissionPhase, now: TimeDelta) -> PhaseTransition {
        self.previous_phase = self.phase;
        self.phase = target;
        self.phase_entry = now;
        match target {
            MissionPhase::GuidanceActive => self.guidance_entry = Some(now),
            MissionPhase::Ground => self.guidance_entry = None,
            _ => {}
        }
        info!(
            "Transitioned to phase {target} (from {}) at T+{}ms",
            self.previous_phase,
            now.num_milliseconds()
        );
        PhaseTransition { from: self.previous_phase, to: target, at: now }
    }
}
