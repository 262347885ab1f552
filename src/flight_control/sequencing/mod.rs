pub(crate) mod mission_phase;
pub(crate) mod mission_sequencer;

pub use mission_phase::{MissionCommand, MissionPhase};
pub use mission_sequencer::{MissionSequencer, PhaseTransition, SequencerError};
