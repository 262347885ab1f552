use super::{
    actuation::{ActuatorDriver, ActuatorPins, PyroFireResult, PyroState},
    guidance::{AttitudeController, AttitudeSource},
    mission_clock::MissionClock,
    sequencing::{MissionCommand, MissionPhase, MissionSequencer, PhaseTransition, SequencerError},
};
use crate::{info, log, warn};
use chrono::TimeDelta;
use std::{fmt, time::Duration};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Nominal period of the control loop (100 Hz).
pub const CONTROL_PERIOD: Duration = Duration::from_millis(10);
/// Interval between telemetry lines on the console log.
pub const LOG_PERIOD: TimeDelta = TimeDelta::milliseconds(1_000);
const COMMAND_QUEUE_DEPTH: usize = 16;

type CommandReply = Result<PhaseTransition, SequencerError>;

/// An operator command waiting for the next tick.
#[derive(Debug)]
struct CommandRequest {
    command: MissionCommand,
    reply: oneshot::Sender<CommandReply>,
}

/// Snapshot published after every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionStatus {
    pub phase: MissionPhase,
    /// Mission time of the tick that produced the snapshot.
    pub at: TimeDelta,
    pub left_thruster: bool,
    pub right_thruster: bool,
    pub pyro: PyroState,
    pub pid_error: f32,
    pub pid_output: f32,
}

/// Failure to get a command through the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The sequencer refused the command.
    Rejected(SequencerError),
    /// The control loop has stopped or its queue is full.
    LoopUnavailable,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Rejected(e) => write!(f, "{e}"),
            CommandError::LoopUnavailable => write!(f, "control loop unavailable"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<SequencerError> for CommandError {
    fn from(value: SequencerError) -> Self { CommandError::Rejected(value) }
}

/// Cloneable access point for command sources running outside the tick loop.
///
/// Commands are queued and applied at the start of the next tick; the loop
/// is the only owner of sequencer and actuator state.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<CommandRequest>,
    status: watch::Receiver<MissionStatus>,
}

impl CommandHandle {
    /// Queues `command` and waits for the tick that applies it.
    pub async fn request(&self, command: MissionCommand) -> Result<PhaseTransition, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CommandRequest { command, reply })
            .await
            .map_err(|_| CommandError::LoopUnavailable)?;
        Ok(rx.await.map_err(|_| CommandError::LoopUnavailable)??)
    }

    /// Queues `command` without waiting. The receiver resolves on the next tick.
    pub fn submit(
        &self,
        command: MissionCommand,
    ) -> Result<oneshot::Receiver<CommandReply>, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .try_send(CommandRequest { command, reply })
            .map_err(|_| CommandError::LoopUnavailable)?;
        Ok(rx)
    }

    pub fn status(&self) -> MissionStatus { *self.status.borrow() }

    /// Current phase as the status string of the ground console.
    pub fn phase_text(&self) -> &'static str { self.status.borrow().phase.as_str() }
}

/// What happened during one tick.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub transitions: Vec<PhaseTransition>,
    pub rejected: Vec<SequencerError>,
    /// Set on the tick that entered the pyro phase.
    pub pyro: Option<PyroFireResult>,
    /// Set when the attitude controller history was cleared.
    pub guidance_reset: bool,
    /// Controller output, only during guidance.
    pub correction: Option<f32>,
}

/// Fixed-rate orchestrator owning sequencer, controller and actuators.
pub struct ControlLoop<P: ActuatorPins, A: AttitudeSource> {
    sequencer: MissionSequencer,
    controller: AttitudeController,
    driver: ActuatorDriver<P>,
    attitude: A,
    commands: mpsc::Receiver<CommandRequest>,
    status: watch::Sender<MissionStatus>,
    last_tick: TimeDelta,
}

#[allow(clippy::cast_precision_loss)]
fn as_secs(delta: TimeDelta) -> f32 {
    delta.num_microseconds().map_or(0.0, |us| us as f32 / 1_000_000.0)
}

impl<P: ActuatorPins, A: AttitudeSource> ControlLoop<P, A> {
    /// Builds the loop on [`MissionPhase::Ground`] with all actuators off.
    ///
    /// # Returns
    /// The loop and the handle through which command sources reach it.
    pub fn new(
        controller: AttitudeController,
        mut driver: ActuatorDriver<P>,
        attitude: A,
        now: TimeDelta,
    ) -> (Self, CommandHandle) {
        driver.disable_all_actuators();
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let initial = MissionStatus {
            phase: MissionPhase::Ground,
            at: now,
            left_thruster: false,
            right_thruster: false,
            pyro: driver.pyro_state(),
            pid_error: 0.0,
            pid_output: 0.0,
        };
        let (status, status_rx) = watch::channel(initial);
        let control_loop = Self {
            sequencer: MissionSequencer::new(now),
            controller,
            driver,
            attitude,
            commands,
            status,
            last_tick: now,
        };
        (control_loop, CommandHandle { tx, status: status_rx })
    }

    pub fn sequencer(&self) -> &MissionSequencer { &self.sequencer }
    pub fn controller(&self) -> &AttitudeController { &self.controller }
    pub fn driver(&self) -> &ActuatorDriver<P> { &self.driver }
    pub fn attitude(&self) -> &A { &self.attitude }

    /// Runs one control period at mission time `now`.
    pub fn tick(&mut self, now: TimeDelta) -> TickReport {
        let dt = as_secs(now - self.last_tick);
        self.last_tick = now;
        let mut report = TickReport::default();
        let mut replies = Vec::new();

        while let Ok(CommandRequest { command, reply }) = self.commands.try_recv() {
            let res = self.sequencer.request_transition(command, now);
            match res {
                Ok(trans) => self.on_transition(trans, now, &mut report),
                Err(e) => {
                    warn!("Command {e}");
                    report.rejected.push(e);
                }
            }
            replies.push((reply, res));
        }

        if let Some(trans) = self.sequencer.tick(now) {
            self.on_transition(trans, now, &mut report);
        }

        self.driver.update(now);

        match self.sequencer.phase() {
            MissionPhase::GuidanceActive => {
                let heading = self.attitude.sample(dt, self.driver.active_thruster());
                let correction = self.controller.compute(heading, dt);
                self.driver.control_thrusters(correction, now);
                report.correction = Some(correction);
            }
            MissionPhase::Ground => self.driver.disable_all_actuators(),
            _ => {}
        }

        // replies go out after the snapshot so a caller never reads the old phase
        self.status.send_replace(self.snapshot(now));
        for (reply, res) in replies {
            // submitter may have given up waiting
            let _ = reply.send(res);
        }
        report
    }

    fn on_transition(&mut self, trans: PhaseTransition, now: TimeDelta, report: &mut TickReport) {
        if trans.from == MissionPhase::GuidanceActive && trans.to != MissionPhase::GuidanceActive {
            self.driver.release_thrusters();
        }
        match trans.to {
            MissionPhase::GuidanceActive => {
                self.controller.reset();
                report.guidance_reset = true;
            }
            MissionPhase::PyroFired => report.pyro = Some(self.driver.fire_pyros(now)),
            MissionPhase::Ground => self.driver.disable_all_actuators(),
            _ => {}
        }
        report.transitions.push(trans);
    }

    fn snapshot(&self, now: TimeDelta) -> MissionStatus {
        MissionStatus {
            phase: self.sequencer.phase(),
            at: now,
            left_thruster: self.driver.left_thruster_on(),
            right_thruster: self.driver.right_thruster_on(),
            pyro: self.driver.pyro_state(),
            pid_error: self.controller.last_error(),
            pid_output: self.controller.last_output(),
        }
    }

    /// Ticks every [`CONTROL_PERIOD`] until `cancel` fires, then forces all
    /// actuators off.
    pub async fn run(mut self, clock: MissionClock, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(CONTROL_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut next_log = clock.now();
        info!("Control loop running at {}ms period", CONTROL_PERIOD.as_millis());
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            let now = clock.now();
            self.tick(now);
            if now >= next_log {
                let s = self.snapshot(now);
                log!(
                    "T+{}ms {} | L:{} R:{} | err {:.2} out {:.3}",
                    now.num_milliseconds(),
                    s.phase,
                    u8::from(s.left_thruster),
                    u8::from(s.right_thruster),
                    s.pid_error,
                    s.pid_output
                );
                next_log = now + LOG_PERIOD;
            }
        }
        self.driver.disable_all_actuators();
        info!("Control loop stopped, all actuators disabled");
    }
}
