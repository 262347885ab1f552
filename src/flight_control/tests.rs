use super::actuation::{ActuatorConfig, ActuatorDriver, LoggedPins, PyroFireResult, PyroState, Thruster};
use super::guidance::{AttitudeController, AttitudeSource, PidGains};
use super::sequencing::{MissionCommand, MissionPhase};
use super::{CommandError, CommandHandle, ControlLoop, MissionClock, TickReport};
use chrono::TimeDelta;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attitude source pinned at a constant heading, recording every `dt` it is fed.
#[derive(Debug, Default)]
struct FixedHeading {
    heading: f32,
    dts: Vec<f32>,
}

impl AttitudeSource for FixedHeading {
    fn sample(&mut self, dt: f32, _active: Option<Thruster>) -> f32 {
        self.dts.push(dt);
        self.heading
    }
}

type TestLoop = ControlLoop<LoggedPins, FixedHeading>;

fn ms(millis: i64) -> TimeDelta { TimeDelta::milliseconds(millis) }

fn setup(heading: f32) -> (TestLoop, CommandHandle) {
    ControlLoop::new(
        AttitudeController::new(PidGains::default(), 0.0),
        ActuatorDriver::new(LoggedPins::default(), ActuatorConfig::default()),
        FixedHeading { heading, dts: Vec::new() },
        ms(0),
    )
}

/// Ticks every 10 ms from `*now` (exclusive) up to `until` (inclusive).
fn run_until(control: &mut TestLoop, now: &mut TimeDelta, until: TimeDelta) -> Vec<TickReport> {
    let mut reports = Vec::new();
    while *now < until {
        *now += ms(10);
        reports.push(control.tick(*now));
    }
    reports
}

fn command(control: &mut TestLoop, handle: &CommandHandle, now: &mut TimeDelta, cmd: MissionCommand) -> TickReport {
    let mut rx = handle.submit(cmd).unwrap();
    *now += ms(10);
    let report = control.tick(*now);
    rx.try_recv().expect("reply sent during tick").expect("command accepted");
    report
}

#[test]
fn test_full_mission_profile() {
    let (mut control, handle) = setup(30.0);
    let mut now = ms(0);
    assert_eq!(handle.phase_text(), "GROUND");

    command(&mut control, &handle, &mut now, MissionCommand::Arm);
    assert_eq!(handle.phase_text(), "ARMED");
    command(&mut control, &handle, &mut now, MissionCommand::Launch);
    assert_eq!(handle.phase_text(), "ASCENT");
    let launch_t = now;

    let ascent = run_until(&mut control, &mut now, launch_t + ms(9_990));
    assert!(ascent.iter().all(|r| r.transitions.is_empty() && r.correction.is_none()));
    assert_eq!(control.sequencer().phase(), MissionPhase::Ascent);

    let report = control.tick({
        now += ms(10);
        now
    });
    assert_eq!(now - launch_t, ms(10_000));
    assert_eq!(control.sequencer().phase(), MissionPhase::GuidanceActive);
    assert!(report.guidance_reset);
    assert!(report.correction.is_some());
    assert_eq!(handle.phase_text(), "GNC_ACTIVE");
    let guidance_t = now;

    let mut reports = run_until(&mut control, &mut now, guidance_t + ms(14_990));
    assert!(reports.iter().all(|r| r.correction.is_some()));
    assert_eq!(control.sequencer().phase(), MissionPhase::GuidanceActive);
    // heading 30 deg right of a 0 deg setpoint: negative correction
    assert!(control.driver().right_thruster_on());
    assert!(handle.status().right_thruster);

    reports.extend(run_until(&mut control, &mut now, guidance_t + ms(15_000)));
    assert_eq!(control.sequencer().phase(), MissionPhase::PyroFired);
    assert_eq!(control.driver().active_thruster(), None);
    let pyro_t = now;

    reports.extend(run_until(&mut control, &mut now, pyro_t + ms(4_990)));
    assert_eq!(control.driver().pyro_state(), PyroState::Fired);
    assert_eq!(control.sequencer().phase(), MissionPhase::PyroFired);
    reports.extend(run_until(&mut control, &mut now, pyro_t + ms(5_000)));
    assert_eq!(control.sequencer().phase(), MissionPhase::Landed);
    assert_eq!(handle.phase_text(), "LANDED");

    let fires: Vec<_> = reports.iter().filter_map(|r| r.pyro).collect();
    assert_eq!(fires, [PyroFireResult::Fired]);

    run_until(&mut control, &mut now, pyro_t + ms(60_000));
    assert_eq!(control.sequencer().phase(), MissionPhase::Landed);
}

#[test]
fn test_rejected_command_reaches_submitter() {
    let (mut control, handle) = setup(0.0);
    let mut rx = handle.submit(MissionCommand::Launch).unwrap();
    let report = control.tick(ms(10));
    let err = rx.try_recv().unwrap().unwrap_err();
    assert_eq!(err.rejection_code(), "NOT_ARMED");
    assert_eq!(report.rejected, [err]);
    assert_eq!(control.sequencer().phase(), MissionPhase::Ground);
}

#[test]
fn test_commands_apply_in_queue_order() {
    let (mut control, handle) = setup(0.0);
    let _arm = handle.submit(MissionCommand::Arm).unwrap();
    let _launch = handle.submit(MissionCommand::Launch).unwrap();
    let report = control.tick(ms(10));
    assert_eq!(report.transitions.len(), 2);
    assert_eq!(control.sequencer().phase(), MissionPhase::Ascent);
}

#[test]
fn test_abort_during_guidance_disables_actuators() {
    let (mut control, handle) = setup(-45.0);
    let mut now = ms(0);
    command(&mut control, &handle, &mut now, MissionCommand::Arm);
    command(&mut control, &handle, &mut now, MissionCommand::Launch);
    let until = now + ms(10_000);
    run_until(&mut control, &mut now, until);
    assert_eq!(control.sequencer().phase(), MissionPhase::GuidanceActive);
    assert!(control.driver().left_thruster_on());

    // inside the minimum pulse window of the active thruster
    let report = command(&mut control, &handle, &mut now, MissionCommand::Abort);
    assert_eq!(report.transitions[0].to, MissionPhase::Ground);
    assert_eq!(control.driver().active_thruster(), None);
    assert_eq!(control.driver().pyro_state(), PyroState::Safe);
    assert_eq!(handle.phase_text(), "GROUND");
}

#[test]
fn test_guidance_reentry_resets_pid() {
    let (mut control, handle) = setup(30.0);
    let mut now = ms(0);
    command(&mut control, &handle, &mut now, MissionCommand::Arm);
    command(&mut control, &handle, &mut now, MissionCommand::Launch);
    let until = now + ms(11_000);
    run_until(&mut control, &mut now, until);
    assert!(control.controller().integral() < -20.0);

    command(&mut control, &handle, &mut now, MissionCommand::Abort);
    command(&mut control, &handle, &mut now, MissionCommand::Arm);
    command(&mut control, &handle, &mut now, MissionCommand::Launch);
    let until = now + ms(9_990);
    run_until(&mut control, &mut now, until);
    let report = control.tick({
        now += ms(10);
        now
    });
    assert!(report.guidance_reset);
    // one 10 ms step of a -30 deg error since the reset
    assert!((control.controller().integral() + 0.3).abs() < 1e-4);
    assert!((control.controller().last_error() + 30.0).abs() < 1e-4);
}

#[test]
fn test_dt_follows_wall_clock() {
    let (mut control, handle) = setup(10.0);
    let mut now = ms(0);
    command(&mut control, &handle, &mut now, MissionCommand::Arm);
    command(&mut control, &handle, &mut now, MissionCommand::Launch);
    let until = now + ms(10_000);
    run_until(&mut control, &mut now, until);
    control.tick(now + ms(13));
    control.tick(now + ms(20));
    let dts = &control.attitude().dts;
    let n = dts.len();
    assert!((dts[n - 2] - 0.013).abs() < 1e-6);
    assert!((dts[n - 1] - 0.007).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_serves_commands() {
    let clock = MissionClock::start();
    let (control, handle) = ControlLoop::new(
        AttitudeController::new(PidGains::default(), 0.0),
        ActuatorDriver::new(LoggedPins::default(), ActuatorConfig::default()),
        FixedHeading::default(),
        clock.now(),
    );
    let cancel = CancellationToken::new();
    let join = tokio::spawn(control.run(clock, cancel.clone()));

    let armed = handle.request(MissionCommand::Arm).await.unwrap();
    assert_eq!(armed.to, MissionPhase::Armed);
    let err = handle.request(MissionCommand::Arm).await.unwrap_err();
    assert!(matches!(err, CommandError::Rejected(e) if e.rejection_code() == "NOT_GROUND"));
    handle.request(MissionCommand::Launch).await.unwrap();
    assert_eq!(handle.phase_text(), "ASCENT");

    tokio::time::sleep(Duration::from_millis(10_050)).await;
    assert_eq!(handle.phase_text(), "GNC_ACTIVE");

    cancel.cancel();
    join.await.unwrap();
    assert_eq!(
        handle.request(MissionCommand::Abort).await.unwrap_err(),
        CommandError::LoopUnavailable
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_current_when_reply_arrives() {
    let clock = MissionClock::start();
    let (control, handle) = ControlLoop::new(
        AttitudeController::new(PidGains::default(), 0.0),
        ActuatorDriver::new(LoggedPins::default(), ActuatorConfig::default()),
        FixedHeading::default(),
        clock.now(),
    );
    let cancel = CancellationToken::new();
    let join = tokio::spawn(control.run(clock, cancel.clone()));

    let mut stale = 0;
    for _ in 0..50 {
        for cmd in [MissionCommand::Arm, MissionCommand::Abort] {
            let trans = handle.request(cmd).await.unwrap();
            if handle.phase_text() != trans.to.as_str() || handle.status().phase != trans.to {
                stale += 1;
            }
        }
    }
    assert_eq!(stale, 0);

    cancel.cancel();
    join.await.unwrap();
}
