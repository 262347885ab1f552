#![allow(dead_code, clippy::similar_names)]
#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod command_reader;
mod config;
mod console_communication;
mod flight_control;
mod logger;

use crate::config::FlightConfig;
use crate::console_communication::ConsoleMessenger;
use crate::flight_control::{
    ControlLoop, MissionClock,
    actuation::{ActuatorConfig, ActuatorDriver, LoggedPins},
    guidance::{AttitudeController, SimulatedAttitude},
};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    info!("=== Polaris Payload System ===");
    let config = FlightConfig::from_env();
    info!(
        "PID gains kp={} ki={} kd={}, setpoint {} deg",
        config.gains.kp, config.gains.ki, config.gains.kd, config.setpoint_deg
    );

    let clock = MissionClock::start();
    let actuator_config = ActuatorConfig { pyro_hold: config.pyro_hold, ..ActuatorConfig::default() };
    let (control_loop, handle) = ControlLoop::new(
        AttitudeController::new(config.gains, config.setpoint_deg),
        ActuatorDriver::new(LoggedPins::default(), actuator_config),
        SimulatedAttitude::new(0.0, config.sim_seed),
        clock.now(),
    );
    info!("Actuators disabled, phase {}", handle.phase_text());

    let cancel = CancellationToken::new();
    let loop_task = tokio::spawn(control_loop.run(clock, cancel.clone()));

    let messenger = match ConsoleMessenger::start(&config.console_addr, handle.clone(), cancel.clone()).await {
        Ok(messenger) => Some(messenger),
        Err(e) => {
            error!("Console endpoint on {} unavailable: {e}", config.console_addr);
            None
        }
    };

    tokio::spawn(command_reader::run(
        BufReader::new(tokio::io::stdin()),
        handle.clone(),
        cancel.clone(),
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown requested in phase {}", handle.phase_text());
    cancel.cancel();
    if loop_task.await.is_err() {
        fatal!("Control loop panicked");
    }
    if messenger.is_some_and(|m| m.is_console_connected()) {
        warn!("Console still connected at shutdown");
    }
}
