use crate::flight_control::guidance::PidGains;
use crate::warn;
use chrono::TimeDelta;
use std::{env, str::FromStr};

/// Runtime configuration, read from `POLARIS_*` environment variables.
///
/// Timing constants of the sequencer are fixed at compile time; only tuning
/// and host settings live here.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightConfig {
    /// Bind address of the ground console endpoint.
    pub console_addr: String,
    pub gains: PidGains,
    /// Desired heading during guidance, degrees.
    pub setpoint_deg: f32,
    pub pyro_hold: TimeDelta,
    /// Seed of the simulated disturbance torque.
    pub sim_seed: u64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            console_addr: String::from("0.0.0.0:1337"),
            gains: PidGains::default(),
            setpoint_deg: 0.0,
            pyro_hold: TimeDelta::milliseconds(1_000),
            sim_seed: 0x504f_4c41,
        }
    }
}

impl FlightConfig {
    pub fn from_env() -> Self { Self::from_lookup(|key| env::var(key).ok()) }

    /// Builds the configuration from an arbitrary key lookup. Missing keys
    /// keep their default, unparsable ones are reported and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let def = Self::default();
        let gains = PidGains::new(
            parse_or(&lookup, "POLARIS_PID_KP", def.gains.kp),
            parse_or(&lookup, "POLARIS_PID_KI", def.gains.ki),
            parse_or(&lookup, "POLARIS_PID_KD", def.gains.kd),
        );
        let hold_ms: i64 = parse_or(&lookup, "POLARIS_PYRO_HOLD_MS", def.pyro_hold.num_milliseconds());
        Self {
            console_addr: lookup("POLARIS_CONSOLE_ADDR").unwrap_or(def.console_addr),
            gains,
            setpoint_deg: parse_or(&lookup, "POLARIS_SETPOINT_DEG", def.setpoint_deg),
            pyro_hold: TimeDelta::milliseconds(hold_ms.max(0)),
            sim_seed: parse_or(&lookup, "POLARIS_SIM_SEED", def.sim_seed),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring {key}={raw:?}, not a valid value");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(FlightConfig::from_lookup(|_| None), FlightConfig::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cfg = FlightConfig::from_lookup(lookup_from(&[
            ("POLARIS_PID_KP", " 2.5 "),
            ("POLARIS_PID_KD", "fast"),
            ("POLARIS_SETPOINT_DEG", "-90"),
            ("POLARIS_PYRO_HOLD_MS", "-20"),
            ("POLARIS_CONSOLE_ADDR", "127.0.0.1:4000"),
        ]));
        assert_eq!(cfg.gains, PidGains::new(2.5, 0.0, 0.1));
        assert_eq!(cfg.setpoint_deg, -90.0);
        assert_eq!(cfg.pyro_hold, TimeDelta::zero());
        assert_eq!(cfg.console_addr, "127.0.0.1:4000");
    }
}
