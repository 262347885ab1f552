use crate::flight_control::sequencing::MissionCommand;
use crate::flight_control::{CommandError, CommandHandle};
use crate::{error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

/// A line typed by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorLine {
    Command(MissionCommand),
    Status,
    Empty,
    Unknown,
}

/// Parses one operator line, ignoring case and surrounding whitespace.
pub fn parse_line(line: &str) -> OperatorLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        OperatorLine::Empty
    } else if trimmed.eq_ignore_ascii_case("STATUS") {
        OperatorLine::Status
    } else {
        trimmed.parse().map_or(OperatorLine::Unknown, OperatorLine::Command)
    }
}

/// Feeds operator lines from `input` into the control loop until EOF or
/// cancellation.
pub async fn run<R: AsyncBufRead + Unpin>(input: R, handle: CommandHandle, cancel: CancellationToken) {
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Command input failed: {e}");
                break;
            }
        };
        match parse_line(&line) {
            OperatorLine::Command(command) => match handle.request(command).await {
                Ok(trans) => info!("{command} accepted, phase {}", trans.to),
                Err(CommandError::Rejected(e)) => warn!("{e}"),
                Err(CommandError::LoopUnavailable) => {
                    error!("Control loop is down, command reader stopping");
                    break;
                }
            },
            OperatorLine::Status => info!("STATUS {}", handle.phase_text()),
            OperatorLine::Empty => {}
            OperatorLine::Unknown => warn!("Unknown command {:?}, expected ARM, LAUNCH, ABORT or STATUS", line.trim()),
        }
    }
}
