use super::console_endpoint::{ConsoleEndpoint, ConsoleEvent};
use super::polaris_messages::{self, DownstreamContent, UpstreamContent};
use crate::flight_control::sequencing::MissionCommand;
use crate::flight_control::{CommandError, CommandHandle};
use crate::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Bridges ground consoles to the control loop: upstream commands go through
/// the [`CommandHandle`], status and telemetry go back downstream.
pub(crate) struct ConsoleMessenger {
    endpoint: Arc<ConsoleEndpoint>,
}

impl ConsoleMessenger {
    const TELEMETRY_INTERVAL: Duration = Duration::from_millis(1_000);

    pub(crate) async fn start(
        addr: &str,
        handle: CommandHandle,
        cancel: CancellationToken,
    ) -> Result<Self, std::io::Error> {
        let endpoint = Arc::new(ConsoleEndpoint::start(addr).await?);

        let mut receiver = endpoint.subscribe_upstream();
        let endpoint_local = Arc::clone(&endpoint);
        let handle_local = handle.clone();
        let cancel_local = cancel.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = cancel_local.cancelled() => break,
                    event = receiver.recv() => event,
                };
                match event {
                    Ok(ConsoleEvent::Message(content)) => {
                        if let Some(reply) = Self::handle_upstream(content, &handle_local).await {
                            endpoint_local.send_downstream(reply);
                        }
                    }
                    Ok(ConsoleEvent::Connected | ConsoleEvent::Disconnected) => {}
                    Err(RecvError::Lagged(n)) => warn!("Dropped {n} console events"),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let endpoint_local = Arc::clone(&endpoint);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Self::TELEMETRY_INTERVAL);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if endpoint_local.is_console_connected() {
                    endpoint_local.send_downstream(DownstreamContent::Telemetry(
                        polaris_messages::Telemetry::from(handle.status()),
                    ));
                }
            }
        });

        Ok(Self { endpoint })
    }

    pub(crate) fn is_console_connected(&self) -> bool { self.endpoint.is_console_connected() }

    pub(super) async fn handle_upstream(
        content: UpstreamContent,
        handle: &CommandHandle,
    ) -> Option<DownstreamContent> {
        let command = match content {
            UpstreamContent::Ping(ping) => {
                return Some(DownstreamContent::Pong(polaris_messages::Pong { echo: ping.echo }));
            }
            UpstreamContent::GetStatus(_) => {
                return Some(DownstreamContent::Status(polaris_messages::Status {
                    phase: handle.phase_text().to_string(),
                }));
            }
            UpstreamContent::Arm(_) => MissionCommand::Arm,
            UpstreamContent::Launch(_) => MissionCommand::Launch,
            UpstreamContent::Abort(_) => MissionCommand::Abort,
        };
        info!("Console command {command}");
        let response = match handle.request(command).await {
            Ok(trans) => polaris_messages::CommandResponse {
                success: true,
                phase: trans.to.as_str().to_string(),
                reason: String::new(),
            },
            Err(CommandError::Rejected(e)) => polaris_messages::CommandResponse {
                success: false,
                phase: handle.phase_text().to_string(),
                reason: e.rejection_code().to_string(),
            },
            Err(CommandError::LoopUnavailable) => {
                error!("Console command {command} dropped, control loop is down");
                return None;
            }
        };
        Some(DownstreamContent::CommandResponse(response))
    }
}
