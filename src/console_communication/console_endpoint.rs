use super::polaris_messages;
use crate::{info, warn};
use prost::Message;
use std::io::{Cursor, ErrorKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::net::tcp::{ReadHalf, WriteHalf};
use tokio::sync::{broadcast, oneshot};

/// Largest upstream frame accepted from a console.
const MAX_FRAME_LEN: u32 = 64 * 1024;

#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    Connected,
    Disconnected,
    Message(polaris_messages::UpstreamContent),
}

/// TCP endpoint for ground consoles. Frames are a big-endian `u32` length
/// followed by a protobuf message.
pub(crate) struct ConsoleEndpoint {
    downstream_sender: broadcast::Sender<Option<Vec<u8>>>,
    upstream_event_sender: broadcast::Sender<ConsoleEvent>,
    close_oneshot_sender: Option<oneshot::Sender<()>>,
}

impl ConsoleEndpoint {
    async fn handle_connection_rx(
        socket: &mut ReadHalf<'_>,
        upstream_event_sender: &broadcast::Sender<ConsoleEvent>,
    ) -> Result<(), std::io::Error> {
        loop {
            let length = socket.read_u32().await?;
            if length > MAX_FRAME_LEN {
                return Err(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("frame of {length} bytes exceeds limit"),
                ));
            }

            let mut buffer = vec![0u8; length as usize];
            socket.read_exact(&mut buffer).await?;

            match polaris_messages::Upstream::decode(&mut Cursor::new(buffer)) {
                Ok(polaris_messages::Upstream { content: Some(content) }) => {
                    let _ = upstream_event_sender.send(ConsoleEvent::Message(content));
                }
                Ok(_) => {}
                Err(e) => warn!("Dropping undecodable console frame: {e}"),
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    async fn handle_connection_tx(
        socket: &mut WriteHalf<'_>,
        downstream_receiver: &mut broadcast::Receiver<Option<Vec<u8>>>,
    ) -> Result<(), std::io::Error> {
        loop {
            match downstream_receiver.recv().await {
                Ok(Some(message_buffer)) => {
                    socket.write_u32(message_buffer.len() as u32).await?;
                    socket.write_all(&message_buffer).await?;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Console link lagging, skipped {n} downstream frames");
                }
                Ok(None) | Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Binds `addr` and starts accepting console connections in the background.
    pub(crate) async fn start(addr: &str) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("Console endpoint listening on {}", listener.local_addr()?);

        let downstream_sender = broadcast::Sender::new(32);
        let upstream_event_sender = broadcast::Sender::new(32);
        let (close_oneshot_sender, mut close_oneshot_receiver) = oneshot::channel();
        let inst = Self {
            downstream_sender: downstream_sender.clone(),
            upstream_event_sender: upstream_event_sender.clone(),
            close_oneshot_sender: Some(close_oneshot_sender),
        };

        tokio::spawn(async move {
            loop {
                let accept = tokio::select! {
                    accept = listener.accept() => accept,
                    _ = &mut close_oneshot_receiver => break
                };

                let Ok((mut socket, peer)) = accept else { break };
                info!("Console connected from {peer}");
                let _ = upstream_event_sender.send(ConsoleEvent::Connected);
                let upstream_event_sender_local = upstream_event_sender.clone();
                let mut downstream_receiver = downstream_sender.subscribe();

                tokio::spawn(async move {
                    let (mut rx_socket, mut tx_socket) = socket.split();

                    let result = tokio::select! {
                        res = ConsoleEndpoint::handle_connection_tx(&mut tx_socket, &mut downstream_receiver) => res,
                        res = ConsoleEndpoint::handle_connection_rx(&mut rx_socket, &upstream_event_sender_local) => res
                    };

                    let _ = upstream_event_sender_local.send(ConsoleEvent::Disconnected);
                    match result {
                        Err(e)
                            if e.kind() == ErrorKind::UnexpectedEof
                                || e.kind() == ErrorKind::ConnectionReset
                                || e.kind() == ErrorKind::ConnectionAborted =>
                        {
                            info!("Console {peer} disconnected");
                            return;
                        }
                        Err(e) => {
                            warn!("Closing connection to console {peer} due to {e:?}");
                        }
                        Ok(()) => {}
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });
        Ok(inst)
    }

    pub(crate) fn send_downstream(&self, msg: polaris_messages::DownstreamContent) {
        let _ = self.downstream_sender.send(Some(
            polaris_messages::Downstream { content: Some(msg) }.encode_to_vec(),
        ));
    }

    pub(crate) fn is_console_connected(&self) -> bool {
        self.downstream_sender.receiver_count() > 0
    }

    pub(crate) fn subscribe_upstream(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.upstream_event_sender.subscribe()
    }
}

impl Drop for ConsoleEndpoint {
    fn drop(&mut self) {
        if let Some(close) = self.close_oneshot_sender.take() {
            let _ = close.send(());
        }
        let _ = self.downstream_sender.send(None);
    }
}
