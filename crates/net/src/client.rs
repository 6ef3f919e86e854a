//! TCP client for a debate server
//!
//! The socket is split between a reader task that turns frames into
//! [`ClientEvent`]s and a writer task that owns the write half.

use std::net::SocketAddr;

use rostrum_core::{ChannelSummary, ChatMessage, ENGAGE_TOKEN};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientFrame, ServerFrame};

/// Event received from the server
#[derive(Debug, Clone)]
pub enum ClientEvent {
    ChannelCreated { name: String, channel_id: Uuid },
    Channels(Vec<ChannelSummary>),
    Refused { reason: String },
    /// Successfully joined a channel
    Joined {
        channel: String,
        channel_id: Uuid,
        client_id: Uuid,
        can_send: bool,
    },
    JoinRejected { reason: String },
    Message(ChatMessage),
    Pong,
    /// The channel or server is going away
    ServerShutdown,
    /// Connection lost
    Disconnected,
}

impl From<ServerFrame> for ClientEvent {
    fn from(frame: ServerFrame) -> Self {
        match frame {
            ServerFrame::ChannelCreated { name, channel_id } => {
                ClientEvent::ChannelCreated { name, channel_id }
            }
            ServerFrame::ChannelList { channels } => ClientEvent::Channels(channels),
            ServerFrame::Refused { reason } => ClientEvent::Refused { reason },
            ServerFrame::JoinAccepted {
                channel,
                channel_id,
                client_id,
                can_send,
            } => ClientEvent::Joined {
                channel,
                channel_id,
                client_id,
                can_send,
            },
            ServerFrame::JoinRejected { reason } => ClientEvent::JoinRejected { reason },
            ServerFrame::Message(msg) => ClientEvent::Message(msg),
            ServerFrame::Pong => ClientEvent::Pong,
            ServerFrame::ServerShutdown => ClientEvent::ServerShutdown,
        }
    }
}

/// Client handle for network operations
pub struct Client {
    frames: mpsc::Sender<ClientFrame>,
    events: mpsc::Receiver<ClientEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Client {
    /// Connect to a debate server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let (event_tx, events) = mpsc::channel(256);
        let (frames, frame_rx) = mpsc::channel(64);

        Ok(Client {
            frames,
            events,
            reader: tokio::spawn(reader_task(reader, event_tx)),
            writer: tokio::spawn(writer_task(writer, frame_rx)),
        })
    }

    /// Get the next server event; `None` after `Disconnected` was delivered
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    pub async fn create_channel(&self, name: &str, secret: &str) -> Result<()> {
        self.send(ClientFrame::CreateChannel {
            name: name.to_string(),
            secret: secret.to_string(),
        })
        .await
    }

    pub async fn list_channels(&self) -> Result<()> {
        self.send(ClientFrame::ListChannels).await
    }

    /// Join a channel; without a secret the client is read-only
    pub async fn join(&self, channel: &str, name: &str, secret: Option<&str>) -> Result<()> {
        self.send(ClientFrame::Join {
            channel: channel.to_string(),
            name: name.to_string(),
            secret: secret.map(str::to_string),
        })
        .await
    }

    pub async fn send_text(&self, body: impl Into<String>) -> Result<()> {
        self.send(ClientFrame::Text { body: body.into() }).await
    }

    /// Signal lobby readiness
    pub async fn engage(&self) -> Result<()> {
        self.send_text(ENGAGE_TOKEN).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.send(ClientFrame::Ping).await
    }

    /// Close the connection
    pub fn disconnect(self) {
        self.reader.abort();
        self.writer.abort();
    }

    async fn send(&self, frame: ClientFrame) -> Result<()> {
        self.frames
            .send(frame)
            .await
            .map_err(|_| Error::ConnectionClosed)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn reader_task(mut reader: ReadHalf<TcpStream>, events: mpsc::Sender<ClientEvent>) {
    loop {
        match read_frame::<ServerFrame, _>(&mut reader).await {
            Ok(frame) => {
                if events.send(frame.into()).await.is_err() {
                    return;
                }
            }
            Err(Error::ConnectionClosed) => {
                debug!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        }
    }
    let _ = events.send(ClientEvent::Disconnected).await;
}

async fn writer_task(mut writer: WriteHalf<TcpStream>, mut frames: mpsc::Receiver<ClientFrame>) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}
