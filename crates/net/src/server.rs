//! TCP server for hosting debate channels
//!
//! A connection may create and list channels before it joins exactly one.
//! Once joined, inbound `Text` frames go to the channel task and the
//! client's outbound queue is forwarded to the socket by a single writer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rostrum_core::ChatMessage;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::registry::Registry;
use crate::session::Session;

/// Frames queued for one connection's writer
const WRITER_QUEUE_DEPTH: usize = 64;

/// How long a closing connection may spend flushing its last frames
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Debate server handle
pub struct Server {
    addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind `bind` and start accepting connections
    pub async fn start(bind: SocketAddr, registry: Arc<Registry>) -> Result<Self> {
        let listener = TcpListener::bind(bind).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(accept_loop(
            listener,
            registry.clone(),
            shutdown_tx.clone(),
        ));

        Ok(Server {
            addr: bound_addr,
            registry,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Stop accepting, drop pre-join connections and close every channel
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        self.registry.shutdown().await;
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<Registry>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            registry.clone(),
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<Registry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, writer) = tokio::io::split(stream);
    let (frame_tx, frame_rx) = mpsc::channel(WRITER_QUEUE_DEPTH);
    let writer_handle = tokio::spawn(writer_task(writer, frame_rx));

    let session = tokio::select! {
        result = negotiate(&mut reader, &frame_tx, &registry) => result,
        _ = shutdown_rx.recv() => Ok(None),
    };

    match session {
        Ok(Some(session)) => serve_session(session, &mut reader, &frame_tx, addr).await,
        Ok(None) => {}
        Err(Error::ConnectionClosed) => debug!(addr = %addr, "Closed before joining"),
        Err(e) => warn!(addr = %addr, error = %e, "Connection failed before joining"),
    }

    drop(frame_tx);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_handle)
        .await
        .is_err()
    {
        debug!(addr = %addr, "Writer did not drain in time");
    }
    debug!(addr = %addr, "Connection closed");
}

/// Pre-join exchange. Returns the joined session, or `None` when the
/// connection should be closed.
async fn negotiate(
    reader: &mut ReadHalf<TcpStream>,
    frames: &mpsc::Sender<ServerFrame>,
    registry: &Registry,
) -> Result<Option<Session>> {
    loop {
        let reply = match read_frame::<ClientFrame, _>(reader).await? {
            ClientFrame::CreateChannel { name, secret } => {
                match registry.create(&name, &secret).await {
                    Ok(handle) => ServerFrame::ChannelCreated {
                        name: handle.name().to_string(),
                        channel_id: handle.id(),
                    },
                    Err(e) => ServerFrame::Refused {
                        reason: e.to_string(),
                    },
                }
            }
            ClientFrame::ListChannels => ServerFrame::ChannelList {
                channels: registry.list().await,
            },
            ClientFrame::Ping => ServerFrame::Pong,
            ClientFrame::Join {
                channel,
                name,
                secret,
            } => {
                return match registry.join(&channel, &name, secret.as_deref()).await {
                    Ok(session) => {
                        let membership = session.membership();
                        let accepted = ServerFrame::JoinAccepted {
                            channel: membership.channel().name().to_string(),
                            channel_id: membership.channel().id(),
                            client_id: membership.client_id(),
                            can_send: membership.can_send(),
                        };
                        frames
                            .send(accepted)
                            .await
                            .map_err(|_| Error::ConnectionClosed)?;
                        Ok(Some(session))
                    }
                    Err(e) => {
                        info!(channel = %channel, name = %name, error = %e, "Join rejected");
                        let _ = frames
                            .send(ServerFrame::JoinRejected {
                                reason: e.to_string(),
                            })
                            .await;
                        Ok(None)
                    }
                };
            }
            ClientFrame::Text { .. } => ServerFrame::Refused {
                reason: "Join a channel first".into(),
            },
        };

        frames
            .send(reply)
            .await
            .map_err(|_| Error::ConnectionClosed)?;
    }
}

/// Relay frames between the socket and a joined channel until either
/// side goes away
async fn serve_session(
    session: Session,
    reader: &mut ReadHalf<TcpStream>,
    frames: &mpsc::Sender<ServerFrame>,
    addr: SocketAddr,
) {
    let (membership, outbox) = session.into_parts();
    let client_id = membership.client_id();
    let mut forward = tokio::spawn(forward_task(outbox, frames.clone()));

    loop {
        tokio::select! {
            result = read_frame::<ClientFrame, _>(reader) => match result {
                Ok(ClientFrame::Text { body }) => {
                    if membership.send(body).is_err() {
                        break;
                    }
                }
                Ok(ClientFrame::Ping) => {
                    let _ = frames.send(ServerFrame::Pong).await;
                }
                Ok(other) => {
                    debug!(client_id = %client_id, frame = ?other, "Ignoring frame after join");
                }
                Err(Error::ConnectionClosed) => {
                    debug!(client_id = %client_id, "Connection closed");
                    break;
                }
                Err(e) => {
                    warn!(client_id = %client_id, error = %e, "Read error");
                    break;
                }
            },
            // The channel closed this client's queue
            _ = &mut forward => break,
        }
    }

    drop(membership);
    forward.abort();
    info!(addr = %addr, client_id = %client_id, "Client disconnected");
}

/// Move channel messages onto the connection's writer queue
async fn forward_task(mut outbox: mpsc::Receiver<ChatMessage>, frames: mpsc::Sender<ServerFrame>) {
    while let Some(msg) = outbox.recv().await {
        if frames.send(ServerFrame::Message(msg)).await.is_err() {
            return;
        }
    }
    let _ = frames.send(ServerFrame::ServerShutdown).await;
}

/// Writer task - sole owner of the socket's write half
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<ServerFrame>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}
