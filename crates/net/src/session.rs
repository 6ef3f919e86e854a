//! Channel sessions
//!
//! Each channel is driven by one task that exclusively owns its
//! [`Debate`] state and its [`Fanout`]. Joins, leaves, inbound text and
//! analysis results all arrive through one ordered inbox, and each command
//! is fully applied, transcript append and delivery included, before the
//! next one is taken. Analysis calls run in a separate task and report
//! back through the same inbox, so a slow model never blocks the channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rostrum_core::config::Config;
use rostrum_core::{
    AnalysisKind, AnalysisRequest, Analyst, ChannelInfo, ChannelSummary, ChatMessage, ClientId,
    Debate, Outbound, PhaseId, ENGAGE_TOKEN,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::fanout::Fanout;

/// Per-channel limits and timings
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub seats: usize,
    pub analysis_timeout: Duration,
    pub outbound_queue_depth: usize,
    pub max_clients: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ChannelSettings {
    fn from(config: &Config) -> Self {
        Self {
            seats: config.debate.seats,
            analysis_timeout: config.debate.analysis_timeout(),
            outbound_queue_depth: config.debate.outbound_queue_depth,
            max_clients: config.server.max_clients_per_channel,
        }
    }
}

/// Point-in-time view of a channel
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub id: Uuid,
    pub name: String,
    pub phase: PhaseId,
    pub phase_label: String,
    pub phase_started_at: DateTime<Utc>,
    pub occupancy: usize,
    pub participants: usize,
    pub contributors: usize,
    pub pending: usize,
    pub analyzing: bool,
    /// The current phase cannot complete with the participants connected
    pub stalled: bool,
    pub transcript: Vec<ChatMessage>,
}

impl ChannelSnapshot {
    pub fn summary(&self) -> ChannelSummary {
        ChannelSummary {
            id: self.id,
            name: self.name.clone(),
            occupancy: self.occupancy,
            phase: self.phase,
        }
    }
}

enum Command {
    Join {
        client: rostrum_core::Client,
        outbox: mpsc::Sender<ChatMessage>,
        reply: oneshot::Sender<Result<()>>,
    },
    Leave {
        client_id: ClientId,
    },
    Text {
        client_id: ClientId,
        text: String,
    },
    AnalysisDone {
        kind: AnalysisKind,
        phase: PhaseId,
        result: rostrum_core::Result<String>,
    },
    Release,
    Snapshot {
        reply: oneshot::Sender<ChannelSnapshot>,
    },
    Close,
}

/// Cloneable handle to a running channel
#[derive(Clone)]
pub struct ChannelHandle {
    info: Arc<ChannelInfo>,
    inbox: mpsc::UnboundedSender<Command>,
    queue_depth: usize,
}

impl ChannelHandle {
    /// Start the channel task
    pub(crate) fn spawn(
        info: ChannelInfo,
        settings: ChannelSettings,
        analyst: Arc<dyn Analyst>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let info = Arc::new(info);
        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        let queue_depth = settings.outbound_queue_depth.max(1);

        let actor = ChannelActor {
            info: info.clone(),
            debate: Debate::new(settings.seats),
            fanout: Fanout::new(info.name.clone()),
            analyst,
            settings,
            inbox: inbox.downgrade(),
            analysis: None,
        };
        tokio::spawn(actor.run(inbox_rx, shutdown));

        Self {
            info,
            inbox,
            queue_depth,
        }
    }

    pub fn id(&self) -> Uuid {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }

    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    /// Join the channel. A missing secret joins read-only; a wrong one is
    /// rejected before anything is registered. A participant name already
    /// in use by a connected participant is rejected too.
    pub async fn join(&self, name: &str, secret: Option<&str>) -> Result<Session> {
        // Argon2 verification is CPU-bound
        let info = self.info.clone();
        let secret = secret.map(str::to_string);
        let can_send =
            tokio::task::spawn_blocking(move || info.authorize(secret.as_deref())).await??;
        let client = rostrum_core::Client::new(name, can_send);
        let (client_id, name) = (client.id, client.name.clone());

        let (outbox_tx, outbox) = mpsc::channel(self.queue_depth);
        let (reply, accepted) = oneshot::channel();
        self.send(Command::Join {
            client,
            outbox: outbox_tx,
            reply,
        })?;

        accepted.await.map_err(|_| Error::ChannelClosed)??;

        Ok(Session {
            membership: Membership {
                client_id,
                name,
                can_send,
                channel: self.clone(),
            },
            outbox,
        })
    }

    pub async fn snapshot(&self) -> Result<ChannelSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn summary(&self) -> Result<ChannelSummary> {
        Ok(self.snapshot().await?.summary())
    }

    /// Complete the current phase with whatever has been submitted
    pub fn release_pending(&self) -> Result<()> {
        self.send(Command::Release)
    }

    /// Stop the channel task; connected clients see their queue close
    pub fn close(&self) {
        let _ = self.inbox.send(Command::Close);
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.inbox.send(cmd).map_err(|_| Error::ChannelClosed)
    }
}

/// A client's registration in a channel. Dropping it leaves the channel.
pub struct Membership {
    client_id: ClientId,
    name: String,
    can_send: bool,
    channel: ChannelHandle,
}

impl Membership {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn can_send(&self) -> bool {
        self.can_send
    }

    pub fn channel(&self) -> &ChannelHandle {
        &self.channel
    }

    /// Forward inbound text to the channel
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.channel.send(Command::Text {
            client_id: self.client_id,
            text: text.into(),
        })
    }

    /// Signal lobby readiness
    pub fn engage(&self) -> Result<()> {
        self.send(ENGAGE_TOKEN)
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        let _ = self.channel.inbox.send(Command::Leave {
            client_id: self.client_id,
        });
    }
}

/// A joined client: its membership plus its private outbound queue
pub struct Session {
    membership: Membership,
    outbox: mpsc::Receiver<ChatMessage>,
}

impl Session {
    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn client_id(&self) -> ClientId {
        self.membership.client_id
    }

    pub fn can_send(&self) -> bool {
        self.membership.can_send
    }

    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.membership.send(text)
    }

    pub fn engage(&self) -> Result<()> {
        self.membership.engage()
    }

    /// Next message for this client; `None` once the channel is gone
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.outbox.recv().await
    }

    /// Separate the sending side from the outbound queue
    pub fn into_parts(self) -> (Membership, mpsc::Receiver<ChatMessage>) {
        (self.membership, self.outbox)
    }
}

struct ChannelActor {
    info: Arc<ChannelInfo>,
    settings: ChannelSettings,
    debate: Debate,
    fanout: Fanout,
    analyst: Arc<dyn Analyst>,
    inbox: mpsc::WeakUnboundedSender<Command>,
    analysis: Option<JoinHandle<()>>,
}

impl ChannelActor {
    async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Command>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(channel = %self.info.name, channel_id = %self.info.id, "Channel started");

        loop {
            tokio::select! {
                cmd = inbox.recv() => match cmd {
                    Some(Command::Close) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                _ = shutdown.recv() => break,
            }
        }

        if let Some(task) = self.analysis.take() {
            task.abort();
        }
        self.fanout.close_all();
        info!(channel = %self.info.name, "Channel closed");
    }

    fn handle(&mut self, cmd: Command) {
        let outbound = match cmd {
            Command::Join {
                client,
                outbox,
                reply,
            } => {
                if self.debate.occupancy() >= self.settings.max_clients {
                    warn!(channel = %self.info.name, name = %client.name, "Channel full, join refused");
                    let _ = reply.send(Err(Error::Rejected("Channel is full".into())));
                    return;
                }
                if client.can_send && self.debate.has_participant_named(&client.name) {
                    warn!(channel = %self.info.name, name = %client.name, "Participant name taken, join refused");
                    let _ = reply.send(Err(Error::Rejected(format!(
                        "The name {} is already taken in this channel",
                        client.name
                    ))));
                    return;
                }
                if reply.send(Ok(())).is_err() {
                    // Joiner went away before registration
                    return;
                }
                info!(
                    channel = %self.info.name,
                    client_id = %client.id,
                    name = %client.name,
                    can_send = client.can_send,
                    "Client joined"
                );
                self.fanout.attach(client.id, outbox);
                self.debate.add_client(client)
            }
            Command::Leave { client_id } => {
                if !self.fanout.detach(client_id) {
                    return;
                }
                info!(channel = %self.info.name, client_id = %client_id, "Client left");
                self.debate.remove_client(client_id)
            }
            Command::Text { client_id, text } => self.debate.receive(client_id, &text),
            Command::AnalysisDone {
                kind,
                phase,
                result,
            } => {
                self.analysis = None;
                self.debate.complete_analysis(kind, phase, result)
            }
            Command::Release => self.debate.release_pending(),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                return;
            }
            Command::Close => return,
        };

        self.dispatch(outbound);
    }

    fn dispatch(&mut self, outbound: Vec<Outbound>) {
        for item in outbound {
            match item {
                Outbound::Broadcast(msg) => self.fanout.broadcast(&msg),
                Outbound::Private(client_id, msg) => self.fanout.send_to(client_id, msg),
                Outbound::Analyze(request) => self.start_analysis(request),
            }
        }
    }

    fn start_analysis(&mut self, request: AnalysisRequest) {
        let Some(inbox) = self.inbox.upgrade() else {
            return;
        };
        let analyst = self.analyst.clone();
        let timeout = self.settings.analysis_timeout;
        let channel = self.info.name.clone();

        debug!(channel = %channel, kind = ?request.kind, phase = ?request.phase, "Requesting analysis");
        self.analysis = Some(tokio::spawn(async move {
            let result = analyze_with_timeout(analyst.as_ref(), &request, timeout).await;
            if let Err(e) = &result {
                warn!(channel = %channel, kind = ?request.kind, error = %e, "Analysis unavailable");
            }
            let _ = inbox.send(Command::AnalysisDone {
                kind: request.kind,
                phase: request.phase,
                result,
            });
        }));
    }

    fn snapshot(&self) -> ChannelSnapshot {
        let phase = self.debate.phase();
        ChannelSnapshot {
            id: self.info.id,
            name: self.info.name.clone(),
            phase: phase.id,
            phase_label: phase.label.clone(),
            phase_started_at: phase.started_at,
            occupancy: self.debate.occupancy(),
            participants: self.debate.active_participants(),
            contributors: self.debate.contributors(phase.id),
            pending: self.debate.pending_len(),
            analyzing: self.debate.is_analyzing(),
            stalled: self.debate.is_stalled(),
            transcript: self.debate.transcript().to_vec(),
        }
    }
}

/// Run one analysis, turning a timeout into `AiUnavailable`
pub async fn analyze_with_timeout(
    analyst: &dyn Analyst,
    request: &AnalysisRequest,
    timeout: Duration,
) -> rostrum_core::Result<String> {
    match tokio::time::timeout(
        timeout,
        analyst.analyze(&request.system_prompt, &request.context),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(rostrum_core::Error::AiUnavailable(format!(
            "no response within {}s",
            timeout.as_secs()
        ))),
    }
}
