//! Phase controller
//!
//! `Debate` owns everything mutable about one channel: connected clients,
//! the transcript, the pending buffer and the phase bookkeeping. Every
//! operation mutates state and returns the deliveries it caused, in order.
//! The caller is expected to be the channel's single owner and to perform
//! those deliveries before handling the next operation, which gives every
//! client the same global message order.
//!
//! Submissions in an active phase are held back until every eligible
//! participant has committed one, then revealed together.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{ChatMessage, Client, ClientId, Phase, PhaseId};
use crate::notices;
use crate::prompts;
use crate::verdict::parse_verdict;

/// Reserved inbound value signalling lobby readiness
pub const ENGAGE_TOKEN: &str = "__ENGAGE__";

/// Participants needed to start a debate
pub const DEFAULT_SEATS: usize = 2;

/// A delivery produced by a state change
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Already appended to the transcript; deliver to every connected client
    Broadcast(ChatMessage),
    /// Deliver to one client only; never recorded
    Private(ClientId, ChatMessage),
    /// Run the analysis and report back through [`Debate::complete_analysis`]
    Analyze(AnalysisRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Moderator commentary on one completed phase
    Phase,
    /// Structured verdict after the closing phase
    Verdict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    pub phase: PhaseId,
    pub system_prompt: String,
    pub context: String,
}

/// Per-channel debate state
#[derive(Debug)]
pub struct Debate {
    seats: usize,
    clients: HashMap<ClientId, Client>,
    transcript: Vec<ChatMessage>,
    pending: Vec<ChatMessage>,
    phase: Phase,
    /// Names that have contributed, per phase
    contributions: HashMap<PhaseId, HashSet<String>>,
    /// User messages grouped by the phase they were revealed in
    record: BTreeMap<PhaseId, Vec<ChatMessage>>,
    awaiting: Option<AnalysisKind>,
}

impl Default for Debate {
    fn default() -> Self {
        Self::new(DEFAULT_SEATS)
    }
}

impl Debate {
    pub fn new(seats: usize) -> Self {
        Self {
            seats: seats.max(1),
            clients: HashMap::new(),
            transcript: Vec::new(),
            pending: Vec::new(),
            phase: Phase::lobby(),
            contributions: HashMap::new(),
            record: BTreeMap::new(),
            awaiting: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn occupancy(&self) -> usize {
        self.clients.len()
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    /// Capability-bearing clients currently connected
    pub fn active_participants(&self) -> usize {
        self.clients.values().filter(|c| c.can_send).count()
    }

    /// Distinct contributors in the given phase
    pub fn contributors(&self, phase: PhaseId) -> usize {
        self.contributions.get(&phase).map_or(0, HashSet::len)
    }

    pub fn has_contributed(&self, phase: PhaseId, name: &str) -> bool {
        self.contributions
            .get(&phase)
            .is_some_and(|names| names.contains(name))
    }

    /// Whether a connected participant already uses `name`. Contributions
    /// are tracked by name, so participant names must be unique.
    pub fn has_participant_named(&self, name: &str) -> bool {
        self.clients.values().any(|c| c.can_send && c.name == name)
    }

    /// Whether an analysis or verdict request is outstanding
    pub fn is_analyzing(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Contributors needed before the current phase flushes
    pub fn threshold(&self) -> usize {
        self.active_participants().max(self.seats)
    }

    /// An active phase that cannot complete with the participants now
    /// connected. Clears when a missing participant rejoins or when the
    /// phase is released explicitly.
    pub fn is_stalled(&self) -> bool {
        if !self.phase.id.is_active() || self.awaiting.is_some() {
            return false;
        }
        let mut possible: HashSet<&str> = self
            .contributions
            .get(&self.phase.id)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default();
        possible.extend(
            self.clients
                .values()
                .filter(|c| c.can_send)
                .map(|c| c.name.as_str()),
        );
        possible.len() < self.threshold()
    }

    /// Register a client and announce it
    pub fn add_client(&mut self, client: Client) -> Vec<Outbound> {
        let mut out = Vec::new();
        let name = client.name.clone();
        self.clients.insert(client.id, client);

        self.broadcast(&mut out, ChatMessage::system(notices::joined(&name)));
        if self.phase.id == PhaseId::Lobby && self.clients.len() == self.seats {
            self.broadcast(&mut out, ChatMessage::system(notices::ready_prompt(self.seats)));
        }

        self.check();
        out
    }

    /// Unregister a client and announce its departure. Unknown ids are
    /// ignored so that removal is idempotent.
    pub fn remove_client(&mut self, id: ClientId) -> Vec<Outbound> {
        let mut out = Vec::new();
        let Some(client) = self.clients.remove(&id) else {
            return out;
        };

        self.broadcast(&mut out, ChatMessage::system(notices::left(&client.name)));

        if self.phase.id.is_active() && self.awaiting.is_none() && client.can_send {
            if !self.pending.is_empty() && self.phase_complete() {
                self.flush(&mut out);
            } else if self.is_stalled() {
                tracing::warn!(phase = ?self.phase.id, name = %client.name, "Debate stalled");
                self.broadcast(&mut out, ChatMessage::system(notices::STALLED));
            }
        }

        self.check();
        out
    }

    /// Handle one inbound text frame from a client
    pub fn receive(&mut self, id: ClientId, text: &str) -> Vec<Outbound> {
        let mut out = Vec::new();
        let Some(client) = self.clients.get(&id) else {
            tracing::debug!(client_id = %id, "Inbound text from unknown client");
            return out;
        };

        if !client.can_send {
            let e = Error::ReadOnlyViolation;
            tracing::debug!(client_id = %id, error = %e, "Rejected inbound text");
            out.push(Outbound::Private(id, ChatMessage::system(notices::READ_ONLY)));
            return out;
        }

        if text == ENGAGE_TOKEN {
            self.engage(&mut out, id);
        } else if self.phase.id.is_active() {
            self.submit(&mut out, id, text);
        } else {
            let msg = ChatMessage::user(client.name.clone(), text);
            self.broadcast(&mut out, msg);
        }

        self.check();
        out
    }

    /// Feed back the outcome of an [`Outbound::Analyze`] request.
    ///
    /// A failed analysis is replaced by a fixed notice and the debate
    /// advances regardless. Stale or unexpected results are ignored.
    pub fn complete_analysis(
        &mut self,
        kind: AnalysisKind,
        phase: PhaseId,
        result: Result<String>,
    ) -> Vec<Outbound> {
        let mut out = Vec::new();
        if self.awaiting != Some(kind) || self.phase.id != phase {
            tracing::warn!(?kind, ?phase, current = ?self.phase.id, "Ignoring stale analysis result");
            return out;
        }
        self.awaiting = None;

        match kind {
            AnalysisKind::Phase => {
                let text = result.unwrap_or_else(|e| {
                    tracing::warn!(?phase, error = %e, "Phase analysis failed");
                    notices::ANALYSIS_FALLBACK.to_string()
                });
                self.broadcast(&mut out, ChatMessage::ai(notices::analysis(phase, &text)));
                self.advance(&mut out);
            }
            AnalysisKind::Verdict => {
                let text = result.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Final verdict failed");
                    notices::VERDICT_FALLBACK.to_string()
                });
                let report = parse_verdict(&text);
                self.broadcast(&mut out, ChatMessage::judge(notices::verdict(&text), report));
                self.conclude(&mut out);
            }
        }

        self.check();
        out
    }

    /// Complete the current phase with whatever has been submitted so far.
    /// Resolves a stalled phase; does nothing outside an active phase or
    /// while an analysis is outstanding.
    pub fn release_pending(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        if self.phase.id.is_active() && self.awaiting.is_none() {
            tracing::info!(phase = ?self.phase.id, pending = self.pending.len(), "Releasing phase");
            self.flush(&mut out);
        }
        self.check();
        out
    }

    fn broadcast(&mut self, out: &mut Vec<Outbound>, msg: ChatMessage) {
        if msg.is_user() {
            self.record.entry(self.phase.id).or_default().push(msg.clone());
        }
        self.transcript.push(msg.clone());
        out.push(Outbound::Broadcast(msg));
    }

    fn engage(&mut self, out: &mut Vec<Outbound>, id: ClientId) {
        if self.phase.id != PhaseId::Lobby {
            tracing::debug!(client_id = %id, phase = ?self.phase.id, "Engage outside the lobby");
            return;
        }
        let Some(client) = self.clients.get_mut(&id) else {
            return;
        };
        if client.ready {
            return;
        }
        client.ready = true;
        let name = client.name.clone();

        let ready = self
            .clients
            .values()
            .filter(|c| c.ready && c.can_send)
            .count();
        self.broadcast(
            out,
            ChatMessage::system(notices::ready_count(&name, ready, self.seats)),
        );

        if ready >= self.seats {
            self.set_phase(PhaseId::Opening);
            self.contributions.clear();
            self.pending.clear();
            self.broadcast(out, ChatMessage::system(notices::DEBATE_START));
            self.broadcast(
                out,
                ChatMessage::system(notices::phase_announcement(PhaseId::Opening)),
            );
        }
    }

    fn check_submission(&self, name: &str) -> Result<()> {
        if self.awaiting.is_some() {
            return Err(Error::AnalysisInFlight);
        }
        if self.has_contributed(self.phase.id, name) {
            return Err(Error::DuplicateSubmission);
        }
        Ok(())
    }

    fn submit(&mut self, out: &mut Vec<Outbound>, id: ClientId, text: &str) {
        let Some(name) = self.clients.get(&id).map(|c| c.name.clone()) else {
            return;
        };

        if let Err(e) = self.check_submission(&name) {
            tracing::debug!(client_id = %id, phase = ?self.phase.id, error = %e, "Rejected submission");
            let notice = match e {
                Error::AnalysisInFlight => notices::ANALYSIS_IN_FLIGHT,
                _ => notices::ALREADY_SUBMITTED,
            };
            out.push(Outbound::Private(id, ChatMessage::system(notice)));
            return;
        }

        self.pending.push(ChatMessage::user(name.clone(), text));
        self.contributions
            .entry(self.phase.id)
            .or_default()
            .insert(name);
        out.push(Outbound::Private(
            id,
            ChatMessage::system(notices::SUBMISSION_RECEIVED),
        ));

        if self.phase_complete() {
            self.flush(out);
        }
    }

    fn phase_complete(&self) -> bool {
        self.contributors(self.phase.id) >= self.threshold()
    }

    /// Reveal the pending buffer in submission order and request analysis
    fn flush(&mut self, out: &mut Vec<Outbound>) {
        let phase = self.phase.id;
        let batch = std::mem::take(&mut self.pending);
        for msg in &batch {
            self.broadcast(out, msg.clone());
        }

        let messages = self.phase_messages(phase);
        if messages.is_empty() {
            self.advance(out);
            return;
        }

        let context = prompts::phase_context(phase, &messages);
        self.broadcast(out, ChatMessage::system(notices::ANALYZING));
        self.awaiting = Some(AnalysisKind::Phase);
        out.push(Outbound::Analyze(AnalysisRequest {
            kind: AnalysisKind::Phase,
            phase,
            system_prompt: prompts::phase_prompt(phase).to_string(),
            context,
        }));
    }

    fn advance(&mut self, out: &mut Vec<Outbound>) {
        let next = self.phase.id.next();
        if next == PhaseId::Concluded {
            let debated = PhaseId::DEBATE
                .iter()
                .any(|p| self.record.get(p).is_some_and(|msgs| !msgs.is_empty()));
            if !debated {
                self.conclude(out);
                return;
            }
            self.awaiting = Some(AnalysisKind::Verdict);
            out.push(Outbound::Analyze(AnalysisRequest {
                kind: AnalysisKind::Verdict,
                phase: self.phase.id,
                system_prompt: prompts::verdict_prompt(),
                context: prompts::final_context(&self.record),
            }));
            return;
        }

        self.set_phase(next);
        self.contributions.insert(next, HashSet::new());
        self.broadcast(out, ChatMessage::system(notices::phase_announcement(next)));

        // A participant may have left while the previous analysis ran
        if self.is_stalled() {
            tracing::warn!(phase = ?next, "Debate stalled");
            self.broadcast(out, ChatMessage::system(notices::STALLED));
        }
    }

    /// Every user message so far from the phase's contributors
    fn phase_messages(&self, phase: PhaseId) -> Vec<ChatMessage> {
        let Some(names) = self.contributions.get(&phase) else {
            return Vec::new();
        };
        self.transcript
            .iter()
            .filter(|m| m.is_user() && names.contains(&m.sender))
            .cloned()
            .collect()
    }

    fn conclude(&mut self, out: &mut Vec<Outbound>) {
        self.set_phase(PhaseId::Concluded);
        self.pending.clear();
        self.broadcast(out, ChatMessage::system(notices::CONCLUSION));
    }

    fn set_phase(&mut self, next: PhaseId) {
        invariants::assert_phase_step(self.phase.id, next);
        tracing::info!(from = ?self.phase.id, to = ?next, "Phase transition");
        self.phase = Phase::begin(next);
    }

    fn check(&self) {
        invariants::assert_pending_invariants(
            self.phase.id,
            self.awaiting.is_some(),
            &self.pending,
            self.contributions.get(&self.phase.id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SenderKind;

    fn broadcasts(out: &[Outbound]) -> Vec<&ChatMessage> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Broadcast(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn privates(out: &[Outbound], id: ClientId) -> Vec<&str> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Private(to, m) if *to == id => Some(m.text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn request(out: &[Outbound]) -> Option<&AnalysisRequest> {
        out.iter().find_map(|o| match o {
            Outbound::Analyze(r) => Some(r),
            _ => None,
        })
    }

    /// Lobby with two participants, both engaged
    fn started() -> (Debate, ClientId, ClientId) {
        let mut debate = Debate::default();
        let a = Client::participant("a");
        let c = Client::participant("c");
        let (a_id, c_id) = (a.id, c.id);
        debate.add_client(a);
        debate.add_client(c);
        debate.receive(a_id, ENGAGE_TOKEN);
        debate.receive(c_id, ENGAGE_TOKEN);
        assert_eq!(debate.phase().id, PhaseId::Opening);
        (debate, a_id, c_id)
    }

    /// Both participants submit and the analysis comes back
    fn play_phase(debate: &mut Debate, a: ClientId, c: ClientId) -> Vec<Outbound> {
        let phase = debate.phase().id;
        let mut out = debate.receive(a, "point from a");
        out.extend(debate.receive(c, "point from c"));
        out.extend(debate.complete_analysis(AnalysisKind::Phase, phase, Ok("fine".into())));
        out
    }

    #[test]
    fn test_join_and_ready_prompt() {
        let mut debate = Debate::default();
        let out = debate.add_client(Client::participant("a"));
        assert_eq!(broadcasts(&out).len(), 1);
        assert_eq!(broadcasts(&out)[0].text, "a joined the chat");

        let out = debate.add_client(Client::observer("o"));
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.clone()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts[1].contains("ready"));
        assert_eq!(debate.occupancy(), 2);
    }

    #[test]
    fn test_occupancy_tracks_add_and_remove() {
        let mut debate = Debate::default();
        let a = Client::participant("a");
        let a_id = a.id;
        debate.add_client(a);
        debate.add_client(Client::observer("o"));

        let out = debate.remove_client(a_id);
        assert_eq!(broadcasts(&out)[0].text, "a left the chat");
        assert_eq!(debate.occupancy(), 1);

        // Second removal of the same client is a no-op
        assert!(debate.remove_client(a_id).is_empty());
        assert_eq!(debate.occupancy(), 1);
    }

    #[test]
    fn test_engage_starts_debate() {
        let mut debate = Debate::default();
        let a = Client::participant("a");
        let c = Client::participant("c");
        let (a_id, c_id) = (a.id, c.id);
        debate.add_client(a);
        debate.add_client(c);

        let out = debate.receive(a_id, ENGAGE_TOKEN);
        assert_eq!(broadcasts(&out).len(), 1);
        assert!(broadcasts(&out)[0].text.contains("(1/2 participants ready)"));
        assert_eq!(debate.phase().id, PhaseId::Lobby);

        // Repeat signal changes nothing
        assert!(debate.receive(a_id, ENGAGE_TOKEN).is_empty());

        let out = debate.receive(c_id, ENGAGE_TOKEN);
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.clone()).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("(2/2 participants ready)"));
        assert_eq!(texts[1], notices::DEBATE_START);
        assert!(texts[2].starts_with("Phase 1"));
        assert_eq!(debate.phase().id, PhaseId::Opening);
    }

    #[test]
    fn test_observer_cannot_engage_or_chat() {
        let mut debate = Debate::default();
        let a = Client::participant("a");
        let o = Client::observer("o");
        let (a_id, o_id) = (a.id, o.id);
        debate.add_client(a);
        debate.add_client(o);
        let before = debate.transcript().len();

        let out = debate.receive(o_id, ENGAGE_TOKEN);
        assert_eq!(privates(&out, o_id), vec![notices::READ_ONLY]);
        let out = debate.receive(o_id, "let me in");
        assert_eq!(privates(&out, o_id), vec![notices::READ_ONLY]);
        assert_eq!(debate.transcript().len(), before);

        // A lone ready participant does not start anything
        debate.receive(a_id, ENGAGE_TOKEN);
        assert_eq!(debate.phase().id, PhaseId::Lobby);
    }

    #[test]
    fn test_lobby_chat_is_immediate() {
        let mut debate = Debate::default();
        let a = Client::participant("a");
        let a_id = a.id;
        debate.add_client(a);

        let out = debate.receive(a_id, "anyone here?");
        assert_eq!(broadcasts(&out)[0].sender_kind, SenderKind::User);
        assert_eq!(debate.transcript().last().unwrap().text, "anyone here?");
    }

    #[test]
    fn test_simultaneous_reveal() {
        let (mut debate, a, c) = started();
        let before = debate.transcript().len();

        let out = debate.receive(a, "Hello");
        assert!(broadcasts(&out).is_empty());
        assert_eq!(privates(&out, a), vec![notices::SUBMISSION_RECEIVED]);
        assert_eq!(debate.transcript().len(), before);
        assert_eq!(debate.pending_len(), 1);

        let out = debate.receive(c, "Hi");
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "Hi", notices::ANALYZING]);
        assert_eq!(debate.pending_len(), 0);

        let req = request(&out).unwrap();
        assert_eq!(req.kind, AnalysisKind::Phase);
        assert_eq!(req.phase, PhaseId::Opening);
        assert!(req.context.contains("a: Hello\nc: Hi"));
        assert!(debate.is_analyzing());

        let out = debate.complete_analysis(AnalysisKind::Phase, PhaseId::Opening, Ok("solid".into()));
        let msgs = broadcasts(&out);
        assert_eq!(msgs[0].sender_kind, SenderKind::Ai);
        assert_eq!(msgs[0].text, "**Phase 1 Analysis**: solid");
        assert!(msgs[1].text.starts_with("Phase 2"));
        assert_eq!(debate.phase().id, PhaseId::Rebuttal);
        assert_eq!(debate.contributors(PhaseId::Rebuttal), 0);
    }

    #[test]
    fn test_duplicate_submission_rejected() {
        let (mut debate, a, _c) = started();
        debate.receive(a, "first");

        let out = debate.receive(a, "second");
        assert_eq!(privates(&out, a), vec![notices::ALREADY_SUBMITTED]);
        assert_eq!(debate.pending_len(), 1);
        assert_eq!(debate.contributors(PhaseId::Opening), 1);
    }

    #[test]
    fn test_submission_during_analysis_rejected() {
        let (mut debate, a, c) = started();
        debate.receive(a, "x");
        debate.receive(c, "y");
        assert!(debate.is_analyzing());

        let out = debate.receive(a, "too eager");
        assert_eq!(privates(&out, a), vec![notices::ANALYSIS_IN_FLIGHT]);
        assert_eq!(debate.pending_len(), 0);
    }

    #[test]
    fn test_failed_analysis_still_advances() {
        let (mut debate, a, c) = started();
        debate.receive(a, "x");
        debate.receive(c, "y");

        let out = debate.complete_analysis(
            AnalysisKind::Phase,
            PhaseId::Opening,
            Err(Error::AiUnavailable("timeout".into())),
        );
        assert_eq!(
            broadcasts(&out)[0].text,
            format!("**Phase 1 Analysis**: {}", notices::ANALYSIS_FALLBACK)
        );
        assert_eq!(debate.phase().id, PhaseId::Rebuttal);
    }

    #[test]
    fn test_stale_analysis_ignored() {
        let (mut debate, _a, _c) = started();
        let out = debate.complete_analysis(AnalysisKind::Phase, PhaseId::Opening, Ok("x".into()));
        assert!(out.is_empty());
        assert_eq!(debate.phase().id, PhaseId::Opening);
    }

    #[test]
    fn test_full_debate_concludes_with_verdict() {
        let (mut debate, a, c) = started();
        let mut seen = vec![debate.phase().id];
        for _ in 0..4 {
            play_phase(&mut debate, a, c);
            seen.push(debate.phase().id);
        }
        assert_eq!(seen, PhaseId::DEBATE.to_vec());

        // Closing phase: analysis, then verdict request
        debate.receive(a, "closing a");
        debate.receive(c, "closing c");
        let out = debate.complete_analysis(AnalysisKind::Phase, PhaseId::Closing, Ok("good".into()));
        assert_eq!(broadcasts(&out).len(), 1);
        let req = request(&out).unwrap();
        assert_eq!(req.kind, AnalysisKind::Verdict);
        assert!(req.context.contains("## Phase 5 - Closing Statements:"));
        assert!(req.context.contains("**a**: closing a"));
        assert_eq!(debate.phase().id, PhaseId::Closing);

        let verdict = "#### Winner Declaration\nc\n#### Final Score\nc 9, a 7\n";
        let out = debate.complete_analysis(AnalysisKind::Verdict, PhaseId::Closing, Ok(verdict.into()));
        let msgs = broadcasts(&out);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].sender_kind, SenderKind::Judge);
        let report = msgs[0].judge_report.as_ref().unwrap();
        assert_eq!(report.winner_declaration, "c");
        assert_eq!(report.final_score, "c 9, a 7");
        assert!(report.persuasiveness.is_empty());
        assert_eq!(msgs[1].sender_kind, SenderKind::System);
        assert_eq!(msgs[1].text, notices::CONCLUSION);
        assert_eq!(debate.phase().id, PhaseId::Concluded);

        // Input after the end is plain chat
        let out = debate.receive(a, "gg");
        assert_eq!(broadcasts(&out)[0].text, "gg");
        assert_eq!(debate.phase().id, PhaseId::Concluded);
        assert!(debate.release_pending().is_empty());
    }

    #[test]
    fn test_failed_verdict_yields_empty_report() {
        let (mut debate, a, c) = started();
        for _ in 0..5 {
            play_phase(&mut debate, a, c);
        }
        let out = debate.complete_analysis(
            AnalysisKind::Verdict,
            PhaseId::Closing,
            Err(Error::AiUnavailable("down".into())),
        );
        let judge = broadcasts(&out)[0];
        assert!(judge.text.contains(notices::VERDICT_FALLBACK));
        assert!(judge.judge_report.as_ref().unwrap().is_empty());
        assert_eq!(debate.phase().id, PhaseId::Concluded);
    }

    #[test]
    fn test_dropout_stalls_and_release_resolves() {
        let (mut debate, a, c) = started();
        debate.receive(a, "only me");

        let out = debate.remove_client(c);
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["c left the chat", notices::STALLED]);
        assert!(debate.is_stalled());
        assert_eq!(debate.pending_len(), 1);

        let out = debate.release_pending();
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["only me", notices::ANALYZING]);
        assert!(!debate.is_stalled());
        assert!(request(&out).is_some());
    }

    #[test]
    fn test_rejoin_clears_stall() {
        let (mut debate, a, c) = started();
        debate.remove_client(c);
        assert!(debate.is_stalled());

        let back = Client::participant("c");
        let back_id = back.id;
        debate.add_client(back);
        assert!(!debate.is_stalled());

        debate.receive(a, "x");
        let out = debate.receive(back_id, "y");
        assert!(request(&out).is_some());
    }

    #[test]
    fn test_phase_context_includes_earlier_chat_from_contributors() {
        let mut debate = Debate::default();
        let a = Client::participant("a");
        let c = Client::participant("c");
        let o = Client::observer("o");
        let (a_id, c_id, o_id) = (a.id, c.id, o.id);
        debate.add_client(a);
        debate.add_client(c);
        debate.add_client(o);
        let (a, c, o) = (a_id, c_id, o_id);
        debate.receive(a, "lobby claim from a");
        debate.receive(o, "observer aside");
        debate.receive(a, ENGAGE_TOKEN);
        debate.receive(c, ENGAGE_TOKEN);

        debate.receive(a, "Hello");
        let out = debate.receive(c, "Hi");
        let req = request(&out).unwrap();
        assert_eq!(
            req.context,
            "Phase 1 - Opening Statements:\n\na: lobby claim from a\na: Hello\nc: Hi\n"
        );

        for _ in 0..4 {
            let phase = debate.phase().id;
            debate.complete_analysis(AnalysisKind::Phase, phase, Ok("ok".into()));
            debate.receive(a, "more");
            debate.receive(c, "more");
        }
        let out = debate.complete_analysis(AnalysisKind::Phase, PhaseId::Closing, Ok("ok".into()));
        let req = request(&out).unwrap();
        assert_eq!(req.kind, AnalysisKind::Verdict);
        let lobby = req.context.find("## Lobby:\n**a**: lobby claim from a").unwrap();
        let opening = req.context.find("## Phase 1 - Opening Statements:").unwrap();
        assert!(lobby < opening);
    }

    #[test]
    fn test_leave_during_analysis_announces_stall_in_next_phase() {
        let (mut debate, a, c) = started();
        debate.receive(a, "x");
        debate.receive(c, "y");
        assert!(debate.is_analyzing());

        let out = debate.remove_client(c);
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["c left the chat"]);

        let out = debate.complete_analysis(AnalysisKind::Phase, PhaseId::Opening, Ok("ok".into()));
        let texts: Vec<_> = broadcasts(&out).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[1].starts_with("Phase 2"));
        assert_eq!(texts[2], notices::STALLED);
        assert!(debate.is_stalled());
    }

    #[test]
    fn test_observer_cannot_touch_active_phase() {
        let (mut debate, a, _c) = started();
        let o = Client::observer("o");
        let o_id = o.id;
        debate.add_client(o);
        debate.receive(a, "committed");
        let transcript = debate.transcript().len();

        for text in ["let me in", ENGAGE_TOKEN] {
            let out = debate.receive(o_id, text);
            assert!(broadcasts(&out).is_empty());
            assert_eq!(privates(&out, o_id), vec![notices::READ_ONLY]);
        }

        assert_eq!(debate.contributors(PhaseId::Opening), 1);
        assert_eq!(debate.pending_len(), 1);
        assert_eq!(debate.transcript().len(), transcript);
        assert!(!debate.has_contributed(PhaseId::Opening, "o"));
        assert!(!debate.is_analyzing());
    }

    #[test]
    fn test_participant_names_are_tracked() {
        let (debate, _a, _c) = started();
        assert!(debate.has_participant_named("a"));
        assert!(!debate.has_participant_named("Guest"));
    }

    #[test]
    fn test_transcript_is_append_only() {
        let (mut debate, a, c) = started();
        let snapshot: Vec<_> = debate.transcript().to_vec();
        play_phase(&mut debate, a, c);
        assert_eq!(&debate.transcript()[..snapshot.len()], snapshot.as_slice());
    }
}
