//! System notice texts

use crate::models::PhaseId;

pub const READ_ONLY: &str = "You are read-only in this room.";
pub const ALREADY_SUBMITTED: &str =
    "You have already submitted your response for this phase. Please wait for the other participants.";
pub const SUBMISSION_RECEIVED: &str =
    "Your response has been submitted. Waiting for the other participants...";
pub const ANALYSIS_IN_FLIGHT: &str =
    "The moderator is still reviewing this phase. Please wait for the next phase to begin.";
pub const ANALYZING: &str = "The AI moderator is analyzing the responses...";
pub const ANALYSIS_FALLBACK: &str = "Unable to provide analysis at this time.";
pub const VERDICT_FALLBACK: &str = "Unable to provide final judgment at this time.";
pub const DEBATE_START: &str =
    "The debate begins! Both participants are ready. Let the discussion commence.";
pub const CONCLUSION: &str = "The debate has concluded. Thank you for participating!";
pub const STALLED: &str =
    "The debate is paused: this phase cannot complete until the missing participant returns.";

pub fn joined(name: &str) -> String {
    format!("{} joined the chat", name)
}

pub fn left(name: &str) -> String {
    format!("{} left the chat", name)
}

pub fn ready_prompt(seats: usize) -> String {
    format!(
        "{} participants have joined. Send the engage signal when you are ready to begin the debate.",
        seats
    )
}

pub fn ready_count(name: &str, ready: usize, seats: usize) -> String {
    format!(
        "{} is ready to engage! ({}/{} participants ready)",
        name, ready, seats
    )
}

pub fn phase_announcement(phase: PhaseId) -> String {
    let brief = match phase {
        PhaseId::Opening => "Each participant presents their initial arguments.",
        PhaseId::Rebuttal => "Participants respond to each other's opening statements.",
        PhaseId::Questions => "Participants ask each other a question.",
        PhaseId::Answers => "Participants answer the questions posed.",
        PhaseId::Closing => "Each participant summarises their key points.",
        PhaseId::Lobby | PhaseId::Concluded => return CONCLUSION.to_string(),
    };
    format!(
        "Phase {}: {} - {} You have {} minutes.",
        phase.number().unwrap_or_default(),
        phase.title(),
        brief,
        phase.nominal_duration().as_secs() / 60
    )
}

pub fn analysis(phase: PhaseId, text: &str) -> String {
    format!(
        "**Phase {} Analysis**: {}",
        phase.number().unwrap_or_default(),
        text
    )
}

pub fn verdict(text: &str) -> String {
    format!("**FINAL VERDICT**\n\n{}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_announcement() {
        assert_eq!(
            phase_announcement(PhaseId::Opening),
            "Phase 1: Opening Statements - Each participant presents their initial arguments. You have 3 minutes."
        );
        assert!(phase_announcement(PhaseId::Answers).starts_with("Phase 4"));
        assert_eq!(phase_announcement(PhaseId::Concluded), CONCLUSION);
    }

    #[test]
    fn test_analysis_prefix() {
        assert_eq!(analysis(PhaseId::Rebuttal, "ok"), "**Phase 2 Analysis**: ok");
    }
}
