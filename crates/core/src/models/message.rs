//! Message model for channel transcripts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JudgeReport;

/// Display name used for system notices
pub const SYSTEM_SENDER: &str = "system";
/// Display name used for per-phase analysis
pub const MODERATOR_SENDER: &str = "AI Moderator";
/// Display name used for the final verdict
pub const JUDGE_SENDER: &str = "AI Judge";

/// Category of a message's sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    System,
    User,
    Ai,
    Judge,
}

/// One chat event in a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_kind: SenderKind,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Only present on the terminal verdict message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_report: Option<JudgeReport>,
}

impl ChatMessage {
    fn new(sender_kind: SenderKind, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_kind,
            sender: sender.into(),
            text: text.into(),
            timestamp: Utc::now(),
            judge_report: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(SenderKind::System, SYSTEM_SENDER, text)
    }

    pub fn user(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(SenderKind::User, sender, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(SenderKind::Ai, MODERATOR_SENDER, text)
    }

    pub fn judge(text: impl Into<String>, report: JudgeReport) -> Self {
        Self {
            judge_report: Some(report),
            ..Self::new(SenderKind::Judge, JUDGE_SENDER, text)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender_kind == SenderKind::User
    }

    pub fn format_timestamp(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}
