//! Debate phases

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage of the structured debate
///
/// Ordering follows the protocol: `Lobby < Opening < ... < Closing < Concluded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseId {
    Lobby,
    Opening,
    Rebuttal,
    Questions,
    Answers,
    Closing,
    Concluded,
}

impl PhaseId {
    /// The five turn-gated stages, in order
    pub const DEBATE: [PhaseId; 5] = [
        PhaseId::Opening,
        PhaseId::Rebuttal,
        PhaseId::Questions,
        PhaseId::Answers,
        PhaseId::Closing,
    ];

    /// Ordinal of the phase (0 for the lobby), `None` once concluded
    pub fn number(self) -> Option<u8> {
        match self {
            PhaseId::Lobby => Some(0),
            PhaseId::Opening => Some(1),
            PhaseId::Rebuttal => Some(2),
            PhaseId::Questions => Some(3),
            PhaseId::Answers => Some(4),
            PhaseId::Closing => Some(5),
            PhaseId::Concluded => None,
        }
    }

    /// Whether submissions are gated in this phase
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PhaseId::Opening
                | PhaseId::Rebuttal
                | PhaseId::Questions
                | PhaseId::Answers
                | PhaseId::Closing
        )
    }

    /// The following phase. `Concluded` is absorbing.
    pub fn next(self) -> PhaseId {
        match self {
            PhaseId::Lobby => PhaseId::Opening,
            PhaseId::Opening => PhaseId::Rebuttal,
            PhaseId::Rebuttal => PhaseId::Questions,
            PhaseId::Questions => PhaseId::Answers,
            PhaseId::Answers => PhaseId::Closing,
            PhaseId::Closing | PhaseId::Concluded => PhaseId::Concluded,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PhaseId::Lobby => "Lobby",
            PhaseId::Opening => "Opening Statements",
            PhaseId::Rebuttal => "Rebuttals",
            PhaseId::Questions => "Questions",
            PhaseId::Answers => "Answers",
            PhaseId::Closing => "Closing Statements",
            PhaseId::Concluded => "Concluded",
        }
    }

    /// Display-only time allowance
    pub fn nominal_duration(self) -> Duration {
        match self {
            PhaseId::Opening | PhaseId::Closing => Duration::from_secs(3 * 60),
            PhaseId::Rebuttal | PhaseId::Questions | PhaseId::Answers => {
                Duration::from_secs(2 * 60)
            }
            PhaseId::Lobby | PhaseId::Concluded => Duration::ZERO,
        }
    }
}

/// Current phase of a channel
#[derive(Debug, Clone)]
pub struct Phase {
    pub id: PhaseId,
    pub label: String,
    pub started_at: DateTime<Utc>,
    /// Recorded for display, never enforced
    pub duration: Duration,
}

impl Phase {
    pub fn begin(id: PhaseId) -> Self {
        let label = match id.number() {
            Some(n) => format!("Phase {}", n),
            None => "Concluded".to_string(),
        };
        Self {
            id,
            label,
            started_at: Utc::now(),
            duration: id.nominal_duration(),
        }
    }

    pub fn lobby() -> Self {
        Self::begin(PhaseId::Lobby)
    }
}
