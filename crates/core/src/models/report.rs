//! Structured verdict issued once after the closing phase

use serde::{Deserialize, Serialize};

/// One named section of the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerdictField {
    WinnerDeclaration,
    ArgumentAnalysis,
    DebatePerformance,
    EvidenceLogic,
    Persuasiveness,
    KeyTurningPoints,
    FinalScore,
}

impl VerdictField {
    /// Sections in the order the judge is asked to write them
    pub const ALL: [VerdictField; 7] = [
        VerdictField::WinnerDeclaration,
        VerdictField::ArgumentAnalysis,
        VerdictField::DebatePerformance,
        VerdictField::EvidenceLogic,
        VerdictField::Persuasiveness,
        VerdictField::KeyTurningPoints,
        VerdictField::FinalScore,
    ];

    /// Section header as it appears in the prompt
    pub fn heading(self) -> &'static str {
        match self {
            VerdictField::WinnerDeclaration => "Winner Declaration",
            VerdictField::ArgumentAnalysis => "Argument Analysis",
            VerdictField::DebatePerformance => "Debate Performance",
            VerdictField::EvidenceLogic => "Evidence & Logic",
            VerdictField::Persuasiveness => "Persuasiveness",
            VerdictField::KeyTurningPoints => "Key Turning Points",
            VerdictField::FinalScore => "Final Score",
        }
    }

    /// Lowercase fragments that must all occur in a header
    pub(crate) fn keywords(self) -> &'static [&'static str] {
        match self {
            VerdictField::WinnerDeclaration => &["winner declaration"],
            VerdictField::ArgumentAnalysis => &["argument analysis"],
            VerdictField::DebatePerformance => &["debate performance"],
            VerdictField::EvidenceLogic => &["evidence", "logic"],
            VerdictField::Persuasiveness => &["persuasiveness"],
            VerdictField::KeyTurningPoints => &["key turning points"],
            VerdictField::FinalScore => &["final score"],
        }
    }
}

/// Judge verdict split into its seven sections. Missing sections stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeReport {
    pub winner_declaration: String,
    pub argument_analysis: String,
    pub debate_performance: String,
    pub evidence_logic: String,
    pub persuasiveness: String,
    pub key_turning_points: String,
    pub final_score: String,
}

impl JudgeReport {
    pub fn field(&self, field: VerdictField) -> &str {
        match field {
            VerdictField::WinnerDeclaration => &self.winner_declaration,
            VerdictField::ArgumentAnalysis => &self.argument_analysis,
            VerdictField::DebatePerformance => &self.debate_performance,
            VerdictField::EvidenceLogic => &self.evidence_logic,
            VerdictField::Persuasiveness => &self.persuasiveness,
            VerdictField::KeyTurningPoints => &self.key_turning_points,
            VerdictField::FinalScore => &self.final_score,
        }
    }

    pub fn field_mut(&mut self, field: VerdictField) -> &mut String {
        match field {
            VerdictField::WinnerDeclaration => &mut self.winner_declaration,
            VerdictField::ArgumentAnalysis => &mut self.argument_analysis,
            VerdictField::DebatePerformance => &mut self.debate_performance,
            VerdictField::EvidenceLogic => &mut self.evidence_logic,
            VerdictField::Persuasiveness => &mut self.persuasiveness,
            VerdictField::KeyTurningPoints => &mut self.key_turning_points,
            VerdictField::FinalScore => &mut self.final_score,
        }
    }

    /// Populated sections in prompt order
    pub fn sections(&self) -> impl Iterator<Item = (VerdictField, &str)> {
        VerdictField::ALL
            .into_iter()
            .map(|f| (f, self.field(f)))
            .filter(|(_, text)| !text.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }
}
