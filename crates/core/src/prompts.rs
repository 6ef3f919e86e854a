//! Moderator and judge prompts, and the transcript contexts sent with them

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{ChatMessage, PhaseId, VerdictField};
use crate::verdict::SECTION_MARKER;

const OPENING_PROMPT: &str = "You are reviewing the opening statements of a debate. Please:
1. Summarise the main argument each participant put forward
2. Identify the central positions and claims
3. Comment on how clear and well-structured each opening was
4. Flag logical fallacies or weak arguments
5. Note whether each statement stayed on topic
Be balanced and constructive, and stay under 200 words.";

const REBUTTAL_PROMPT: &str = "You are reviewing the rebuttals of a debate. Please:
1. Judge how directly each participant engaged the opponent's arguments
2. Identify effective counterarguments and refutations
3. Note any new evidence or points introduced
4. Point out opposing arguments that went unanswered
5. Assess the logical flow and persuasiveness of each rebuttal
Be balanced and constructive, and stay under 200 words.";

const QUESTIONS_PROMPT: &str = "You are reviewing the questioning round of a debate. Please:
1. Evaluate the quality and relevance of each question
2. Assess whether the questions challenge the opponent's key arguments
3. Note whether questions are fair or leading and hostile
4. Identify strategic questions that expose weaknesses
5. Flag questions that are off-topic or inappropriate
Be balanced and constructive, and stay under 200 words.";

const ANSWERS_PROMPT: &str = "You are reviewing the answers round of a debate. Please:
1. Evaluate how well each participant answered the question put to them
2. Note evasive or incomplete answers
3. Assess the honesty and directness of each response
4. Identify strong, evidence-based answers
5. Point out answers that brought in relevant new information
Be balanced and constructive, and stay under 200 words.";

const CLOSING_PROMPT: &str = "You are reviewing the closing statements of a debate. Please:
1. Evaluate how well each participant summarised their case
2. Assess the persuasiveness and impact of each closing
3. Note effective use of evidence and logic in the conclusions
4. Identify the strongest final point from each side
5. Give an overall view of which arguments were most compelling
Be balanced and constructive, and stay under 200 words.";

const MODERATOR_PROMPT: &str = "You are moderating this discussion. Summarise the main points in a \
balanced way, highlight the different perspectives and any consensus, and flag off-topic or \
inappropriate comments. Keep it short and neutral.";

/// System prompt for the analysis of one completed phase
pub fn phase_prompt(phase: PhaseId) -> &'static str {
    match phase {
        PhaseId::Opening => OPENING_PROMPT,
        PhaseId::Rebuttal => REBUTTAL_PROMPT,
        PhaseId::Questions => QUESTIONS_PROMPT,
        PhaseId::Answers => ANSWERS_PROMPT,
        PhaseId::Closing => CLOSING_PROMPT,
        PhaseId::Lobby | PhaseId::Concluded => MODERATOR_PROMPT,
    }
}

/// System prompt for the final verdict. Lists every section the parser
/// recognises, in order.
pub fn verdict_prompt() -> String {
    let mut prompt = String::from(
        "You are an impartial judge evaluating this complete debate. Give your verdict using \
         EXACTLY this structure and these section headers:\n",
    );

    for field in VerdictField::ALL {
        let _ = write!(
            prompt,
            "\n{} {}\n[{}]\n",
            SECTION_MARKER,
            field.heading(),
            section_guidance(field)
        );
    }

    prompt.push_str(
        "\nBe decisive and explain your reasoning. Keep the exact section headers above, \
         each introduced by ####.",
    );
    prompt
}

fn section_guidance(field: VerdictField) -> &'static str {
    match field {
        VerdictField::WinnerDeclaration => {
            "State which participant won, with a brief justification"
        }
        VerdictField::ArgumentAnalysis => "Evaluate the strongest and weakest arguments on each side",
        VerdictField::DebatePerformance => {
            "Assess how well each participant worked within the structured format"
        }
        VerdictField::EvidenceLogic => "Comment on evidence quality, reasoning and consistency",
        VerdictField::Persuasiveness => "Decide which viewpoint was most convincing",
        VerdictField::KeyTurningPoints => "Identify the moments that decided the outcome",
        VerdictField::FinalScore => "Score each participant out of 10 with a brief justification",
    }
}

/// Transcript excerpt for one phase
pub fn phase_context(phase: PhaseId, messages: &[ChatMessage]) -> String {
    let mut context = match phase.number() {
        Some(n) => format!("Phase {} - {}:\n\n", n, phase.title()),
        None => format!("{}:\n\n", phase.title()),
    };
    for msg in messages {
        let _ = writeln!(context, "{}: {}", msg.sender, msg.text);
    }
    context
}

/// Whole user transcript grouped by the phase each message was revealed
/// in. Lobby chat gets its own group ahead of the debate phases.
pub fn final_context(record: &BTreeMap<PhaseId, Vec<ChatMessage>>) -> String {
    let mut context = String::from("Complete Debate Transcript:\n=======================\n\n");

    for (phase, messages) in record {
        if messages.is_empty() {
            continue;
        }
        let _ = match phase.number() {
            Some(n) => writeln!(context, "## Phase {} - {}:", n, phase.title()),
            None => writeln!(context, "## {}:", phase.title()),
        };
        for msg in messages {
            let _ = write!(context, "**{}**: {}\n\n", msg.sender, msg.text);
        }
        context.push('\n');
    }

    context
}
