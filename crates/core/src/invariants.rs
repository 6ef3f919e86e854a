//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible debate states during
//! development. These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{ChatMessage, PhaseId};

/// Phases only ever move one step forward
pub fn assert_phase_step(from: PhaseId, to: PhaseId) {
    debug_assert!(
        to == from.next() && to != from,
        "Illegal phase transition {:?} -> {:?}",
        from,
        to
    );
}

/// The pending buffer only holds submissions of the current, open phase,
/// at most one per contributor.
pub fn assert_pending_invariants(
    phase: PhaseId,
    analyzing: bool,
    pending: &[ChatMessage],
    contributors: Option<&HashSet<String>>,
) {
    if pending.is_empty() {
        return;
    }

    debug_assert!(
        phase.is_active(),
        "{} pending messages outside an active phase ({:?})",
        pending.len(),
        phase
    );

    debug_assert!(
        !analyzing,
        "{} pending messages while analysis is outstanding",
        pending.len()
    );

    let contributed = contributors.map_or(0, HashSet::len);
    debug_assert!(
        pending.len() <= contributed,
        "{} pending messages but only {} contributors in {:?}",
        pending.len(),
        contributed,
        phase
    );

    for msg in pending {
        debug_assert!(
            msg.is_user(),
            "Non-user message from {} in pending buffer",
            msg.sender
        );
        debug_assert!(
            contributors.is_some_and(|names| names.contains(&msg.sender)),
            "Pending message from {} who is not a contributor",
            msg.sender
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_steps() {
        let mut phase = PhaseId::Lobby;
        while phase != PhaseId::Concluded {
            assert_phase_step(phase, phase.next());
            phase = phase.next();
        }
    }

    #[test]
    fn test_valid_pending() {
        let names: HashSet<String> = ["a".to_string()].into();
        let pending = vec![ChatMessage::user("a", "hi")];
        assert_pending_invariants(PhaseId::Opening, false, &pending, Some(&names));
        assert_pending_invariants(PhaseId::Lobby, false, &[], None);
    }

    #[test]
    #[should_panic(expected = "Illegal phase transition")]
    fn test_skipping_a_phase() {
        assert_phase_step(PhaseId::Opening, PhaseId::Questions);
    }

    #[test]
    #[should_panic(expected = "outside an active phase")]
    fn test_pending_in_lobby() {
        let names: HashSet<String> = ["a".to_string()].into();
        let pending = vec![ChatMessage::user("a", "hi")];
        assert_pending_invariants(PhaseId::Lobby, false, &pending, Some(&names));
    }
}
