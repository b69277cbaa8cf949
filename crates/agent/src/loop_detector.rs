//! Loop detection over canonical action signatures.
//!
//! A probabilistic model will happily repeat itself. The detector keeps a
//! bounded window of the last action signatures per turn and flags, in
//! order of specificity:
//!
//! 1. immediate repeats (A -> A)
//! 2. short cycles (A -> B -> A)
//! 3. longer cycles (the signature three or four positions back)
//! 4. excessive repetition of the same signature across the turn
//!
//! A detector instance is created fresh per conversation turn and never
//! shared across turns.

use std::collections::{HashMap, VecDeque};
use tracing::warn;
use valet_core::action::Action;

/// Why an action was flagged as a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopReason {
    ImmediateRepeat,
    ShortCycle,
    CycleDetected,
    Repeated(u32),
}

impl std::fmt::Display for LoopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopReason::ImmediateRepeat => f.write_str("IMMEDIATE_REPEAT"),
            LoopReason::ShortCycle => f.write_str("SHORT_CYCLE"),
            LoopReason::CycleDetected => f.write_str("CYCLE_DETECTED"),
            LoopReason::Repeated(n) => write!(f, "REPEATED_{n}_TIMES"),
        }
    }
}

/// Per-turn loop detector state.
pub struct LoopDetector {
    history: VecDeque<String>,
    max_history: usize,
    max_repeats: u32,
    repeat_counts: HashMap<String, u32>,
}

impl LoopDetector {
    pub fn new(max_history: usize, max_repeats: u32) -> Self {
        Self {
            history: VecDeque::with_capacity(max_history),
            max_history,
            max_repeats,
            repeat_counts: HashMap::new(),
        }
    }

    /// Check a proposed action. Returns the loop reason if it would create
    /// a loop; otherwise records its signature and returns `None`.
    ///
    /// Detection order matters: the most specific, cheapest signal wins.
    /// Flagged actions are not recorded, so a rejected attempt does not
    /// poison the window.
    pub fn check(&mut self, action: &Action) -> Option<LoopReason> {
        let signature = action.signature();
        let n = self.history.len();

        // Level 1: immediate repetition (A -> A)
        if self.history.back() == Some(&signature) {
            warn!(tool = %action.tool, "Immediate repetition");
            return Some(LoopReason::ImmediateRepeat);
        }

        // Level 2: short cycle (A -> B -> A)
        if n >= 2 && self.history[n - 2] == signature {
            warn!(tool = %action.tool, "A-B-A cycle detected");
            return Some(LoopReason::ShortCycle);
        }

        // Level 3: longer cycle (A-B-C-A and similar)
        if n >= 4 && (self.history[n - 3] == signature || self.history[n - 4] == signature) {
            warn!(tool = %action.tool, "Cycle detected in history");
            return Some(LoopReason::CycleDetected);
        }

        // Level 4: excessive repetition across the whole turn
        let count = self.repeat_counts.entry(signature.clone()).or_insert(0);
        *count += 1;
        if *count > self.max_repeats {
            let count = *count;
            warn!(tool = %action.tool, count, "Excessive repetition");
            return Some(LoopReason::Repeated(count));
        }

        self.history.push_back(signature);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use valet_core::action::Params;

    fn action(tool: &str, query: &str) -> Action {
        let mut params = Params::new();
        params.insert("query".into(), json!(query));
        Action::new(tool, params)
    }

    fn detector() -> LoopDetector {
        LoopDetector::new(12, 2)
    }

    #[test]
    fn immediate_repeat_flagged() {
        let mut det = detector();
        let a = action("search", "bitcoin price");
        assert_eq!(det.check(&a), None);
        assert_eq!(det.check(&a), Some(LoopReason::ImmediateRepeat));
    }

    #[test]
    fn short_cycle_flagged() {
        let mut det = detector();
        let a = action("search", "first");
        let b = action("search", "second");
        assert_eq!(det.check(&a), None);
        assert_eq!(det.check(&b), None);
        assert_eq!(det.check(&a), Some(LoopReason::ShortCycle));
    }

    #[test]
    fn four_step_cycle_flagged() {
        let mut det = detector();
        assert_eq!(det.check(&action("search", "a")), None);
        assert_eq!(det.check(&action("search", "b")), None);
        assert_eq!(det.check(&action("search", "c")), None);
        assert_eq!(det.check(&action("search", "d")), None);
        // "a" is four positions back
        assert_eq!(
            det.check(&action("search", "a")),
            Some(LoopReason::CycleDetected)
        );
    }

    #[test]
    fn repetition_threshold_flagged_on_third_acceptance() {
        let mut det = detector();
        let a = action("search", "target");

        // Interleave enough distinct actions that cycle checks never fire
        assert_eq!(det.check(&a), None); // occurrence 1
        for q in ["f1", "f2", "f3", "f4"] {
            assert_eq!(det.check(&action("search", q)), None);
        }
        assert_eq!(det.check(&a), None); // occurrence 2
        for q in ["g1", "g2", "g3", "g4"] {
            assert_eq!(det.check(&action("search", q)), None);
        }
        // Third acceptance attempt exceeds the threshold of 2
        assert_eq!(det.check(&a), Some(LoopReason::Repeated(3)));
    }

    #[test]
    fn key_order_does_not_defeat_detection() {
        let mut det = detector();
        let mut p1 = Params::new();
        p1.insert("query".into(), json!("x"));
        p1.insert("limit".into(), json!(3));
        let mut p2 = Params::new();
        p2.insert("limit".into(), json!(3));
        p2.insert("query".into(), json!("x"));

        assert_eq!(det.check(&Action::new("search", p1)), None);
        assert_eq!(
            det.check(&Action::new("search", p2)),
            Some(LoopReason::ImmediateRepeat)
        );
    }

    #[test]
    fn history_is_bounded() {
        let mut det = LoopDetector::new(3, 100);
        for i in 0..50 {
            assert_eq!(det.check(&action("search", &format!("q{i}"))), None);
        }
        assert!(det.history.len() <= 3);
    }

    #[test]
    fn distinct_actions_never_flagged() {
        let mut det = detector();
        for i in 0..20 {
            assert_eq!(det.check(&action("search", &format!("q{i}"))), None);
        }
    }

    #[test]
    fn reason_display_matches_wire_format() {
        assert_eq!(LoopReason::ImmediateRepeat.to_string(), "IMMEDIATE_REPEAT");
        assert_eq!(LoopReason::Repeated(3).to_string(), "REPEATED_3_TIMES");
    }
}
