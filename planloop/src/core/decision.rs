//! Stop-or-replan rules for the deciding state.
//!
//! Deterministic given the attempt's disposition and the configured limits;
//! the lifecycle owns the consecutive parse-failure counter and passes it in.

use crate::core::types::AttemptDisposition;

/// Limits the deciding state enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionLimits {
    /// Attempt cap for one run.
    pub max_attempts: u32,
    /// Consecutive unparseable oracle responses tolerated before the planner
    /// is declared unusable.
    pub parse_failure_limit: u32,
}

/// What the lifecycle should do after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Request a new plan from the oracle.
    Replan,
    /// The goal is met; stop.
    Succeed,
    /// Attempt cap reached without success.
    Exhausted,
    /// The oracle returned unparseable output too many times in a row. This
    /// distinguishes a broken planner from a stream of bad plans.
    PlannerUnusable { consecutive: u32 },
}

/// Decide the next transition after `attempt` finished with `disposition`.
///
/// Checks in order: success, then the attempt cap, then the consecutive
/// parse-failure limit. The cap wins when both limits trip on one attempt.
pub fn decide(
    disposition: &AttemptDisposition,
    attempt: u32,
    consecutive_parse_failures: u32,
    limits: &DecisionLimits,
) -> Decision {
    if matches!(disposition, AttemptDisposition::Succeeded) {
        return Decision::Succeed;
    }
    if attempt >= limits.max_attempts {
        return Decision::Exhausted;
    }
    if consecutive_parse_failures >= limits.parse_failure_limit {
        return Decision::PlannerUnusable {
            consecutive: consecutive_parse_failures,
        };
    }
    Decision::Replan
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: DecisionLimits = DecisionLimits {
        max_attempts: 3,
        parse_failure_limit: 2,
    };

    #[test]
    fn success_stops_immediately_even_on_the_last_attempt() {
        let decision = decide(&AttemptDisposition::Succeeded, 3, 0, &LIMITS);
        assert_eq!(decision, Decision::Succeed);
    }

    #[test]
    fn rejected_attempts_replan_until_the_cap() {
        assert_eq!(decide(&AttemptDisposition::Rejected, 1, 0, &LIMITS), Decision::Replan);
        assert_eq!(decide(&AttemptDisposition::Rejected, 2, 0, &LIMITS), Decision::Replan);
        assert_eq!(decide(&AttemptDisposition::Rejected, 3, 0, &LIMITS), Decision::Exhausted);
    }

    #[test]
    fn execution_failures_also_replan() {
        let decision = decide(&AttemptDisposition::ExecutedWithFailures, 1, 0, &LIMITS);
        assert_eq!(decision, Decision::Replan);
    }

    #[test]
    fn consecutive_parse_failures_hit_the_planner_limit() {
        let failure = AttemptDisposition::ParseFailure { reason: "noise".to_string() };
        assert_eq!(decide(&failure, 1, 1, &LIMITS), Decision::Replan);
        assert_eq!(
            decide(&failure, 2, 2, &LIMITS),
            Decision::PlannerUnusable { consecutive: 2 }
        );
    }

    #[test]
    fn attempt_cap_takes_precedence_over_parse_failure_limit() {
        let failure = AttemptDisposition::ParseFailure { reason: "noise".to_string() };
        assert_eq!(decide(&failure, 3, 2, &LIMITS), Decision::Exhausted);
    }
}
