//! Moderation policy: maps a classifier verdict to a review status.
//!
//! Rules are applied in order, first match wins:
//!
//! 1. `allow` with `safety_score < 0.3` (plus `sentiment_score > 0.3` under
//!    [`ApprovalRule::SafetyAndSentiment`]) → `approved`
//! 2. `block`, or `safety_score >= 0.7` → `flagged`
//! 3. anything else → `pending`

use serde::{Deserialize, Serialize};

use crate::classification::{Action, ClassificationResult};
use crate::review::ReviewStatus;

/// Safety scores strictly below this may be auto-approved.
pub const APPROVE_BELOW: f64 = 0.3;
/// Safety scores at or above this are always flagged.
pub const FLAG_AT_OR_ABOVE: f64 = 0.7;
/// Minimum sentiment (exclusive) for [`ApprovalRule::SafetyAndSentiment`].
pub const MIN_APPROVAL_SENTIMENT: f64 = 0.3;

/// Which variant of the auto-approval rule is in force.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalRule {
    /// Approve on `allow` with low safety score; sentiment is informational.
    #[default]
    SafetyOnly,
    /// Additionally require clearly positive sentiment.
    SafetyAndSentiment,
}

/// Decide a review's status from its classification. Pure and total.
pub fn decide(result: &ClassificationResult, rule: ApprovalRule) -> ReviewStatus {
    let sentiment_ok = match rule {
        ApprovalRule::SafetyOnly => true,
        ApprovalRule::SafetyAndSentiment => result.sentiment_score > MIN_APPROVAL_SENTIMENT,
    };

    if result.action == Action::Allow && result.safety_score < APPROVE_BELOW && sentiment_ok {
        ReviewStatus::Approved
    } else if result.action == Action::Block || result.safety_score >= FLAG_AT_OR_ABOVE {
        ReviewStatus::Flagged
    } else {
        ReviewStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(safety: f64, sentiment: f64, action: Action) -> ClassificationResult {
        ClassificationResult {
            safety_score: safety,
            sentiment_score: sentiment,
            action,
        }
    }

    #[test]
    fn allow_with_low_safety_is_approved() {
        for safety in [0.0, 0.1, 0.2, 0.29, 0.2999] {
            let r = verdict(safety, -0.5, Action::Allow);
            assert_eq!(decide(&r, ApprovalRule::SafetyOnly), ReviewStatus::Approved, "{safety}");
        }
    }

    #[test]
    fn safety_exactly_point_three_is_not_approved() {
        let r = verdict(0.3, 0.9, Action::Allow);
        assert_eq!(decide(&r, ApprovalRule::SafetyOnly), ReviewStatus::Pending);
        assert_eq!(decide(&r, ApprovalRule::SafetyAndSentiment), ReviewStatus::Pending);
    }

    #[test]
    fn safety_exactly_point_seven_is_flagged() {
        for action in [Action::Allow, Action::Flag, Action::Block] {
            let r = verdict(0.7, 0.0, action);
            assert_eq!(decide(&r, ApprovalRule::SafetyOnly), ReviewStatus::Flagged);
        }
        let just_below = verdict(0.6999, 0.0, Action::Flag);
        assert_eq!(decide(&just_below, ApprovalRule::SafetyOnly), ReviewStatus::Pending);
    }

    #[test]
    fn high_safety_is_flagged_regardless_of_action() {
        for safety in [0.7, 0.8, 0.95, 1.0] {
            for action in [Action::Allow, Action::Flag, Action::Block] {
                let r = verdict(safety, 0.5, action);
                assert_eq!(decide(&r, ApprovalRule::SafetyOnly), ReviewStatus::Flagged);
            }
        }
    }

    #[test]
    fn block_is_flagged_regardless_of_safety() {
        for safety in [0.0, 0.3, 0.5, 0.69] {
            let r = verdict(safety, 0.9, Action::Block);
            assert_eq!(decide(&r, ApprovalRule::SafetyOnly), ReviewStatus::Flagged);
            assert_eq!(decide(&r, ApprovalRule::SafetyAndSentiment), ReviewStatus::Flagged);
        }
    }

    #[test]
    fn middle_ground_is_pending() {
        assert_eq!(
            decide(&verdict(0.5, 0.0, Action::Allow), ApprovalRule::SafetyOnly),
            ReviewStatus::Pending
        );
        assert_eq!(
            decide(&verdict(0.1, 0.9, Action::Flag), ApprovalRule::SafetyOnly),
            ReviewStatus::Pending
        );
    }

    #[test]
    fn fallback_is_pending_under_both_rules() {
        let r = ClassificationResult::FALLBACK;
        assert_eq!(decide(&r, ApprovalRule::SafetyOnly), ReviewStatus::Pending);
        assert_eq!(decide(&r, ApprovalRule::SafetyAndSentiment), ReviewStatus::Pending);
    }

    #[test]
    fn sentiment_gate_only_applies_to_strict_rule() {
        let lukewarm = verdict(0.1, 0.3, Action::Allow);
        assert_eq!(decide(&lukewarm, ApprovalRule::SafetyOnly), ReviewStatus::Approved);
        assert_eq!(
            decide(&lukewarm, ApprovalRule::SafetyAndSentiment),
            ReviewStatus::Pending
        );

        let happy = verdict(0.1, 0.31, Action::Allow);
        assert_eq!(
            decide(&happy, ApprovalRule::SafetyAndSentiment),
            ReviewStatus::Approved
        );
    }
}
