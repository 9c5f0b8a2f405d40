//! Classifier verdicts: per-review safety/sentiment and top-K pin selections.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::review::ReviewId;

/// Maximum number of reviews pinned per business.
pub const TOP_K: usize = 3;

/// Action recommended by the classifier for a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Flag,
    Block,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Flag => "flag",
            Self::Block => "block",
        }
    }

    /// Case-insensitive parse of the classifier's action string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(Self::Allow),
            "flag" => Some(Self::Flag),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalised classifier verdict for one review.
///
/// Ephemeral: only `sentiment_score` and the derived status are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 0 = clearly safe, 1 = clearly unsafe.
    pub safety_score: f64,
    /// -1 = very negative, 1 = very positive.
    pub sentiment_score: f64,
    #[serde(rename = "recommended_action")]
    pub action: Action,
}

impl ClassificationResult {
    /// Conservative verdict used when the classifier's answer cannot be parsed.
    ///
    /// Resolves to `pending` under every approval rule, forcing manual review.
    pub const FALLBACK: Self = Self {
        safety_score: 0.5,
        sentiment_score: 0.0,
        action: Action::Flag,
    };

    /// Build a verdict with both scores clamped into their declared ranges.
    pub fn clamped(safety_score: f64, sentiment_score: f64, action: Action) -> Self {
        Self {
            safety_score: safety_score.clamp(0.0, 1.0),
            sentiment_score: sentiment_score.clamp(-1.0, 1.0),
            action,
        }
    }
}

/// Projection of an approved review sent to the classifier for top-K selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ReviewId,
    pub content: String,
    pub reviewer_name: String,
    pub sentiment_score: f64,
}

/// Ordered pick of reviews to pin, as returned by the classifier.
///
/// The ids are untrusted until validated against the business's eligible set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopSelection {
    pub top_review_ids: Vec<ReviewId>,
    pub reasoning: String,
}

impl TopSelection {
    pub fn empty(reasoning: impl Into<String>) -> Self {
        Self {
            top_review_ids: Vec::new(),
            reasoning: reasoning.into(),
        }
    }
}
