//! Review records as persisted in the `reviews` relation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned review identifier.
pub type ReviewId = i64;

/// Moderation status, set once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Neither clearly safe nor clearly unsafe; awaits manual review.
    Pending,
    /// Safe to display and eligible for pinning.
    Approved,
    /// Unsafe; never displayed.
    Flagged,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Flagged => "flagged",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown review status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for ReviewStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "flagged" => Ok(Self::Flagged),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A review ready to be inserted: submitted fields plus the moderation outcome.
///
/// The store assigns `id` and `created_at`; `pinned` always starts false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub business_id: String,
    pub reviewer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub content: String,
    pub status: ReviewStatus,
    pub sentiment_score: f64,
}

impl NewReview {
    /// Derived once at write time and never recomputed.
    pub fn is_positive(&self) -> bool {
        self.sentiment_score > 0.0
    }
}

/// A persisted review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub business_id: String,
    pub reviewer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub content: String,
    pub status: ReviewStatus,
    pub sentiment_score: f64,
    pub is_positive: bool,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Materialise a [`NewReview`] with the identity and timestamp the store assigned.
    pub fn from_new(id: ReviewId, created_at: DateTime<Utc>, new: NewReview) -> Self {
        let is_positive = new.is_positive();
        Self {
            id,
            business_id: new.business_id,
            reviewer_name: new.reviewer_name,
            phone: new.phone,
            email: new.email,
            content: new.content,
            status: new.status,
            sentiment_score: new.sentiment_score,
            is_positive,
            pinned: false,
            created_at,
        }
    }
}
