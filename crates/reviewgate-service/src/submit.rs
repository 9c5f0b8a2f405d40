//! Review submission: validate → classify → decide → persist.

use std::sync::Arc;

use reviewgate_ai::{ClassifierGateway, Outcome};
use reviewgate_core::{ApprovalRule, ClassificationResult, NewReview, Review, decide};
use reviewgate_store::ReviewStore;
use serde::Deserialize;
use tracing::info;

use crate::ServiceError;

/// Submitted review fields as received; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewSubmission {
    pub business_id: Option<String>,
    pub reviewer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub content: Option<String>,
}

struct Validated {
    business_id: String,
    reviewer_name: String,
    phone: String,
    email: Option<String>,
    content: String,
}

impl ReviewSubmission {
    fn validate(self) -> Result<Validated, ServiceError> {
        fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
            match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        }

        let mut missing = Vec::new();
        let business_id = required(self.business_id, "business_id", &mut missing);
        let reviewer_name = required(self.reviewer_name, "reviewer_name", &mut missing);
        let phone = required(self.phone, "phone", &mut missing);
        let content = required(self.content, "content", &mut missing);
        if !missing.is_empty() {
            return Err(ServiceError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(Validated {
            business_id,
            reviewer_name,
            phone,
            email: self
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            content,
        })
    }
}

/// A persisted review plus the verdict that decided its status.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub review: Review,
    pub classification: ClassificationResult,
    /// True when the classifier answer was unusable and the conservative default applied.
    pub fallback: bool,
}

/// Create-review pipeline.
///
/// Either the review is fully persisted with a status, or nothing is written.
#[derive(Clone)]
pub struct Submitter {
    store: Arc<dyn ReviewStore>,
    classifier: ClassifierGateway,
    rule: ApprovalRule,
}

impl Submitter {
    pub fn new(store: Arc<dyn ReviewStore>, classifier: ClassifierGateway, rule: ApprovalRule) -> Self {
        Self {
            store,
            classifier,
            rule,
        }
    }

    pub async fn submit(&self, submission: ReviewSubmission) -> Result<SubmitOutcome, ServiceError> {
        let input = submission.validate()?;

        let outcome = self.classifier.classify_review(&input.content).await?;
        let fallback = matches!(outcome, Outcome::Fallback { .. });
        let classification = outcome.into_value();
        let status = decide(&classification, self.rule);

        let review = self
            .store
            .insert(NewReview {
                business_id: input.business_id,
                reviewer_name: input.reviewer_name,
                phone: input.phone,
                email: input.email,
                content: input.content,
                status,
                sentiment_score: classification.sentiment_score,
            })
            .await?;

        info!(
            review_id = review.id,
            business_id = %review.business_id,
            %status,
            safety = classification.safety_score,
            sentiment = classification.sentiment_score,
            fallback,
            "review submitted"
        );

        Ok(SubmitOutcome {
            review,
            classification,
            fallback,
        })
    }
}
