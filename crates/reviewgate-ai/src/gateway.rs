//! Prompt → backend → tolerant parse, with a hard timeout around the backend call.

use std::sync::Arc;
use std::time::Duration;

use reviewgate_core::{Candidate, ClassificationResult, TopSelection};
use tracing::{debug, error, warn};

use crate::parse::{self, Outcome};
use crate::prompt;
use crate::{ClassifierError, LlmBackend, Prompt};

/// What the classifier is asked to do.
#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    /// Safety/sentiment verdict for one review's content.
    SingleReview(&'a str),
    /// Pick up to [`TOP_K`](reviewgate_core::TOP_K) reviews to pin.
    TopKSelection(&'a [Candidate]),
}

/// Answer to a [`Mode`] request.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Review(Outcome<ClassificationResult>),
    Selection(Outcome<TopSelection>),
}

/// Classifier gateway shared by submission and ranking.
///
/// Provider failures (including timeouts) surface as [`ClassifierError`];
/// unusable answers resolve to [`Outcome::Fallback`]. No retries.
#[derive(Clone)]
pub struct ClassifierGateway {
    backend: Arc<dyn LlmBackend>,
    timeout: Duration,
}

impl ClassifierGateway {
    pub fn new(backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    pub async fn classify(&self, mode: Mode<'_>) -> Result<Verdict, ClassifierError> {
        match mode {
            Mode::SingleReview(content) => self.classify_review(content).await.map(Verdict::Review),
            Mode::TopKSelection(candidates) => {
                self.select_top(candidates).await.map(Verdict::Selection)
            }
        }
    }

    /// Classify one review's content.
    pub async fn classify_review(
        &self,
        content: &str,
    ) -> Result<Outcome<ClassificationResult>, ClassifierError> {
        let text = self.generate(&prompt::review_prompt(content)).await?;
        let outcome = parse::parse_assessment(&text);
        if let Outcome::Fallback { reason, .. } = &outcome {
            warn!(%reason, "unusable review classification, using conservative fallback");
        } else {
            debug!(verdict = ?outcome.value(), "review classified");
        }
        Ok(outcome)
    }

    /// Ask the classifier to choose the reviews to pin among `candidates`.
    ///
    /// An empty candidate list short-circuits without calling the backend.
    pub async fn select_top(
        &self,
        candidates: &[Candidate],
    ) -> Result<Outcome<TopSelection>, ClassifierError> {
        if candidates.is_empty() {
            return Ok(Outcome::Parsed(TopSelection::empty("no candidates")));
        }
        let text = self.generate(&prompt::selection_prompt(candidates)).await?;
        let outcome = parse::parse_selection(&text);
        if let Outcome::Fallback { reason, .. } = &outcome {
            warn!(%reason, candidates = candidates.len(), "unusable top-k selection, selecting nothing");
        }
        Ok(outcome)
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ClassifierError> {
        let result = match tokio::time::timeout(self.timeout, self.backend.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout),
        };
        if let Err(err) = &result {
            error!(model = self.backend.model_name(), error = %err, "classifier call failed");
        }
        result
    }
}
