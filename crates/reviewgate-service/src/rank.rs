//! Ranking selector: asks the classifier which approved reviews to pin, then repins.

use std::collections::HashSet;
use std::sync::Arc;

use reviewgate_ai::ClassifierGateway;
use reviewgate_core::{Candidate, ReviewId, TOP_K};
use reviewgate_store::ReviewStore;
use serde::Serialize;
use tracing::{error, info};

use crate::ServiceError;

/// Result of one rerank pass for a business.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankReport {
    pub business_id: String,
    pub pinned_count: usize,
    pub pinned_review_ids: Vec<ReviewId>,
    pub reasoning: String,
}

#[derive(Clone)]
pub struct RankingSelector {
    store: Arc<dyn ReviewStore>,
    classifier: ClassifierGateway,
}

impl RankingSelector {
    pub fn new(store: Arc<dyn ReviewStore>, classifier: ClassifierGateway) -> Self {
        Self { store, classifier }
    }

    /// Recompute the pinned set of a business.
    ///
    /// The pinned set is swapped with a single [`ReviewStore::repin`], so two
    /// overlapping reranks of one business never leave stale and new pins
    /// together. If the swap fails the previous pins stay in place.
    pub async fn rerank(&self, business_id: &str) -> Result<RerankReport, ServiceError> {
        let business_id = business_id.trim();
        if business_id.is_empty() {
            return Err(ServiceError::Validation("business_id is required".into()));
        }

        let eligible = self.store.approved_for_business(business_id).await?;
        if eligible.is_empty() {
            info!(business_id, "no approved reviews, nothing to rerank");
            return Ok(RerankReport {
                business_id: business_id.to_string(),
                pinned_count: 0,
                pinned_review_ids: Vec::new(),
                reasoning: "no approved reviews".to_string(),
            });
        }

        let candidates: Vec<Candidate> = eligible
            .iter()
            .map(|r| Candidate {
                id: r.id,
                content: r.content.clone(),
                reviewer_name: r.reviewer_name.clone(),
                sentiment_score: r.sentiment_score,
            })
            .collect();

        let selection = self.classifier.select_top(&candidates).await?.into_value();

        let eligible_ids: HashSet<ReviewId> = eligible.iter().map(|r| r.id).collect();
        let chosen = select_pins(&selection.top_review_ids, &eligible_ids);
        if chosen.len() < selection.top_review_ids.len() {
            info!(
                business_id,
                returned = ?selection.top_review_ids,
                applied = ?chosen,
                "dropped unknown, duplicate, or excess review ids"
            );
        }

        if let Err(err) = self.store.repin(business_id, &chosen).await {
            error!(business_id, error = %err, "repin failed, previous pins kept");
            return Err(err.into());
        }

        info!(business_id, pinned = ?chosen, eligible = eligible.len(), "reranked");
        Ok(RerankReport {
            business_id: business_id.to_string(),
            pinned_count: chosen.len(),
            pinned_review_ids: chosen,
            reasoning: selection.reasoning,
        })
    }
}

/// Validate the classifier's picks: keep ids from the eligible set, first
/// occurrence only, in returned order, at most [`TOP_K`].
pub fn select_pins(returned: &[ReviewId], eligible: &HashSet<ReviewId>) -> Vec<ReviewId> {
    let mut seen = HashSet::new();
    returned
        .iter()
        .copied()
        .filter(|id| eligible.contains(id) && seen.insert(*id))
        .take(TOP_K)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlakyStore, Scripted, gateway, provider_down};
    use reviewgate_core::ReviewStatus;
    use std::sync::atomic::Ordering;

    fn selector(store: Arc<FlakyStore>, backend: Arc<Scripted>) -> RankingSelector {
        RankingSelector::new(store, gateway(backend))
    }

    fn picks(ids: &[ReviewId]) -> String {
        serde_json::json!({ "top_review_ids": ids, "reasoning": "most detailed" }).to_string()
    }

    #[test]
    fn select_pins_filters_dedupes_and_caps() {
        let eligible: HashSet<ReviewId> = [1, 2, 3, 4, 5].into_iter().collect();
        assert_eq!(select_pins(&[5, 99, 5, 1, 2, 3], &eligible), vec![5, 1, 2]);
        assert_eq!(select_pins(&[42], &eligible), Vec::<ReviewId>::new());
        assert_eq!(select_pins(&[], &eligible), Vec::<ReviewId>::new());
    }

    #[tokio::test]
    async fn no_eligible_reviews_is_noop() {
        let store = FlakyStore::new();
        store.seed("b1", ReviewStatus::Pending, "waiting");
        store.seed("b1", ReviewStatus::Flagged, "rude");
        let backend = Scripted::new(vec![]);
        let report = selector(store.clone(), backend.clone()).rerank("b1").await.unwrap();

        assert_eq!(report.pinned_count, 0);
        assert!(report.pinned_review_ids.is_empty());
        assert_eq!(backend.calls(), 0);
        assert_eq!(store.updates.load(Ordering::SeqCst), 0, "no store update attempted");
    }

    #[tokio::test]
    async fn pins_selected_reviews() {
        let store = FlakyStore::new();
        let a = store.seed("b1", ReviewStatus::Approved, "Fixed the boiler in an hour");
        let b = store.seed("b1", ReviewStatus::Approved, "Good");
        let c = store.seed("b1", ReviewStatus::Approved, "Explained every step");
        let backend = Scripted::ok(&[&picks(&[c.id, a.id])]);

        let report = selector(store.clone(), backend.clone()).rerank("b1").await.unwrap();
        assert_eq!(report.pinned_review_ids, vec![c.id, a.id]);
        assert_eq!(report.pinned_count, 2);
        assert_eq!(report.reasoning, "most detailed");

        let mut expected = vec![a.id, c.id];
        expected.sort();
        assert_eq!(store.inner.pinned_ids("b1").unwrap(), expected);
        assert!(!store.inner.get(b.id).unwrap().pinned);

        let prompt = &backend.prompts.lock().unwrap()[0].text;
        assert!(prompt.contains("Fixed the boiler in an hour"));
    }

    #[tokio::test]
    async fn ids_from_other_businesses_are_excluded() {
        let store = FlakyStore::new();
        let mine = store.seed("b1", ReviewStatus::Approved, "mine");
        let theirs = store.seed("b2", ReviewStatus::Approved, "theirs");
        let hidden = store.seed("b1", ReviewStatus::Flagged, "flagged");
        let backend = Scripted::ok(&[&picks(&[theirs.id, 999, hidden.id, mine.id])]);

        let report = selector(store.clone(), backend).rerank("b1").await.unwrap();
        assert_eq!(report.pinned_review_ids, vec![mine.id]);
        assert!(!store.inner.get(theirs.id).unwrap().pinned);
        assert!(!store.inner.get(hidden.id).unwrap().pinned);
    }

    #[tokio::test]
    async fn more_than_three_ids_capped_in_returned_order() {
        let store = FlakyStore::new();
        let ids: Vec<ReviewId> = (0..5)
            .map(|i| store.seed("b1", ReviewStatus::Approved, &format!("r{i}")).id)
            .collect();
        let returned = vec![ids[4], ids[2], ids[0], ids[1], ids[3]];
        let backend = Scripted::ok(&[&picks(&returned)]);

        let report = selector(store.clone(), backend).rerank("b1").await.unwrap();
        assert_eq!(report.pinned_review_ids, vec![ids[4], ids[2], ids[0]]);
        assert_eq!(store.inner.pinned_ids("b1").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rerank_replaces_previous_pins() {
        let store = FlakyStore::new();
        let a = store.seed("b1", ReviewStatus::Approved, "a");
        let b = store.seed("b1", ReviewStatus::Approved, "b");
        let backend = Scripted::ok(&[&picks(&[a.id]), &picks(&[b.id])]);
        let sel = selector(store.clone(), backend);

        sel.rerank("b1").await.unwrap();
        assert_eq!(store.inner.pinned_ids("b1").unwrap(), vec![a.id]);
        sel.rerank("b1").await.unwrap();
        assert_eq!(store.inner.pinned_ids("b1").unwrap(), vec![b.id]);
    }

    #[tokio::test]
    async fn rerank_twice_same_answer_is_idempotent() {
        let store = FlakyStore::new();
        let a = store.seed("b1", ReviewStatus::Approved, "a");
        let b = store.seed("b1", ReviewStatus::Approved, "b");
        let answer = picks(&[b.id, a.id]);
        let sel = selector(store.clone(), Scripted::ok(&[&answer, &answer]));

        let first = sel.rerank("b1").await.unwrap();
        let pinned_once = store.inner.pinned_ids("b1").unwrap();
        let second = sel.rerank("b1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.inner.pinned_ids("b1").unwrap(), pinned_once);
    }

    #[tokio::test]
    async fn repin_failure_keeps_previous_pins() {
        let store = FlakyStore::new();
        let a = store.seed("b1", ReviewStatus::Approved, "a");
        let b = store.seed("b1", ReviewStatus::Approved, "b");
        store.inner.pin("b1", &[a.id]).await.unwrap();
        store.fail_repin.store(true, Ordering::SeqCst);

        let err = selector(store.clone(), Scripted::ok(&[&picks(&[b.id])]))
            .rerank("b1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert_eq!(store.updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.pinned_ids("b1").unwrap(), vec![a.id]);
    }

    #[tokio::test]
    async fn overlapping_reranks_never_mix_pin_sets() {
        let store = FlakyStore::new();
        let ids: Vec<ReviewId> = (0..6)
            .map(|i| store.seed("b1", ReviewStatus::Approved, &format!("r{i}")).id)
            .collect();
        let first = picks(&ids[..3]);
        let second = picks(&ids[3..]);
        let sel = selector(store.clone(), Scripted::ok(&[&first, &second]));

        let (x, y) = tokio::join!(sel.rerank("b1"), sel.rerank("b1"));
        x.unwrap();
        y.unwrap();

        let pinned = store.inner.pinned_ids("b1").unwrap();
        assert_eq!(pinned.len(), 3);
        assert!(pinned == ids[..3] || pinned == ids[3..], "{pinned:?}");
        assert_eq!(store.updates.load(Ordering::SeqCst), 2, "one store update per rerank");
    }

    #[tokio::test]
    async fn classifier_error_changes_nothing() {
        let store = FlakyStore::new();
        let a = store.seed("b1", ReviewStatus::Approved, "a");
        store.inner.pin("b1", &[a.id]).await.unwrap();

        let err = selector(store.clone(), Scripted::new(vec![Err(provider_down())]))
            .rerank("b1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Classifier(_)));
        assert_eq!(store.updates.load(Ordering::SeqCst), 0);
        assert_eq!(store.inner.pinned_ids("b1").unwrap(), vec![a.id]);
    }

    #[tokio::test]
    async fn unusable_selection_clears_pins() {
        let store = FlakyStore::new();
        let a = store.seed("b1", ReviewStatus::Approved, "a");
        store.inner.pin("b1", &[a.id]).await.unwrap();

        let report = selector(store.clone(), Scripted::ok(&["no idea"]))
            .rerank("b1")
            .await
            .unwrap();
        assert_eq!(report.pinned_count, 0);
        assert!(report.reasoning.starts_with("selection unavailable"));
        assert!(store.inner.pinned_ids("b1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_business_id_rejected() {
        let err = selector(FlakyStore::new(), Scripted::new(vec![]))
            .rerank("  ")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
