//! Read path: approved reviews in display order, with optional session anchor.

use std::sync::Arc;

use reviewgate_core::{Review, ReviewId};
use reviewgate_store::ReviewStore;
use tracing::debug;

use crate::ServiceError;

#[derive(Clone)]
pub struct ReadAssembler {
    store: Arc<dyn ReviewStore>,
}

impl ReadAssembler {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// Approved reviews of a business ordered `pinned desc, created_at desc`.
    ///
    /// When `anchor` names one of them, that review is moved to the front and
    /// the rest keep their order. Unknown or non-approved anchors are ignored.
    pub async fn list(
        &self,
        business_id: &str,
        anchor: Option<ReviewId>,
    ) -> Result<Vec<Review>, ServiceError> {
        let business_id = business_id.trim();
        if business_id.is_empty() {
            return Err(ServiceError::Validation("business_id is required".into()));
        }

        let mut reviews = self.store.approved_for_business(business_id).await?;
        if let Some(anchor) = anchor {
            let moved = float_to_front(&mut reviews, anchor);
            debug!(business_id, anchor, moved, "applied session anchor");
        }
        Ok(reviews)
    }
}

/// Move the review with id `anchor` to index 0, keeping everything else in
/// place relative to each other. Returns whether the anchor was found.
pub fn float_to_front(reviews: &mut Vec<Review>, anchor: ReviewId) -> bool {
    match reviews.iter().position(|r| r.id == anchor) {
        Some(idx) => {
            let review = reviews.remove(idx);
            reviews.insert(0, review);
            true
        }
        None => false,
    }
}
