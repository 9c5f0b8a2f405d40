//! Storage layer: the `reviews` relation behind the [`ReviewStore`] seam.

mod error;
mod memory;
pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use async_trait::async_trait;
use reviewgate_core::{NewReview, Review, ReviewId};

/// Query contract of the reviews relation.
///
/// Implementations are handed to each component explicitly; there is no
/// process-global client.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Insert a review and return it with its assigned `id` and `created_at`.
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError>;

    /// Approved reviews of one business ordered `pinned desc, created_at desc`.
    ///
    /// Ties on `created_at` fall back to `id desc` so the order is total.
    async fn approved_for_business(&self, business_id: &str) -> Result<Vec<Review>, StoreError>;

    /// Clear `pinned` on every review of the business. Returns rows touched.
    async fn unpin_all(&self, business_id: &str) -> Result<u64, StoreError>;

    /// Set `pinned` on the given ids, restricted to rows of the business.
    /// Returns rows touched.
    async fn pin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError>;

    /// Replace the pinned set of a business with `ids` in one step.
    ///
    /// Concurrent readers and writers never observe the old and new pins
    /// together. On error the previous pins are left untouched. Returns the
    /// number of rows pinned.
    async fn repin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError>;

    /// Distinct business ids that have at least one approved review, sorted.
    async fn approved_business_ids(&self) -> Result<Vec<String>, StoreError>;
}
