//! In-memory review store for tests and ephemeral deployments.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reviewgate_core::{NewReview, Review, ReviewId, ReviewStatus};
use tracing::debug;

use crate::{ReviewStore, StoreError};

#[derive(Default)]
struct Inner {
    next_id: ReviewId,
    rows: Vec<Review>,
}

/// Vector-backed [`ReviewStore`]. Ids are assigned sequentially from 1.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an explicit creation time (backfills, fixtures).
    pub fn insert_at(
        &self,
        review: NewReview,
        created_at: DateTime<Utc>,
    ) -> Result<Review, StoreError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let row = Review::from_new(inner.next_id, created_at, review);
        inner.rows.push(row.clone());
        debug!(review_id = row.id, business_id = %row.business_id, "inserted review");
        Ok(row)
    }

    /// Fetch a review by id regardless of status.
    pub fn get(&self, id: ReviewId) -> Result<Review, StoreError> {
        self.lock()?
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    /// Ids of the pinned reviews of a business, ascending.
    pub fn pinned_ids(&self, business_id: &str) -> Result<Vec<ReviewId>, StoreError> {
        let mut ids: Vec<ReviewId> = self
            .lock()?
            .rows
            .iter()
            .filter(|r| r.business_id == business_id && r.pinned)
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError> {
        self.insert_at(review, Utc::now())
    }

    async fn approved_for_business(&self, business_id: &str) -> Result<Vec<Review>, StoreError> {
        let mut rows: Vec<Review> = self
            .lock()?
            .rows
            .iter()
            .filter(|r| r.business_id == business_id && r.status == ReviewStatus::Approved)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn unpin_all(&self, business_id: &str) -> Result<u64, StoreError> {
        Ok(unpin_rows(&mut self.lock()?, business_id))
    }

    async fn pin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
        Ok(pin_rows(&mut self.lock()?, business_id, ids))
    }

    async fn repin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        unpin_rows(&mut inner, business_id);
        Ok(pin_rows(&mut inner, business_id, ids))
    }

    async fn approved_business_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids: BTreeSet<String> = self
            .lock()?
            .rows
            .iter()
            .filter(|r| r.status == ReviewStatus::Approved)
            .map(|r| r.business_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }
}

fn unpin_rows(inner: &mut Inner, business_id: &str) -> u64 {
    let mut touched = 0;
    for row in inner.rows.iter_mut().filter(|r| r.business_id == business_id) {
        row.pinned = false;
        touched += 1;
    }
    touched
}

fn pin_rows(inner: &mut Inner, business_id: &str, ids: &[ReviewId]) -> u64 {
    let mut touched = 0;
    for row in inner
        .rows
        .iter_mut()
        .filter(|r| r.business_id == business_id && ids.contains(&r.id))
    {
        row.pinned = true;
        touched += 1;
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn review(business_id: &str, status: ReviewStatus) -> NewReview {
        NewReview {
            business_id: business_id.into(),
            reviewer_name: "Sam".into(),
            phone: "555-0101".into(),
            email: Some("sam@example.com".into()),
            content: "Friendly staff".into(),
            status,
            sentiment_score: 0.6,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert(review("b1", ReviewStatus::Approved)).await.unwrap();
        let b = store.insert(review("b1", ReviewStatus::Flagged)).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(!a.pinned);
        assert!(a.is_positive);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn approved_for_business_filters_and_orders() {
        let store = MemoryStore::new();
        let old = store.insert_at(review("b1", ReviewStatus::Approved), at(0)).unwrap();
        let new = store.insert_at(review("b1", ReviewStatus::Approved), at(10)).unwrap();
        store.insert_at(review("b1", ReviewStatus::Pending), at(20)).unwrap();
        store.insert_at(review("b2", ReviewStatus::Approved), at(30)).unwrap();

        let rows = store.approved_for_business("b1").await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);

        store.pin("b1", &[old.id]).await.unwrap();
        let rows = store.approved_for_business("b1").await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![old.id, new.id], "pinned first");
    }

    #[tokio::test]
    async fn same_timestamp_orders_by_id_desc() {
        let store = MemoryStore::new();
        let a = store.insert_at(review("b1", ReviewStatus::Approved), at(0)).unwrap();
        let b = store.insert_at(review("b1", ReviewStatus::Approved), at(0)).unwrap();
        let rows = store.approved_for_business("b1").await.unwrap();
        assert_eq!(rows[0].id, b.id);
        assert_eq!(rows[1].id, a.id);
    }

    #[tokio::test]
    async fn pin_is_scoped_to_business() {
        let store = MemoryStore::new();
        let mine = store.insert(review("b1", ReviewStatus::Approved)).await.unwrap();
        let theirs = store.insert(review("b2", ReviewStatus::Approved)).await.unwrap();

        let touched = store.pin("b1", &[mine.id, theirs.id]).await.unwrap();
        assert_eq!(touched, 1);
        assert_eq!(store.pinned_ids("b1").unwrap(), vec![mine.id]);
        assert!(store.pinned_ids("b2").unwrap().is_empty());
    }

    #[tokio::test]
    async fn unpin_all_clears_every_review_of_business() {
        let store = MemoryStore::new();
        let a = store.insert(review("b1", ReviewStatus::Approved)).await.unwrap();
        let b = store.insert(review("b2", ReviewStatus::Approved)).await.unwrap();
        store.pin("b1", &[a.id]).await.unwrap();
        store.pin("b2", &[b.id]).await.unwrap();

        store.unpin_all("b1").await.unwrap();
        assert!(store.pinned_ids("b1").unwrap().is_empty());
        assert_eq!(store.pinned_ids("b2").unwrap(), vec![b.id]);
    }

    #[tokio::test]
    async fn repin_replaces_pinned_set() {
        let store = MemoryStore::new();
        let ids: Vec<ReviewId> = (0..4)
            .map(|i| store.insert_at(review("b1", ReviewStatus::Approved), at(i)).unwrap().id)
            .collect();
        let other = store.insert(review("b2", ReviewStatus::Approved)).await.unwrap();
        store.pin("b1", &ids[..3]).await.unwrap();
        store.pin("b2", &[other.id]).await.unwrap();

        let pinned = store.repin("b1", &[ids[3], other.id]).await.unwrap();
        assert_eq!(pinned, 1);
        assert_eq!(store.pinned_ids("b1").unwrap(), vec![ids[3]]);
        assert_eq!(store.pinned_ids("b2").unwrap(), vec![other.id]);

        store.repin("b1", &[]).await.unwrap();
        assert!(store.pinned_ids("b1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn approved_business_ids_distinct_sorted() {
        let store = MemoryStore::new();
        store.insert(review("zeta", ReviewStatus::Approved)).await.unwrap();
        store.insert(review("alpha", ReviewStatus::Approved)).await.unwrap();
        store.insert(review("alpha", ReviewStatus::Approved)).await.unwrap();
        store.insert(review("only-flagged", ReviewStatus::Flagged)).await.unwrap();

        let ids = store.approved_business_ids().await.unwrap();
        assert_eq!(ids, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn get_missing_is_no_results() {
        let store = MemoryStore::new();
        assert!(matches!(store.get(42), Err(StoreError::NoResults)));
    }
}
