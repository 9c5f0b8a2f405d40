//! Fakes shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reviewgate_ai::{ClassifierError, ClassifierGateway, LlmBackend, Prompt};
use reviewgate_core::{NewReview, Review, ReviewId, ReviewStatus};
use reviewgate_store::{MemoryStore, ReviewStore, StoreError};

/// Backend replaying canned answers in order.
#[derive(Default)]
pub struct Scripted {
    answers: Mutex<VecDeque<Result<String, ClassifierError>>>,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl Scripted {
    pub fn new(answers: Vec<Result<String, ClassifierError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn ok<S: AsRef<str>>(answers: &[S]) -> Arc<Self> {
        Self::new(answers.iter().map(|a| Ok(a.as_ref().to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for Scripted {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ClassifierError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn gateway(backend: Arc<Scripted>) -> ClassifierGateway {
    ClassifierGateway::new(backend, Duration::from_secs(5))
}

pub fn provider_down() -> ClassifierError {
    ClassifierError::Provider {
        status: 503,
        message: "unavailable".into(),
    }
}

/// [`MemoryStore`] wrapper with switchable failures and update counters.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_insert: AtomicBool,
    pub fail_repin: AtomicBool,
    /// Fail `approved_for_business` for this business id.
    pub fail_business: Mutex<Option<String>>,
    pub updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, business_id: &str, status: ReviewStatus, content: &str) -> Review {
        self.inner
            .insert_at(new_review(business_id, status, content), chrono::Utc::now())
            .unwrap()
    }
}

fn injected() -> StoreError {
    StoreError::Other("injected failure".into())
}

#[async_trait]
impl ReviewStore for FlakyStore {
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.insert(review).await
    }

    async fn approved_for_business(&self, business_id: &str) -> Result<Vec<Review>, StoreError> {
        if self.fail_business.lock().unwrap().as_deref() == Some(business_id) {
            return Err(injected());
        }
        self.inner.approved_for_business(business_id).await
    }

    async fn unpin_all(&self, business_id: &str) -> Result<u64, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.unpin_all(business_id).await
    }

    async fn pin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.pin(business_id, ids).await
    }

    async fn repin(&self, business_id: &str, ids: &[ReviewId]) -> Result<u64, StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_repin.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.repin(business_id, ids).await
    }

    async fn approved_business_ids(&self) -> Result<Vec<String>, StoreError> {
        self.inner.approved_business_ids().await
    }
}

pub fn new_review(business_id: &str, status: ReviewStatus, content: &str) -> NewReview {
    NewReview {
        business_id: business_id.into(),
        reviewer_name: "Robin".into(),
        phone: "555-0123".into(),
        email: None,
        content: content.into(),
        status,
        sentiment_score: 0.5,
    }
}
