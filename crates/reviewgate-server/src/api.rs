//! Routes, handlers, and JSON error mapping.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use reviewgate_ai::ClassifierGateway;
use reviewgate_core::{AppConfig, Review, ReviewId, ReviewStatus};
use reviewgate_service::{
    RankingSelector, ReadAssembler, ReviewSubmission, SchedulerDriver, ServiceError, Submitter,
};
use reviewgate_store::ReviewStore;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

pub const HEALTH_PATH: &str = "/api/health";
pub const CREATE_REVIEW_PATH: &str = "/api/create-review";
pub const LIST_REVIEWS_PATH: &str = "/api/reviews";
pub const RERANK_PATH: &str = "/api/rerank";
pub const CRON_PATH: &str = "/api/cron/daily-rerank";
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

const ERROR_VALIDATION: &str = "validation_error";
const ERROR_UNAUTHORIZED: &str = "unauthorized";
const ERROR_METHOD_NOT_ALLOWED: &str = "method_not_allowed";
const ERROR_NOT_FOUND: &str = "not_found";
const ERROR_CLASSIFIER: &str = "classifier_error";
const ERROR_STORE: &str = "store_error";

/// Handles shared by every request. Components hold their own store and
/// classifier handles; nothing else is shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub submitter: Submitter,
    pub reader: ReadAssembler,
    pub selector: RankingSelector,
    pub scheduler: SchedulerDriver,
    webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReviewStore>, classifier: ClassifierGateway, config: &AppConfig) -> Self {
        let selector = RankingSelector::new(store.clone(), classifier.clone());
        Self {
            submitter: Submitter::new(store.clone(), classifier, config.approval_rule),
            reader: ReadAssembler::new(store.clone()),
            scheduler: SchedulerDriver::new(store, selector.clone(), config.scheduler.concurrency),
            selector,
            webhook_secret: config.webhook_secret().map(Arc::from),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health).fallback(method_not_allowed))
        .route(
            CREATE_REVIEW_PATH,
            post(create_review).fallback(method_not_allowed),
        )
        .route(
            LIST_REVIEWS_PATH,
            get(list_reviews).fallback(method_not_allowed),
        )
        .route(RERANK_PATH, post(rerank).fallback(method_not_allowed))
        .route(
            CRON_PATH,
            get(daily_rerank)
                .post(daily_rerank)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(state)
}

// ── Errors ──

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: &'static str,
    message: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                ok: false,
                error,
                message: message.into(),
            },
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ERROR_VALIDATION, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => Self::validation(message),
            ServiceError::Classifier(err) => {
                tracing::error!(error = %err, "classifier failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ERROR_CLASSIFIER,
                    format!("review classification failed: {err}"),
                )
            }
            ServiceError::Store(err) => {
                tracing::error!(error = %err, "store failure");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ERROR_STORE,
                    format!("review store failed: {err}"),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        ERROR_METHOD_NOT_ALLOWED,
        format!("method `{method}` not allowed for `{}`", uri.path()),
    )
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        ERROR_NOT_FOUND,
        format!("resource `{}` not found", uri.path()),
    )
}

/// Decode a JSON body ourselves so that any malformed input is a 400.
fn json_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Err(ApiError::validation("request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("invalid JSON body: {e}")))
}

// ── Handlers ──

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn create_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !provided.is_some_and(|p| secret_matches(expected, p)) {
            tracing::warn!("rejected review submission with bad webhook secret");
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                ERROR_UNAUTHORIZED,
                "invalid webhook secret",
            ));
        }
    }

    let submission: ReviewSubmission = json_body(&body)?;
    let outcome = state.submitter.submit(submission).await?;

    let message = match outcome.review.status {
        ReviewStatus::Approved => "Review approved and published",
        ReviewStatus::Pending => "Review submitted and awaiting moderation",
        ReviewStatus::Flagged => "Review flagged for moderation",
    };
    Ok(Json(json!({
        "ok": true,
        "message": message,
        "status": outcome.review.status,
        "analysis": outcome.classification,
        "review": outcome.review,
    })))
}

/// Compare secrets in time independent of where they differ. Both sides are
/// hashed first so the length of the configured secret does not leak either.
fn secret_matches(expected: &str, provided: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    expected
        .iter()
        .zip(provided.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Public shape of a review on the read path: no reviewer contact details.
#[derive(Debug, Serialize)]
struct PublicReview<'a> {
    id: ReviewId,
    business_id: &'a str,
    reviewer_name: &'a str,
    content: &'a str,
    status: ReviewStatus,
    sentiment_score: f64,
    is_positive: bool,
    pinned: bool,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a Review> for PublicReview<'a> {
    fn from(r: &'a Review) -> Self {
        Self {
            id: r.id,
            business_id: &r.business_id,
            reviewer_name: &r.reviewer_name,
            content: &r.content,
            status: r.status,
            sentiment_score: r.sentiment_score,
            is_positive: r.is_positive,
            pinned: r.pinned,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    business_id: Option<String>,
    #[serde(rename = "newReviewId")]
    new_review_id: Option<String>,
}

async fn list_reviews(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::validation(e.body_text()))?;
    let business_id = params
        .business_id
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ApiError::validation("business_id is required"))?;
    // A malformed anchor cannot match any review, so it is simply ignored.
    let anchor = params
        .new_review_id
        .and_then(|id| id.trim().parse::<ReviewId>().ok());

    let reviews = state.reader.list(&business_id, anchor).await?;
    let public: Vec<PublicReview<'_>> = reviews.iter().map(PublicReview::from).collect();
    Ok(Json(json!({
        "ok": true,
        "count": public.len(),
        "reviews": public,
    })))
}

#[derive(Debug, Deserialize)]
struct RerankRequest {
    business_id: Option<String>,
}

async fn rerank(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: RerankRequest = json_body(&body)?;
    let business_id = request
        .business_id
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ApiError::validation("business_id is required"))?;

    let report = state.selector.rerank(&business_id).await?;
    Ok(Json(json!({
        "ok": true,
        "message": format!("Pinned {} review(s)", report.pinned_count),
        "pinnedCount": report.pinned_count,
        "pinnedReviewIds": report.pinned_review_ids,
        "reasoning": report.reasoning,
    })))
}

async fn daily_rerank(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let report = state.scheduler.run_daily().await?;
    Ok(Json(json!({
        "ok": true,
        "message": format!(
            "Reranked {} of {} businesses",
            report.succeeded(),
            report.results.len()
        ),
        "processed": report.results.len(),
        "succeeded": report.succeeded(),
        "failed": report.failed(),
        "results": report.results,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_matches_only_exact_value() {
        assert!(secret_matches("s3cret", "s3cret"));
        assert!(!secret_matches("s3cret", "s3creT"));
        assert!(!secret_matches("s3cret", "s3cret "));
        assert!(!secret_matches("s3cret", ""));
    }
}
