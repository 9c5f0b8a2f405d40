//! Daily scheduler driver: rerank every business that has approved reviews.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use futures::stream::{self, StreamExt};
use reviewgate_store::ReviewStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::{RankingSelector, ServiceError};

/// Per-business result of a scheduled run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessOutcome {
    pub business_id: String,
    pub success: bool,
    #[serde(rename = "pinnedCount")]
    pub pinned_count: usize,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyReport {
    pub results: Vec<BusinessOutcome>,
}

impl DailyReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

#[derive(Clone)]
pub struct SchedulerDriver {
    store: Arc<dyn ReviewStore>,
    selector: RankingSelector,
    concurrency: usize,
}

impl SchedulerDriver {
    /// `concurrency` of 1 reranks businesses strictly one after another.
    pub fn new(store: Arc<dyn ReviewStore>, selector: RankingSelector, concurrency: usize) -> Self {
        Self {
            store,
            selector,
            concurrency: concurrency.max(1),
        }
    }

    /// Rerank every business with approved reviews.
    ///
    /// Only failing to enumerate businesses is an error; a failing business
    /// is recorded in the report and the run continues. Results are in
    /// business-id order.
    pub async fn run_daily(&self) -> Result<DailyReport, ServiceError> {
        let businesses = self.store.approved_business_ids().await?;
        info!(businesses = businesses.len(), concurrency = self.concurrency, "daily rerank starting");

        let results: Vec<BusinessOutcome> = stream::iter(businesses)
            .map(|business_id| self.rerank_one(business_id))
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = DailyReport { results };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "daily rerank complete"
        );
        Ok(report)
    }

    async fn rerank_one(&self, business_id: String) -> BusinessOutcome {
        match self.selector.rerank(&business_id).await {
            Ok(report) => BusinessOutcome {
                business_id,
                success: true,
                pinned_count: report.pinned_count,
                reasoning: report.reasoning,
                error: None,
            },
            Err(err) => {
                warn!(business_id = %business_id, error = %err, "rerank failed");
                BusinessOutcome {
                    business_id,
                    success: false,
                    pinned_count: 0,
                    reasoning: String::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

/// Next instant strictly after `now` whose UTC time of day is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        // Adding one day to a valid date only fails at the end of chrono's range.
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}
