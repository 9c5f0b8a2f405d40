use chrono::{NaiveTime, Utc};
use reviewgate_service::SchedulerDriver;
use reviewgate_service::schedule::next_run_after;
use tracing::{error, info};

/// Run the scheduler driver once a day at `at` (UTC), forever.
pub async fn run_daily_loop(driver: SchedulerDriver, at: NaiveTime) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next = %next, "next daily rerank scheduled");
        tokio::time::sleep(wait).await;

        match driver.run_daily().await {
            Ok(report) => info!(
                businesses = report.results.len(),
                failed = report.failed(),
                "scheduled rerank finished"
            ),
            Err(err) => error!(error = %err, "scheduled rerank could not list businesses"),
        }
    }
}
