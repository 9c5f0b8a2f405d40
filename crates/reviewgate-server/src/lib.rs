//! HTTP surface: review submission, listing, reranking, and the scheduled trigger.

mod api;
mod cron;
mod error;

pub use api::{
    AppState, CREATE_REVIEW_PATH, CRON_PATH, HEALTH_PATH, LIST_REVIEWS_PATH, RERANK_PATH,
    WEBHOOK_SECRET_HEADER, build_router,
};
pub use cron::run_daily_loop;
pub use error::ServerError;

use axum::http::Request;
use reviewgate_core::AppConfig;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Bind the listener, start the daily scheduler, and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|source| ServerError::Bind {
            address: config.listen_addr.clone(),
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::LocalAddr { source })?;
    tracing::info!(%local_addr, "reviewgate listening");

    let scheduler = tokio::spawn(run_daily_loop(
        state.scheduler.clone(),
        config.scheduler.daily_at,
    ));

    let app = build_router(state).layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                path = %request.uri().path()
            )
        },
    ));

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| ServerError::Serve { source });

    scheduler.abort();
    tracing::info!("server shutdown complete");
    result
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
