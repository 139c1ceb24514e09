//! OpenReach API Backend
//!
//! Axum surface over the aggregation core: campaign breakdowns, reconciled
//! metrics, sequence templates, subsequence editing, mailbox roll-ups, and
//! the operator preference store.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod handlers;
mod state;

use handlers::*;
use state::AppState;

fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Campaign analytics
        .route("/api/campaigns/breakdown", get(campaign_breakdown))
        .route("/api/campaigns/analytics/overview", post(analytics_overview))
        .route("/api/campaigns/:id/metrics", get(campaign_metrics))
        // Templates
        .route("/api/email-templates", get(email_templates))
        // Subsequences
        .route(
            "/api/subsequences/:id",
            get(get_subsequence).patch(update_subsequence),
        )
        // Mailboxes
        .route("/api/mailboxes", get(mailbox_list))
        // Operator preferences
        .route(
            "/api/preferences/:scope",
            get(get_preferences).put(set_preferences),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_env();
    let app = router(state);

    let addr = std::env::var("OPENREACH_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!("OpenReach API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}

async fn health() -> &'static str {
    "OK"
}
