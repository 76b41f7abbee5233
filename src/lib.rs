use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use db::ChallengeStore;
use services::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChallengeStore>,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub ws_tx: Option<broadcast::Sender<String>>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(store: Arc<dyn ChallengeStore>, config: Arc<Config>, clock: Arc<dyn Clock>) -> Self {
        let (ws_tx, _) = broadcast::channel::<String>(256);
        Self {
            store,
            config,
            clock,
            ws_tx: Some(ws_tx),
            rate_limiter: RateLimitState::new(),
        }
    }
}

/// Routes and middleware without CORS, which depends on deployment config.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/ws", get(handlers::ws::ws_handler));

    let protected_routes = Router::new()
        // Enrollments
        .route(
            "/api/challenges/:id/start",
            post(handlers::enrollments::start_challenge),
        )
        .route(
            "/api/enrollments/:id",
            get(handlers::enrollments::get_enrollment),
        )
        .route(
            "/api/enrollments/:id/complete",
            post(handlers::enrollments::complete_challenge),
        )
        // Verification tokens
        .route(
            "/api/enrollments/:id/token",
            post(handlers::tokens::issue_token),
        )
        .route(
            "/api/enrollments/:id/token/validate",
            post(handlers::tokens::validate_token),
        )
        // Check-ins
        .route(
            "/api/enrollments/:id/check-ins",
            post(handlers::check_ins::create_check_in).get(handlers::check_ins::list_check_ins),
        )
        // Derived views
        .route("/api/enrollments/:id/streak", get(handlers::stats::get_streak))
        .route(
            "/api/enrollments/:id/calendar",
            get(handlers::stats::get_calendar_month),
        )
        .route(
            "/api/enrollments/:id/calendar/:date",
            get(handlers::stats::get_calendar_status),
        )
        .route(
            "/api/enrollments/:id/weeks",
            get(handlers::stats::list_weekly_summaries),
        )
        .route(
            "/api/enrollments/:id/weeks/:week",
            get(handlers::stats::get_weekly_summary),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn cors_layer(config: &Config) -> CorsLayer {
    let mut origins: Vec<axum::http::HeaderValue> = Vec::new();
    if let Ok(hv) = config.frontend_url.parse::<axum::http::HeaderValue>() {
        origins.push(hv);
    }
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                origins.push(hv);
            }
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}
