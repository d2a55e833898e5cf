use std::sync::Arc;

use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cinder_shared::clients::rabbitmq::RabbitMQClient;
use cinder_shared::middleware::JwtSecret;

pub mod config;
pub mod events;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use config::AppConfig;
use events::ChangeBus;
use rate_limit::RateLimiter;
use store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub limiter: RateLimiter,
    pub bus: ChangeBus,
    pub metrics: PrometheusHandle,
}

impl FromRef<AppState> for JwtSecret {
    fn from_ref(state: &AppState) -> Self {
        JwtSecret(state.config.jwt_secret.clone())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Profiles
        .route("/profiles", post(routes::profiles::create_profile))
        .route(
            "/profiles/me",
            get(routes::profiles::get_me).patch(routes::profiles::update_me),
        )
        .route("/profiles/:id", get(routes::profiles::get_profile))
        .route("/discover", get(routes::profiles::discover))
        // Likes and passes
        .route("/likes", post(routes::likes::send_like))
        .route("/passes", post(routes::likes::send_pass))
        // Matches and chat
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/:id", get(routes::matches::get_match))
        .route(
            "/matches/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        .route("/matches/:id/read", post(routes::messages::mark_read))
        // Notifications
        .route("/notifications/counts", get(routes::notifications::get_counts))
        .route("/notifications/mark-seen", post(routes::notifications::mark_seen))
        .route("/notifications/stream", get(routes::notifications::stream))
        // Matchmaker / admin tooling
        .route("/admin/matches", post(routes::admin::arrange_match))
        .route(
            "/admin/matchmakers/:id/verify",
            post(routes::admin::verify_matchmaker),
        )
        // Consistency debug tooling
        .route("/debug/users/:id/audit", get(routes::debug::audit_user))
        .route("/debug/users/:id/repair", post(routes::debug::repair_user))
        .route("/debug/matches/:id/check", get(routes::debug::check_match))
        .route("/debug/matches/:id/fix", post(routes::debug::fix_match))
        .route(
            "/debug/rate-limits/:user_id/:action",
            get(routes::debug::rate_limit_status),
        )
        .route(
            "/debug/rate-limits/:user_id/reset",
            post(routes::debug::rate_limit_reset),
        )
        .layer(middleware::from_fn(
            cinder_shared::middleware::metrics_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
