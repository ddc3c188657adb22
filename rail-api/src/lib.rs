use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod state;
pub mod stream;
pub mod trains;
pub mod users;

pub use state::AppState;

use error::AppError;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(trains::routes(state.clone()))
        .merge(bookings::routes(state.clone()))
        .merge(users::routes(state.clone()));

    if state.redis.is_some() {
        router = router.layer(from_fn_with_state(state.clone(), rate_limit_middleware));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, AppError> {
    let Some(redis) = state.redis.as_ref() else {
        return Ok(next.run(req).await);
    };

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());
    let key = format!("ratelimit:{}", ip);

    match redis.check_rate_limit(&key, state.business_rules.rate_limit_per_minute, 60).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err(AppError::RateLimited),
        Err(e) => {
            // Fail open
            tracing::warn!(error = %e, "rate limiter unavailable");
            Ok(next.run(req).await)
        }
    }
}
