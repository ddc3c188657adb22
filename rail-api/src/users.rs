use axum::{
    extract::State,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::post,
    Extension, Router,
};
use rail_shared::User;

use crate::error::AppError;
use crate::middleware::{require_user, Claims};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", post(sync_profile))
        .route_layer(from_fn_with_state(state, require_user))
}

/// Records the caller's profile from their token so notifications can reach them.
async fn sync_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let name = claims
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| claims.email.as_deref().and_then(|e| e.split('@').next()).filter(|n| !n.is_empty()).map(str::to_string))
        .unwrap_or_else(|| "Passenger".to_string());

    let user = User {
        id: claims.sub,
        name,
        email: claims.email.clone(),
        role: claims.role,
    };
    let stored = state
        .users
        .upsert_user(&user)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(ApiResponse::ok(stored))
}
