use axum::{
    body::Bytes,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use rail_booking::NewBooking;
use rail_core::CoreError;
use rail_shared::Requester;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{require_admin, require_user};
use crate::response::ApiResponse;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/api/bookings/pnr/{pnr}", get(get_by_pnr));

    let user = Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/my-bookings", get(my_bookings))
        .route(
            "/api/bookings/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route("/api/bookings", get(list_bookings))
        .route("/api/bookings/notify-delay/{train_id}", post(notify_delay))
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(user).merge(admin)
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelayNotice {
    delay_minutes: Option<Value>,
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(input): Json<NewBooking>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.ledger.create(requester.id, input).await.inspect_err(|e| {
        if matches!(e, CoreError::CapacityExceeded { .. }) {
            state.metrics.capacity_rejections.inc();
        }
    })?;
    state.metrics.bookings_created.inc();
    Ok(ApiResponse::created(booking))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::list(state.ledger.list_for_user(requester.id).await?))
}

async fn list_bookings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::list(state.ledger.list_all().await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(state.ledger.get(id, &requester).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> Result<impl IntoResponse, AppError> {
    let status = change
        .status
        .ok_or_else(|| AppError::ValidationError("Validation failed: status is required".into()))?;
    Ok(ApiResponse::ok(state.ledger.update_status(id, &status, &requester).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.ledger.delete(id, &requester).await?;
    Ok(ApiResponse::message("Booking deleted"))
}

async fn get_by_pnr(State(state): State<AppState>, Path(pnr): Path<String>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(state.ledger.get_by_pnr(&pnr).await?))
}

async fn notify_delay(
    State(state): State<AppState>,
    Path(train_id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // an absent or malformed body is reported as a missing delay below
    let notice: DelayNotice = serde_json::from_slice(&body).unwrap_or_default();
    let report = state
        .broadcaster
        .notify_train_delay(train_id, notice.delay_minutes.as_ref())
        .await?;
    let message = format!("Delay notification sent to {} passengers", report.notified_count);
    let mut body = ApiResponse::ok(report);
    body.message = Some(message);
    Ok(body)
}
