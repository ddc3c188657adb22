use axum::{
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rail_booking::TrainStatusUpdate;
use rail_catalog::NewTrain;
use rail_core::repository::TrainDetails;
use rail_core::search::TrainSearchRequest;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::require_admin;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::stream::train_stream;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/trains", get(list_trains))
        .route("/api/trains/search", get(search_trains))
        .route("/api/trains/{id}", get(get_train))
        .route("/api/trains/{id}/availability", get(get_availability))
        .route("/api/trains/{id}/stream", get(train_stream));

    let admin = Router::new()
        .route("/api/trains", post(create_train))
        .route("/api/trains/{id}", put(update_train).delete(delete_train))
        .route("/api/trains/{id}/update-status", post(update_train_status))
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(admin)
}

async fn list_trains(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::list(state.catalog.list().await?))
}

async fn search_trains(
    State(state): State<AppState>,
    Query(req): Query<TrainSearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let search = req.validate()?;
    let trains = state.catalog.search(&search).await?;
    info!(source = %search.source, destination = %search.destination, date = %search.date, found = trains.len(), "train search");
    Ok(ApiResponse::list(trains))
}

async fn get_train(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(state.catalog.get(id).await?))
}

async fn get_availability(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(state.inventory.query(id).await?))
}

async fn create_train(
    State(state): State<AppState>,
    Json(input): Json<NewTrain>,
) -> Result<impl IntoResponse, AppError> {
    let train = state.catalog.create(input).await?;
    Ok(ApiResponse::created(train))
}

async fn update_train(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(details): Json<TrainDetails>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ApiResponse::ok(state.catalog.update(id, details).await?))
}

async fn delete_train(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete(id).await?;
    Ok(ApiResponse::message("Train deleted"))
}

async fn update_train_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<TrainStatusUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.broadcaster.update_train_status(id, update).await?;
    let message = format!("Train status updated, {} passengers notified", report.notified_count);
    let mut body = ApiResponse::ok(report);
    body.message = Some(message);
    Ok(body)
}
