use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// `{success, data, count?, message?}` envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, count: None, message: None, data })
    }

    pub fn created(data: T) -> impl IntoResponse {
        (StatusCode::CREATED, Self::ok(data))
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Json<Self> {
        Json(Self { success: true, count: Some(data.len()), message: None, data })
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            count: None,
            message: Some(message.into()),
            data: serde_json::Value::Object(Default::default()),
        })
    }
}
