//! Consistent response envelope for the HTTP bridge.
//!
//! Every bridge response is wrapped in either [`ApiResponse`] (success) or
//! [`ApiErrorResponse`] (error), giving operators a uniform JSON shape
//! across all seven `/agents/*` endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::error::PipelineError;

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self { timestamp: Utc::now().to_rfc3339(), version: "1" }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        let body = Self { data, meta: ResponseMeta::default() };
        (StatusCode::OK, axum::Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn build(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
        let body = Self { error: ErrorDetail { code: code.to_string(), message: msg.into() }, meta: ResponseMeta::default() };
        (status, axum::Json(body)).into_response()
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
    }
}

/// Map a [`PipelineError`] to the bridge's error-status policy (§7):
/// Validation -> 400, NotFound -> 404, everything else -> 500.
pub fn pipeline_error_response(err: &PipelineError) -> Response {
    match err {
        PipelineError::Validation(msg) => ApiErrorResponse::bad_request(msg.clone()),
        PipelineError::NotFound(msg) => ApiErrorResponse::not_found(msg.clone()),
        PipelineError::Transient(msg) => ApiErrorResponse::service_unavailable(msg.clone()),
        PipelineError::Model(msg) | PipelineError::Fatal(msg) => ApiErrorResponse::internal(msg.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"hello": "world"}));
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(v.get("data").is_some());
        assert!(v.get("meta").is_some());
    }

    #[tokio::test]
    async fn validation_error_maps_to_400() {
        let resp = pipeline_error_response(&PipelineError::validation("bad score"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn not_found_error_maps_to_404() {
        let resp = pipeline_error_response(&PipelineError::not_found("unknown trip"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
