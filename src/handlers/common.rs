use crate::errors::ServiceError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Unwraps a JSON body, reporting a malformed one as a validation error on
/// `body`.
pub fn json_body<T>(request: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    request
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::validation("body", rejection.body_text()))
}

/// Parses an id taken from the path. A value that cannot be an id names no
/// record, so it is reported as `NotFound`.
pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::NotFound(format!("{} {} not found", kind, raw)))
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}
