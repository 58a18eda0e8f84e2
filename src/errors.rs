// src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Request-terminal error taxonomy. Every variant carries the message that
/// ends up in the response envelope; the boundary translation to HTTP lives
/// in the `ResponseError` impl below and nowhere else.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input (bad identifier, missing required field).
    #[error("{0}")]
    InvalidArgument(String),
    /// Missing/invalid credential, or insufficient chat-admin privilege.
    #[error("{0}")]
    Unauthorized(String),
    /// Valid credential, but a business rule blocks the action.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// Duplicate membership.
    #[error("{0}")]
    Conflict(String),
    /// A post-write read could not confirm the mutation.
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "statusCode": self.status_code().as_u16(),
            "message": self.to_string(),
            "data": serde_json::Value::Null,
        }))
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}

/// Success envelope: `{statusCode, message, data}`, mirroring the error body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            status_code,
            message: message.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_map_to_expected_status_codes() {
        let cases = [
            (ApiError::InvalidArgument("x".into()), 400),
            (ApiError::Unauthorized("x".into()), 401),
            (ApiError::Forbidden("x".into()), 403),
            (ApiError::NotFound("x".into()), 404),
            (ApiError::Conflict("x".into()), 400),
            (ApiError::Internal("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code);
        }
    }

    #[test]
    fn error_message_is_the_carried_string() {
        let err = ApiError::Forbidden("You cannot chat with yourself".into());
        assert_eq!(err.to_string(), "You cannot chat with yourself");
    }

    #[test]
    fn success_envelope_serializes_with_camel_case_status() {
        let resp = ApiResponse::new(201, "Created", vec![1, 2]);
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["statusCode"], 201);
        assert_eq!(value["message"], "Created");
        assert_eq!(value["data"], serde_json::json!([1, 2]));
    }
}
