//! HTTP glue: error responses and request extractors

pub mod extract;

pub use extract::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser, OptionalAuthUser};

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::OmniError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Service(OmniError),
    /// Body, path or query string the extractors could not decode
    Rejected { status: StatusCode, message: String },
}

impl From<OmniError> for WebError {
    fn from(err: OmniError) -> Self {
        WebError::Service(err)
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        WebError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        WebError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for WebError {
    fn from(rejection: PathRejection) -> Self {
        let status = match &rejection {
            PathRejection::FailedToDeserializePathParams(_) => StatusCode::UNPROCESSABLE_ENTITY,
            other => other.status(),
        };
        WebError::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl WebError {
    fn parts(self) -> (StatusCode, String, &'static str) {
        match self {
            WebError::Service(err) => match err {
                OmniError::Validation(msg) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, msg, "validation_error")
                }
                OmniError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found"),
                OmniError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg, "conflict"),
                OmniError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "bad_request"),
                OmniError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "unauthorized"),
                OmniError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "forbidden"),
                err @ OmniError::InsufficientPoints { .. } => (
                    StatusCode::BAD_REQUEST,
                    err.to_string(),
                    "insufficient_points",
                ),
                OmniError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg, "upstream_error"),
                err @ (OmniError::Storage(_) | OmniError::LockError(_) | OmniError::Internal(_)) => {
                    error!(error = %err, "request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                        "internal_error",
                    )
                }
            },
            WebError::Rejected { status, message } => (status, message, "invalid_request"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = self.parts();

        let body = Json(ErrorResponse {
            detail: message,
            code: code.to_string(),
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (OmniError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (OmniError::not_found("gone"), StatusCode::NOT_FOUND),
            (OmniError::conflict("dup"), StatusCode::BAD_REQUEST),
            (OmniError::forbidden("no"), StatusCode::FORBIDDEN),
            (
                OmniError::InsufficientPoints {
                    balance: 10,
                    requested: 20,
                },
                StatusCode::BAD_REQUEST,
            ),
            (OmniError::upstream("down"), StatusCode::BAD_GATEWAY),
            (OmniError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(WebError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = WebError::from(OmniError::unauthorized("nope")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (_, message, code) = WebError::from(OmniError::storage("wal write failed")).parts();
        assert_eq!(message, "Internal server error");
        assert_eq!(code, "internal_error");
    }
}
