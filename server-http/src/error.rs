use crate::api::responses::{ENDPOINTS, ErrorResponse};
use crate::validation::ValidationError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use shared::Error;

/// Everything a handler can fail with, rendered as `{error, message, timestamp}`
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Service(Error),
    RouteNotFound(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Service(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationError::MalformedRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationError::MalformedRequest(rejection.body_text()))
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation Error",
                e.to_string(),
            ),
            ApiError::RouteNotFound(path) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("The endpoint {} was not found.", path),
            ),
            ApiError::Service(Error::UnknownOperation(name)) => (
                StatusCode::NOT_FOUND,
                "Unknown Operation",
                format!("Operation '{}' is not supported", name),
            ),
            ApiError::Service(Error::OperationFailed(e)) if e.is_user_error() => {
                (StatusCode::BAD_REQUEST, "Bad Request", e.to_string())
            }
            ApiError::Service(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "An unexpected error occurred".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();

        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        }

        let available_endpoints = matches!(self, ApiError::RouteNotFound(_))
            .then(|| ENDPOINTS.iter().map(|(_, path)| *path).collect());

        let body = ErrorResponse {
            error,
            message,
            timestamp: Utc::now(),
            available_endpoints,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::OperationError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Service(Error::UnknownOperation("sqrt".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Service(Error::OperationFailed(OperationError::invalid("bad"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Service(Error::OperationFailed(OperationError::too_large("big"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Service(Error::OperationFailed(OperationError::Internal("oops".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Service(Error::Storage("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Validation(ValidationError::LimitTooLarge(5000)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ApiError::RouteNotFound("/nope".into()), StatusCode::NOT_FOUND),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (_, _, message) =
            ApiError::Service(Error::OperationFailed(OperationError::Internal("secret".into())))
                .parts();
        assert!(!message.contains("secret"));
    }
}
