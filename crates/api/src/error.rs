//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use statistics::StatisticsError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No identity, or an identity the directory does not know.
    Unauthorized(String),
    /// Identity known but not allowed.
    Forbidden(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order lifecycle or inventory error.
    Domain(DomainError),
    /// Statistics error.
    Statistics(StatisticsError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Statistics(err) => statistics_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::InvalidState { .. } | DomainError::InsufficientStock { .. } => {
            StatusCode::CONFLICT
        }
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn statistics_error_to_response(err: StatisticsError) -> (StatusCode, String) {
    let status = match &err {
        StatisticsError::Validation(_) => StatusCode::BAD_REQUEST,
        StatisticsError::Store(_) | StatisticsError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<StatisticsError> for ApiError {
    fn from(err: StatisticsError) -> Self {
        ApiError::Statistics(err)
    }
}

impl From<domain::DirectoryError> for ApiError {
    fn from(err: domain::DirectoryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, OrderStatus, ProductId};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_status_codes() {
        assert_eq!(
            status_of(
                DomainError::NotFound {
                    entity: "Order",
                    id: "x".into()
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::Forbidden("no".into()).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(
                DomainError::InvalidState {
                    order_id: OrderId::new(),
                    status: OrderStatus::Completed,
                    action: "cancel",
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                DomainError::InsufficientStock {
                    product_id: ProductId::new(),
                    product_name: "P".into(),
                    requested: 2,
                    available: 1,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                DomainError::Validation {
                    field: "items",
                    message: "empty".into()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn adapter_errors_map_to_status_codes() {
        assert_eq!(
            status_of(ApiError::Unauthorized("who".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(StatisticsError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
