use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::{DbErr, SqlErr};
use tracing::error;

use crate::models::order::{FailureResponse, IntakeResponse};

pub const INVALID_ORDER_MESSAGE: &str = "Invalid order data.";
pub const DUPLICATE_ORDER_MESSAGE: &str = "An order for this email and delivery date already exists.";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized.";
pub const PROCESSING_FAILED_MESSAGE: &str = "An error occurred while processing your order.";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    /// The request body did not deserialize into an order
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Duplicate order for this email and delivery date")]
    DuplicateOrder,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Classifies a database error, turning unique-index violations into
    /// [`ServiceError::DuplicateOrder`].
    pub fn from_insert_error(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::DuplicateOrder,
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateOrder => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message surfaced in the `error` field of a 500 response
    fn failure_detail(&self) -> String {
        match self {
            Self::DatabaseError(err) => err.to_string(),
            Self::InternalError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::InvalidOrder(_) => {
                (status, Json(IntakeResponse::error(INVALID_ORDER_MESSAGE))).into_response()
            }
            Self::DuplicateOrder => {
                (status, Json(IntakeResponse::error(DUPLICATE_ORDER_MESSAGE))).into_response()
            }
            Self::Unauthorized => {
                (status, Json(IntakeResponse::error(UNAUTHORIZED_MESSAGE))).into_response()
            }
            Self::DatabaseError(_) | Self::InternalError(_) => {
                let detail = self.failure_detail();
                let request_id = crate::tracing::current_request_id()
                    .map(|rid| rid.as_str().to_string())
                    .unwrap_or_default();
                error!(request_id = %request_id, "Error inserting order: {}", detail);
                let body = FailureResponse {
                    message: PROCESSING_FAILED_MESSAGE.to_string(),
                    error: detail,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_json(err: ServiceError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::InvalidOrder("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::DuplicateOrder.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::InternalError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn invalid_order_body_matches_contract() {
        let (status, body) = body_json(ServiceError::InvalidOrder("EOF".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "Invalid order data.", "status": "error"})
        );
    }

    #[tokio::test]
    async fn duplicate_order_body_matches_contract() {
        let (status, body) = body_json(ServiceError::DuplicateOrder).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({
                "message": "An order for this email and delivery date already exists.",
                "status": "error"
            })
        );
    }

    #[tokio::test]
    async fn database_error_surfaces_message() {
        let (status, body) =
            body_json(ServiceError::DatabaseError(DbErr::Custom("connection reset".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["message"],
            "An error occurred while processing your order."
        );
        assert!(body["error"].as_str().unwrap().contains("connection reset"));
        assert!(body.get("status").is_none());
    }

    #[test]
    fn non_unique_insert_errors_stay_database_errors() {
        let err = ServiceError::from_insert_error(DbErr::Custom("disk full".into()));
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
