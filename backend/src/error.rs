//! Error handling for the logistics backend
//!
//! Every error leaves the server as `{"error": {"code", "message", ...}}`.

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::FulfillmentError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation failed")]
    ValidationErrors(#[from] validator::ValidationErrors),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("{entity} {key} not found")]
    NotFound { entity: String, key: String },

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient inventory: {0}")]
    InsufficientInventory(String),

    // External service errors
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &str, key: impl ToString) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn conflict(resource: &str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            resource: resource.to_string(),
            message: message.into(),
        }
    }

    /// Map a unique-constraint violation to `DuplicateEntry(field)`, anything else to `DatabaseError`
    pub fn from_unique(err: sqlx::Error, field: &str) -> Self {
        let is_unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);

        if is_unique {
            AppError::DuplicateEntry(field.to_string())
        } else {
            AppError::DatabaseError(err)
        }
    }
}

impl From<FulfillmentError> for AppError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::NotFound { entity, key } => AppError::NotFound {
                entity: entity.to_string(),
                key,
            },
            FulfillmentError::InvalidState(message) => AppError::InvalidStateTransition(message),
            err @ FulfillmentError::InsufficientInventory { .. } => {
                AppError::InsufficientInventory(err.to_string())
            }
            FulfillmentError::InvalidQuantity(quantity) => AppError::Validation {
                field: "quantity".to_string(),
                message: format!("Quantity must not be negative, got {quantity}"),
            },
            err @ FulfillmentError::QuantityOverflow { .. } => AppError::Validation {
                field: "quantity".to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// A stored enum column that no longer parses
impl From<shared::UnknownVariant> for AppError {
    fn from(err: shared::UnknownVariant) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

fn validation_details(errors: &validator::ValidationErrors) -> HashMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new("FORBIDDEN", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field),
            ),
            AppError::ValidationErrors(errors) => {
                let mut detail = ErrorDetail::new("VALIDATION_ERROR", "Request validation failed");
                detail.details = Some(validation_details(errors));
                (StatusCode::BAD_REQUEST, detail)
            }
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
                .with_field(field),
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", message.clone()).with_field(resource),
            ),
            AppError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", self.to_string()),
            ),
            AppError::InvalidStateTransition(message) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("INVALID_STATE_TRANSITION", message.clone()),
            ),
            AppError::InsufficientInventory(message) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INSUFFICIENT_INVENTORY", message.clone()),
            ),
            AppError::IdentityProvider(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "IDENTITY_PROVIDER_ERROR",
                    "The identity provider could not be reached",
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use validator::Validate;

    #[derive(Validate)]
    struct Input {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_fulfillment_errors_map_to_statuses() {
        let cases = vec![
            (FulfillmentError::not_found("SalesOrder", 7), StatusCode::NOT_FOUND),
            (
                FulfillmentError::InvalidState("Only orders in CREATED status can be reserved".into()),
                StatusCode::CONFLICT,
            ),
            (
                FulfillmentError::InsufficientInventory {
                    product_id: Uuid::nil(),
                    requested: 5,
                    available: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (FulfillmentError::InvalidQuantity(-1), StatusCode::BAD_REQUEST),
            (
                FulfillmentError::QuantityOverflow {
                    product_id: Uuid::nil(),
                },
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_and_detail().0, status);
        }
    }

    #[test]
    fn test_not_found_message_names_entity_and_key() {
        let (_, detail) = AppError::not_found("Product", "PRD-1").status_and_detail();
        assert_eq!(detail.code, "NOT_FOUND");
        assert_eq!(detail.message, "Product PRD-1 not found");
    }

    #[test]
    fn test_insufficient_inventory_names_product() {
        let product_id = Uuid::new_v4();
        let err = AppError::from(FulfillmentError::InsufficientInventory {
            product_id,
            requested: 3,
            available: 0,
        });
        let (_, detail) = err.status_and_detail();
        assert!(detail.message.contains(&product_id.to_string()));
    }

    #[test]
    fn test_validation_errors_have_details() {
        let errors = Input {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        let (status, detail) = AppError::from(errors).status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let details = detail.details.unwrap();
        assert_eq!(details["name"], vec!["Name is required".to_string()]);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let (status, detail) = AppError::Internal("pool exhausted".into()).status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!detail.message.contains("pool"));
    }
}
