use serde::Serialize;

use crate::domain::OrderError;
use crate::store::StoreError;
use crate::utils::IsTransient;

// ============================================================================
// Error Taxonomy
// ============================================================================
//
// Five caller-visible classes. Every operation returns either the updated
// entity or one of these; no transition is silently dropped.
//
// - Validation:   malformed input, rejected before any side effect
// - NotFound:     referenced entity does not exist
// - Conflict:     guard violation (stock, status, OTP, authorization)
// - Dependency:   refund processor / persistence failure; always paired with
//                 a full rollback of the unit of work
// - Notification: email/broadcast failure; logged and counted, never rolls
//                 back a committed transition
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Dependency(String),

    #[error("{0}")]
    Notification(String),
}

impl CoreError {
    /// Machine-readable class tag for the wire response.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::Dependency(_) => "dependency",
            CoreError::Notification(_) => "notification",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured error shape handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: &'static str,
    pub message: String,
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => CoreError::NotFound {
                kind: "product",
                id: id.to_string(),
            },
            StoreError::OrderNotFound(id) => CoreError::NotFound {
                kind: "order",
                id: id.to_string(),
            },
            StoreError::TrackingNotFound(id) => CoreError::NotFound {
                kind: "tracking id",
                id,
            },
            e @ StoreError::InsufficientStock { .. } => CoreError::Conflict(e.to_string()),
            // Surfaces only when the commit retry budget is exhausted.
            e @ StoreError::VersionConflict { .. } => CoreError::Conflict(e.to_string()),
            e @ StoreError::DuplicateOrder(_) => CoreError::Conflict(e.to_string()),
        }
    }
}

impl From<OrderError> for CoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::UnknownStatus(_)
            | OrderError::UnsupportedTarget(_)
            | OrderError::EmptyLines
            | OrderError::InvalidQuantity(_)
            | OrderError::ConfirmationRequired
            | OrderError::ConfirmationNotIssued => CoreError::Validation(err.to_string()),
            OrderError::AlreadyDelivered
            | OrderError::AlreadyCancelled
            | OrderError::NotCancellable(_)
            | OrderError::ConfirmationMismatch
            | OrderError::NotAssignedDriver
            | OrderError::NotOrderOwner
            | OrderError::NotADriver => CoreError::Conflict(err.to_string()),
        }
    }
}

impl IsTransient for CoreError {
    fn is_transient(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_store_error_classification() {
        let id = Uuid::new_v4();
        assert_eq!(
            CoreError::from(StoreError::ProductNotFound(id)).kind(),
            "not_found"
        );
        assert_eq!(
            CoreError::from(StoreError::InsufficientStock {
                product_id: id,
                requested: 5,
                available: 2,
            })
            .kind(),
            "conflict"
        );
    }

    #[test]
    fn test_order_error_classification() {
        use crate::domain::OrderStatus;

        assert_eq!(CoreError::from(OrderError::EmptyLines).kind(), "validation");
        assert_eq!(
            CoreError::from(OrderError::UnsupportedTarget(OrderStatus::Cancelled)).kind(),
            "validation"
        );
        assert_eq!(
            CoreError::from(OrderError::ConfirmationRequired).kind(),
            "validation"
        );
        assert_eq!(
            CoreError::from(OrderError::AlreadyDelivered).kind(),
            "conflict"
        );
        assert_eq!(
            CoreError::from(OrderError::ConfirmationMismatch).kind(),
            "conflict"
        );
    }

    #[test]
    fn test_response_shape() {
        let response = CoreError::Validation("order lines cannot be empty".to_string()).to_response();
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"kind\":\"validation\""));
        assert!(json.contains("order lines cannot be empty"));
    }
}
