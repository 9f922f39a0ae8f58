use super::status::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("cannot update delivered order")]
    AlreadyDelivered,

    #[error("order is already cancelled")]
    AlreadyCancelled,

    #[error("order in status {0} can no longer be cancelled by the customer")]
    NotCancellable(OrderStatus),

    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    #[error("status {0} cannot be set through this operation")]
    UnsupportedTarget(OrderStatus),

    #[error("order lines cannot be empty")]
    EmptyLines,

    #[error("invalid line quantity: {0}")]
    InvalidQuantity(u32),

    #[error("confirmation required")]
    ConfirmationRequired,

    #[error("delivery confirmation code does not match")]
    ConfirmationMismatch,

    #[error("no delivery confirmation has been issued for this order")]
    ConfirmationNotIssued,

    #[error("driver is not assigned to this order")]
    NotAssignedDriver,

    #[error("order does not belong to this customer")]
    NotOrderOwner,

    #[error("assignee must have the driver role")]
    NotADriver,
}
