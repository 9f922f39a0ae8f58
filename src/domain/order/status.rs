use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OrderError;

// ============================================================================
// Order Status State Machine
// ============================================================================
//
// Forward path: Pending -> Processing -> Shipped -> Delivered.
// Cancelled is reachable from any non-terminal state. There is exactly one
// terminal cancellation state; the admin and customer entry paths are
// distinguished on the order itself (cancelled_by), not by a second spelling.
//
// Delivered is terminal for every mutation path.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            // Both historical spellings resolve to the one terminal state.
            "Cancelled" | "Canceled" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Online,
    CashOnDelivery,
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMode::Online => write!(f, "Online"),
            PaymentMode::CashOnDelivery => write!(f, "Cash on Delivery"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundStatus {
    Processed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelledBy {
    Admin,
    Customer,
}

/// Validate a status transition requested through the admin/staff path.
///
/// Any non-terminal order may move to any status; a delivered or already
/// cancelled order rejects every further transition.
pub fn guard_transition(current: OrderStatus, next: OrderStatus) -> Result<(), OrderError> {
    if current == OrderStatus::Delivered {
        return Err(OrderError::AlreadyDelivered);
    }
    if current == OrderStatus::Cancelled {
        return Err(OrderError::AlreadyCancelled);
    }
    let _ = next;
    Ok(())
}

/// Validate a customer-initiated cancellation: only orders that have not yet
/// shipped can be cancelled by the customer.
pub fn guard_customer_cancel(current: OrderStatus) -> Result<(), OrderError> {
    match current {
        OrderStatus::Pending | OrderStatus::Processing => Ok(()),
        OrderStatus::Cancelled => Err(OrderError::AlreadyCancelled),
        OrderStatus::Delivered => Err(OrderError::AlreadyDelivered),
        OrderStatus::Shipped => Err(OrderError::NotCancellable(current)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(guard_transition(OrderStatus::Pending, OrderStatus::Processing).is_ok());
        assert!(guard_transition(OrderStatus::Processing, OrderStatus::Shipped).is_ok());
        assert!(guard_transition(OrderStatus::Shipped, OrderStatus::Delivered).is_ok());
        // Admin path may also jump states or cancel late.
        assert!(guard_transition(OrderStatus::Pending, OrderStatus::Delivered).is_ok());
        assert!(guard_transition(OrderStatus::Shipped, OrderStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_delivered_is_terminal() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(matches!(
                guard_transition(OrderStatus::Delivered, next),
                Err(OrderError::AlreadyDelivered)
            ));
        }
    }

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(matches!(
            guard_transition(OrderStatus::Cancelled, OrderStatus::Pending),
            Err(OrderError::AlreadyCancelled)
        ));
    }

    #[test]
    fn test_customer_cancel_window() {
        assert!(guard_customer_cancel(OrderStatus::Pending).is_ok());
        assert!(guard_customer_cancel(OrderStatus::Processing).is_ok());
        assert!(matches!(
            guard_customer_cancel(OrderStatus::Shipped),
            Err(OrderError::NotCancellable(OrderStatus::Shipped))
        ));
        assert!(matches!(
            guard_customer_cancel(OrderStatus::Delivered),
            Err(OrderError::AlreadyDelivered)
        ));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!("Cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        // The legacy single-l spelling maps onto the unified terminal state.
        assert_eq!("Canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!(matches!(
            "InTransit".parse::<OrderStatus>(),
            Err(OrderError::UnknownStatus(_))
        ));
    }
}
