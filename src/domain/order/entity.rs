use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{CancelledBy, OrderStatus, PaymentMode, PaymentStatus, RefundStatus};

// ============================================================================
// Order Entity
// ============================================================================
//
// The order owns its line sequence by value: quantities and unit prices are
// snapshotted from the catalog at placement and never re-derived from the
// live product. Orders are never physically destroyed; cancellation is a
// status, not a delete.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: u32,
    /// Unit price captured at placement time.
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRecord {
    pub status: RefundStatus,
    pub refund_id: Option<String>,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Contact address snapshot, used for cancellation notifications.
    pub contact_email: String,
    pub lines: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub status: OrderStatus,
    /// Opaque public lookup handle, generated once at creation, immutable.
    pub tracking_id: String,
    pub assigned_driver: Option<Uuid>,
    /// OTP issued at driver assignment, checked on delivery confirmation.
    pub delivery_confirmation: Option<String>,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub refund: Option<RefundRecord>,
    pub cancelled_by: Option<CancelledBy>,
    /// Free-text last known location, driver-updatable.
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Sum of line totals. The stored total_amount is always this value;
    /// client-supplied totals are advisory only.
    pub fn computed_total(&self) -> Decimal {
        self.lines.iter().map(OrderLine::line_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            product_id: Uuid::new_v4(),
            quantity: 3,
            unit_price: Decimal::new(250, 2), // 2.50
        };
        assert_eq!(line.line_total(), Decimal::new(750, 2)); // 7.50
    }

    #[test]
    fn test_computed_total_sums_lines() {
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            contact_email: "a@example.com".to_string(),
            lines: vec![
                OrderLine {
                    product_id: Uuid::new_v4(),
                    quantity: 2,
                    unit_price: Decimal::new(1000, 2),
                },
                OrderLine {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: Decimal::new(550, 2),
                },
            ],
            total_amount: Decimal::ZERO,
            shipping_address: "1 Main St".to_string(),
            status: OrderStatus::Pending,
            tracking_id: "TRK-TEST".to_string(),
            assigned_driver: None,
            delivery_confirmation: None,
            payment_mode: PaymentMode::CashOnDelivery,
            payment_status: PaymentStatus::Unpaid,
            payment_id: None,
            refund: None,
            cancelled_by: None,
            location: None,
            created_at: Utc::now(),
        };
        assert_eq!(order.computed_total(), Decimal::new(2550, 2));
    }
}
