// ============================================================================
// Domain Layer
// ============================================================================
//
// Entities, value objects and business rules. No persistence or transport
// concerns live here.
//
// ============================================================================

pub mod order;
pub mod product;

pub use order::{
    guard_customer_cancel, guard_transition, CancelledBy, Order, OrderError, OrderLine,
    OrderStatus, PaymentMode, PaymentStatus, RefundRecord, RefundStatus,
};
pub use product::Product;
