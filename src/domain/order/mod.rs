mod entity;
mod errors;
mod status;

pub use entity::{Order, OrderLine, RefundRecord};
pub use errors::OrderError;
pub use status::{
    guard_customer_cancel, guard_transition, CancelledBy, OrderStatus, PaymentMode, PaymentStatus,
    RefundStatus,
};
