//! Order lifecycle and stock-consistency engine for a logistics back office.
//!
//! The core pieces:
//! - a versioned in-memory store whose commits are serializable transactions
//!   (stock can never over-sell or go negative),
//! - a guarded order status state machine (Pending -> Processing -> Shipped ->
//!   Delivered, with a single Cancelled terminal state),
//! - live event fanout to connected listeners, published in commit order,
//! - post-commit, best-effort notification dispatch (low stock, cancellation),
//! - an opaque tracking-id lookup and a pure invoice renderer.
//!
//! HTTP routing, auth, email transport and payment processing are external
//! collaborators consumed through traits.

pub mod auth;
pub mod domain;
pub mod error;
pub mod fanout;
pub mod integrations;
pub mod metrics;
pub mod service;
pub mod store;
pub mod utils;

pub use auth::{Principal, Role};
pub use domain::{Order, OrderStatus, PaymentMode, PaymentStatus, Product};
pub use error::{CoreError, ErrorResponse};
pub use fanout::{Broadcaster, ChannelBroadcaster, LiveEvent};
pub use service::{
    LineItemRequest, Notifier, OrderService, PlaceOrderRequest, TrackingInfo,
};
pub use store::{MemoryStore, UnitOfWork};
