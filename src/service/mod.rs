mod invoice;
mod notifier;
mod orders;
mod tracking;

pub use invoice::{render as render_invoice, InvoiceLine, InvoiceParty};
pub use notifier::Notifier;
pub use orders::{LineItemRequest, OrderService, PlaceOrderRequest};
pub use tracking::{generate_tracking_id, TrackingInfo};
