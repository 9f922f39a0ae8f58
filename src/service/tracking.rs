use serde::Serialize;
use uuid::Uuid;

use crate::domain::OrderStatus;

// ============================================================================
// Tracking Identifiers
// ============================================================================
//
// The tracking id is an opaque public handle, distinct from the order's
// primary id, generated once at placement and immutable after that. The
// unauthenticated lookup answers with status and location only; nothing else
// modeled on the order leaves through this door.
//
// ============================================================================

pub fn generate_tracking_id() -> String {
    format!("TRK-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// Public, PII-free view returned by the tracking lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub tracking_id: String,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub location: Option<String>,
}
