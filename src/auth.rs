use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Authenticated Principal
// ============================================================================
//
// Supplied by the external auth gate before any core operation runs. The core
// trusts this identity and only re-checks the guards the business rules
// require (driver role, assigned-driver identity, order ownership).
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Customer,
    Driver,
    WarehouseManager,
    Staff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}
