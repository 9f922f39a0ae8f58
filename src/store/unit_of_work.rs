use uuid::Uuid;

use crate::domain::{Order, Product};
use crate::fanout::LiveEvent;
use crate::utils::IsTransient;

// ============================================================================
// Transactional Unit of Work
// ============================================================================
//
// A unit of work stages stock mutations against any number of products plus
// at most one order write, together with the live events describing the
// change. Nothing is observable until MemoryStore::commit applies the whole
// batch; commit either applies every step or none of them.
//
// Queued events are published by the store inside the commit critical
// section, so fanout order always matches commit order.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum StockMutation {
    /// Decrement stock for an order line (placement).
    Reserve { product_id: Uuid, quantity: u32 },
    /// Increment stock for an order line (cancellation restock).
    Release { product_id: Uuid, quantity: u32 },
}

#[derive(Debug, Clone)]
pub enum OrderWrite {
    Insert(Order),
    Update { order: Order, expected_version: u64 },
}

#[derive(Debug, Default)]
pub struct UnitOfWork {
    pub(super) stock: Vec<StockMutation>,
    pub(super) order: Option<OrderWrite>,
    pub(super) events: Vec<LiveEvent>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve_stock(&mut self, product_id: Uuid, quantity: u32) -> &mut Self {
        self.stock.push(StockMutation::Reserve {
            product_id,
            quantity,
        });
        self
    }

    pub fn release_stock(&mut self, product_id: Uuid, quantity: u32) -> &mut Self {
        self.stock.push(StockMutation::Release {
            product_id,
            quantity,
        });
        self
    }

    pub fn insert_order(&mut self, order: Order) -> &mut Self {
        self.order = Some(OrderWrite::Insert(order));
        self
    }

    /// Stage a full-order overwrite guarded by the version observed when the
    /// order was read. A concurrent writer makes the commit fail with
    /// VersionConflict, which is transient and safe to retry.
    pub fn update_order(&mut self, order: Order, expected_version: u64) -> &mut Self {
        self.order = Some(OrderWrite::Update {
            order,
            expected_version,
        });
        self
    }

    /// Queue a live event to be broadcast at commit time.
    pub fn publish(&mut self, event: LiveEvent) -> &mut Self {
        self.events.push(event);
        self
    }
}

/// Outcome of a committed unit of work.
#[derive(Debug)]
pub struct Committed {
    /// The order as persisted, when the unit of work wrote one.
    pub order: Option<Order>,
    /// Products whose stock fell to or below their threshold in this commit.
    /// Alert dispatch happens strictly after commit, outside the store.
    pub low_stock: Vec<Product>,
}

// ============================================================================
// Store Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("no order for tracking id: {0}")]
    TrackingNotFound(String),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("version conflict on order {order_id}: expected {expected}, current {actual}")]
    VersionConflict {
        order_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("order already exists: {0}")]
    DuplicateOrder(Uuid),
}

impl IsTransient for StoreError {
    fn is_transient(&self) -> bool {
        // Only a lost optimistic race is worth retrying; everything else is a
        // stable fact about the data.
        matches!(self, StoreError::VersionConflict { .. })
    }
}
