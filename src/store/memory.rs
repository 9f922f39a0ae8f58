use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Order, Product};
use crate::fanout::Broadcaster;

use super::unit_of_work::{Committed, OrderWrite, StockMutation, StoreError, UnitOfWork};

// ============================================================================
// Versioned In-Memory Store
// ============================================================================
//
// All records live behind one RwLock; commit takes the write lock, validates
// every staged step, and only then applies them. That makes each commit a
// serializable transaction: per-product stock mutations are linearizable and
// two overlapping placements can never both pass the stock check.
//
// Records carry version counters. Reads hand the version out alongside the
// order so read-modify-write callers can stage an optimistic update; a
// mismatch at commit is a transient VersionConflict.
//
// No await point sits inside the critical section: validate, apply and
// publish are synchronous, so task cancellation can never strand a
// half-applied commit.
//
// ============================================================================

#[derive(Debug, Clone)]
struct ProductRecord {
    product: Product,
    version: u64,
}

#[derive(Debug, Clone)]
struct OrderRecord {
    order: Order,
    version: u64,
}

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, ProductRecord>,
    orders: HashMap<Uuid, OrderRecord>,
    /// tracking id -> order id, for the public unauthenticated lookup.
    tracking: HashMap<String, Uuid>,
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl MemoryStore {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            broadcaster,
        }
    }

    // ------------------------------------------------------------------
    // Product side (creation/editing owned by the external catalog)
    // ------------------------------------------------------------------

    pub async fn upsert_product(&self, product: Product) {
        let mut inner = self.inner.write().await;
        let entry = inner
            .products
            .entry(product.id)
            .or_insert_with(|| ProductRecord {
                product: product.clone(),
                version: 0,
            });
        entry.product = product;
        entry.version += 1;
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, StoreError> {
        let inner = self.inner.read().await;
        inner
            .products
            .get(&id)
            .map(|r| r.product.clone())
            .ok_or(StoreError::ProductNotFound(id))
    }

    // ------------------------------------------------------------------
    // Order reads
    // ------------------------------------------------------------------

    /// Returns the order together with its record version, for staging an
    /// optimistic update.
    pub async fn get_order(&self, id: Uuid) -> Result<(Order, u64), StoreError> {
        let inner = self.inner.read().await;
        inner
            .orders
            .get(&id)
            .map(|r| (r.order.clone(), r.version))
            .ok_or(StoreError::OrderNotFound(id))
    }

    pub async fn orders_for_customer(&self, customer_id: Uuid) -> Vec<Order> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|r| r.order.customer_id == customer_id)
            .map(|r| r.order.clone())
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    pub async fn orders_for_driver(&self, driver_id: Uuid) -> Vec<Order> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|r| r.order.assigned_driver == Some(driver_id))
            .map(|r| r.order.clone())
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    pub async fn resolve_tracking(&self, tracking_id: &str) -> Result<Order, StoreError> {
        let inner = self.inner.read().await;
        let order_id = inner
            .tracking
            .get(tracking_id)
            .ok_or_else(|| StoreError::TrackingNotFound(tracking_id.to_string()))?;
        inner
            .orders
            .get(order_id)
            .map(|r| r.order.clone())
            .ok_or(StoreError::OrderNotFound(*order_id))
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Apply a unit of work atomically. Validation runs to completion before
    /// the first mutation; on any error nothing is applied and nothing is
    /// broadcast.
    pub async fn commit(&self, uow: UnitOfWork) -> Result<Committed, StoreError> {
        let mut inner = self.inner.write().await;

        // Phase 1: validate. Stock checks run cumulatively in staged order so
        // duplicate lines against one product cannot slip past the check, and
        // the first offending product is the one named in the error.
        let mut projected: HashMap<Uuid, u32> = HashMap::new();
        for mutation in &uow.stock {
            match *mutation {
                StockMutation::Reserve {
                    product_id,
                    quantity,
                } => {
                    let current = match projected.get(&product_id) {
                        Some(&s) => s,
                        None => {
                            inner
                                .products
                                .get(&product_id)
                                .ok_or(StoreError::ProductNotFound(product_id))?
                                .product
                                .stock
                        }
                    };
                    let remaining = current.checked_sub(quantity).ok_or(
                        StoreError::InsufficientStock {
                            product_id,
                            requested: quantity,
                            available: current,
                        },
                    )?;
                    projected.insert(product_id, remaining);
                }
                StockMutation::Release {
                    product_id,
                    quantity,
                } => {
                    let current = match projected.get(&product_id) {
                        Some(&s) => s,
                        None => {
                            inner
                                .products
                                .get(&product_id)
                                .ok_or(StoreError::ProductNotFound(product_id))?
                                .product
                                .stock
                        }
                    };
                    projected.insert(product_id, current.saturating_add(quantity));
                }
            }
        }

        match &uow.order {
            Some(OrderWrite::Insert(order)) => {
                if inner.orders.contains_key(&order.id) {
                    return Err(StoreError::DuplicateOrder(order.id));
                }
            }
            Some(OrderWrite::Update {
                order,
                expected_version,
            }) => {
                let record = inner
                    .orders
                    .get(&order.id)
                    .ok_or(StoreError::OrderNotFound(order.id))?;
                if record.version != *expected_version {
                    return Err(StoreError::VersionConflict {
                        order_id: order.id,
                        expected: *expected_version,
                        actual: record.version,
                    });
                }
            }
            None => {}
        }

        // Phase 2: apply. Infallible from here on.
        let mut low_stock = Vec::new();
        let reserved: Vec<Uuid> = uow
            .stock
            .iter()
            .filter_map(|m| match m {
                StockMutation::Reserve { product_id, .. } => Some(*product_id),
                StockMutation::Release { .. } => None,
            })
            .collect();

        for (product_id, stock) in &projected {
            // Validation guarantees presence.
            if let Some(record) = inner.products.get_mut(product_id) {
                record.product.stock = *stock;
                record.version += 1;
            }
        }

        for product_id in reserved {
            if let Some(record) = inner.products.get(&product_id) {
                if record.product.is_low_stock()
                    && !low_stock.iter().any(|p: &Product| p.id == product_id)
                {
                    low_stock.push(record.product.clone());
                }
            }
        }

        let committed_order = match uow.order {
            Some(OrderWrite::Insert(order)) => {
                inner.tracking.insert(order.tracking_id.clone(), order.id);
                inner.orders.insert(
                    order.id,
                    OrderRecord {
                        order: order.clone(),
                        version: 1,
                    },
                );
                tracing::debug!(order_id = %order.id, "order inserted");
                Some(order)
            }
            Some(OrderWrite::Update {
                order,
                expected_version,
            }) => {
                inner.orders.insert(
                    order.id,
                    OrderRecord {
                        order: order.clone(),
                        version: expected_version + 1,
                    },
                );
                tracing::debug!(order_id = %order.id, version = expected_version + 1, "order updated");
                Some(order)
            }
            None => None,
        };

        // Phase 3: publish queued events while still holding the lock, so
        // subscribers observe state changes in commit order. The broadcaster
        // is fire-and-forget and cannot fail the commit.
        for event in uow.events {
            self.broadcaster.publish(event);
        }

        Ok(Committed {
            order: committed_order,
            low_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, PaymentMode, PaymentStatus};
    use crate::fanout::{ChannelBroadcaster, LiveEvent};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn store() -> (MemoryStore, Arc<ChannelBroadcaster>) {
        let fanout = Arc::new(ChannelBroadcaster::new(64));
        (MemoryStore::new(fanout.clone()), fanout)
    }

    fn product(id: Uuid, stock: u32) -> Product {
        Product {
            id,
            name: "Widget".to_string(),
            unit_price: Decimal::new(500, 2),
            stock,
            low_stock_threshold: 2,
            category: "tools".to_string(),
        }
    }

    fn order(id: Uuid) -> Order {
        Order {
            id,
            customer_id: Uuid::new_v4(),
            contact_email: "c@example.com".to_string(),
            lines: vec![],
            total_amount: Decimal::ZERO,
            shipping_address: "1 Main St".to_string(),
            status: OrderStatus::Pending,
            tracking_id: format!("TRK-{}", id.simple()),
            assigned_driver: None,
            delivery_confirmation: None,
            payment_mode: PaymentMode::CashOnDelivery,
            payment_status: PaymentStatus::Unpaid,
            payment_id: None,
            refund: None,
            cancelled_by: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let (store, _fanout) = store();
        let pid = Uuid::new_v4();
        store.upsert_product(product(pid, 10)).await;

        let mut uow = UnitOfWork::new();
        uow.reserve_stock(pid, 3);
        let committed = store.commit(uow).await.unwrap();

        assert_eq!(store.get_product(pid).await.unwrap().stock, 7);
        assert!(committed.low_stock.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_stock_aborts_whole_commit() {
        let (store, _fanout) = store();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        store.upsert_product(product(p1, 10)).await;
        store.upsert_product(product(p2, 1)).await;

        let mut uow = UnitOfWork::new();
        uow.reserve_stock(p1, 5).reserve_stock(p2, 2);
        uow.insert_order(order(Uuid::new_v4()));

        let err = store.commit(uow).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { product_id, .. } if product_id == p2
        ));

        // First reservation rolled back with the rest.
        assert_eq!(store.get_product(p1).await.unwrap().stock, 10);
        assert_eq!(store.get_product(p2).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_duplicate_lines_checked_cumulatively() {
        let (store, _fanout) = store();
        let pid = Uuid::new_v4();
        store.upsert_product(product(pid, 5)).await;

        let mut uow = UnitOfWork::new();
        uow.reserve_stock(pid, 3).reserve_stock(pid, 3);

        assert!(matches!(
            store.commit(uow).await,
            Err(StoreError::InsufficientStock { .. })
        ));
        assert_eq!(store.get_product(pid).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_low_stock_snapshot_collected() {
        let (store, _fanout) = store();
        let pid = Uuid::new_v4();
        store.upsert_product(product(pid, 4)).await; // threshold 2

        let mut uow = UnitOfWork::new();
        uow.reserve_stock(pid, 3);
        let committed = store.commit(uow).await.unwrap();

        assert_eq!(committed.low_stock.len(), 1);
        assert_eq!(committed.low_stock[0].stock, 1);
    }

    #[tokio::test]
    async fn test_version_conflict_on_stale_update() {
        let (store, _fanout) = store();
        let oid = Uuid::new_v4();

        let mut uow = UnitOfWork::new();
        uow.insert_order(order(oid));
        store.commit(uow).await.unwrap();

        let (read, version) = store.get_order(oid).await.unwrap();

        // A competing writer lands first.
        let mut first = UnitOfWork::new();
        let mut updated = read.clone();
        updated.status = OrderStatus::Processing;
        first.update_order(updated, version);
        store.commit(first).await.unwrap();

        // The stale writer must be rejected.
        let mut stale = UnitOfWork::new();
        let mut updated = read.clone();
        updated.status = OrderStatus::Shipped;
        stale.update_order(updated, version);
        let err = store.commit(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let (current, _) = store.get_order(oid).await.unwrap();
        assert_eq!(current.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_events_published_only_on_successful_commit() {
        let (store, fanout) = store();
        let mut rx = fanout.subscribe();
        let pid = Uuid::new_v4();
        store.upsert_product(product(pid, 1)).await;

        let mut failing = UnitOfWork::new();
        failing.reserve_stock(pid, 5);
        failing.publish(LiveEvent::OrderDelivered {
            order_id: Uuid::new_v4(),
        });
        assert!(store.commit(failing).await.is_err());

        let oid = Uuid::new_v4();
        let mut succeeding = UnitOfWork::new();
        succeeding.insert_order(order(oid));
        succeeding.publish(LiveEvent::OrderStatusUpdated {
            order_id: oid,
            status: OrderStatus::Pending,
            message: None,
        });
        store.commit(succeeding).await.unwrap();

        // The only event on the wire is the one from the successful commit.
        match rx.try_recv().unwrap() {
            LiveEvent::OrderStatusUpdated { order_id, .. } => assert_eq!(order_id, oid),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tracking_index_written_on_insert() {
        let (store, _fanout) = store();
        let oid = Uuid::new_v4();
        let o = order(oid);
        let tracking = o.tracking_id.clone();

        let mut uow = UnitOfWork::new();
        uow.insert_order(o);
        store.commit(uow).await.unwrap();

        let resolved = store.resolve_tracking(&tracking).await.unwrap();
        assert_eq!(resolved.id, oid);
        assert!(matches!(
            store.resolve_tracking("TRK-NOPE").await,
            Err(StoreError::TrackingNotFound(_))
        ));
    }
}
