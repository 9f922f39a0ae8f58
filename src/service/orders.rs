use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::domain::{
    guard_customer_cancel, guard_transition, CancelledBy, Order, OrderError, OrderLine,
    OrderStatus, PaymentMode, PaymentStatus, RefundRecord, RefundStatus,
};
use crate::error::CoreError;
use crate::fanout::LiveEvent;
use crate::integrations::RefundProcessor;
use crate::metrics::Metrics;
use crate::store::{MemoryStore, StoreError, UnitOfWork};
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

use super::invoice::{self, InvoiceLine, InvoiceParty};
use super::notifier::Notifier;
use super::tracking::{generate_tracking_id, TrackingInfo};

// ============================================================================
// Order Service
// ============================================================================
//
// Orchestrates: request -> guards -> unit of work -> commit -> post-commit
// notifications. Read-modify-write operations run under an optimistic retry:
// a commit that loses the version race is replayed from a fresh read, so
// guards are always evaluated against current state.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub customer_id: Uuid,
    pub contact_email: String,
    pub lines: Vec<LineItemRequest>,
    pub shipping_address: String,
    pub payment_mode: PaymentMode,
    pub payment_id: Option<String>,
    /// Client-declared total. Advisory only: the stored total is always
    /// recomputed from snapshotted unit prices, and a disagreement is logged.
    pub total_amount: Option<Decimal>,
}

pub struct OrderService {
    store: Arc<MemoryStore>,
    refunds: Arc<dyn RefundProcessor>,
    notifier: Arc<Notifier>,
    metrics: Arc<Metrics>,
    commit_retry: RetryConfig,
}

// Internal transaction error: keeps the transient/permanent split visible to
// the retry loop before everything collapses into CoreError at the boundary.
#[derive(Debug)]
enum TxError {
    Store(StoreError),
    Core(CoreError),
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::Store(e) => e.fmt(f),
            TxError::Core(e) => e.fmt(f),
        }
    }
}

impl IsTransient for TxError {
    fn is_transient(&self) -> bool {
        match self {
            TxError::Store(e) => e.is_transient(),
            TxError::Core(_) => false,
        }
    }
}

impl From<StoreError> for TxError {
    fn from(e: StoreError) -> Self {
        TxError::Store(e)
    }
}

impl From<OrderError> for TxError {
    fn from(e: OrderError) -> Self {
        TxError::Core(e.into())
    }
}

impl TxError {
    fn into_core(self) -> CoreError {
        match self {
            TxError::Store(e) => e.into(),
            TxError::Core(e) => e,
        }
    }
}

fn generate_confirmation_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

impl OrderService {
    pub fn new(
        store: Arc<MemoryStore>,
        refunds: Arc<dyn RefundProcessor>,
        notifier: Arc<Notifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            refunds,
            notifier,
            metrics,
            commit_retry: RetryConfig::commit_conflicts(),
        }
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Atomically reserve stock for every line and create the order. On any
    /// failure nothing is reserved and no order exists. Low-stock alerts are
    /// dispatched after commit and cannot affect the outcome.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<Order, CoreError> {
        let timer = self.metrics.order_placement_duration.start_timer();

        if request.lines.is_empty() {
            return Err(OrderError::EmptyLines.into());
        }
        for line in &request.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity(line.quantity).into());
            }
        }

        // Snapshot unit prices; the commit re-validates stock under the lock.
        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = self.store.get_product(line.product_id).await?;
            lines.push(OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.unit_price,
            });
        }

        let order = self.build_order(&request, lines);

        let mut uow = UnitOfWork::new();
        for line in &order.lines {
            uow.reserve_stock(line.product_id, line.quantity);
        }
        uow.insert_order(order.clone());
        uow.publish(LiveEvent::OrderStatusUpdated {
            order_id: order.id,
            status: OrderStatus::Pending,
            message: Some("order placed".to_string()),
        });

        let committed = match self.store.commit(uow).await {
            Ok(committed) => committed,
            Err(e) => {
                if matches!(e, StoreError::InsufficientStock { .. }) {
                    self.metrics.stock_conflicts.inc();
                }
                return Err(e.into());
            }
        };

        self.metrics.orders_placed.inc();
        self.metrics.record_fanout("orderStatusUpdated");
        timer.observe_duration();

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            tracking_id = %order.tracking_id,
            total = %order.total_amount,
            "order placed"
        );

        if !committed.low_stock.is_empty() {
            self.notifier.spawn_low_stock_alerts(committed.low_stock);
        }

        Ok(order)
    }

    fn build_order(&self, request: &PlaceOrderRequest, lines: Vec<OrderLine>) -> Order {
        let payment_status = match (request.payment_mode, &request.payment_id) {
            (PaymentMode::Online, Some(_)) => PaymentStatus::Paid,
            _ => PaymentStatus::Unpaid,
        };

        let mut order = Order {
            id: Uuid::new_v4(),
            customer_id: request.customer_id,
            contact_email: request.contact_email.clone(),
            lines,
            total_amount: Decimal::ZERO,
            shipping_address: request.shipping_address.clone(),
            status: OrderStatus::Pending,
            tracking_id: generate_tracking_id(),
            assigned_driver: None,
            delivery_confirmation: None,
            payment_mode: request.payment_mode,
            payment_status,
            payment_id: request.payment_id.clone(),
            refund: None,
            cancelled_by: None,
            location: None,
            created_at: Utc::now(),
        };
        order.total_amount = order.computed_total();

        if let Some(declared) = request.total_amount {
            if declared != order.total_amount {
                tracing::warn!(
                    declared = %declared,
                    computed = %order.total_amount,
                    "client-declared total disagrees with line prices, using computed total"
                );
            }
        }

        order
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    /// Admin/staff status update. Cancellation routes through the restocking
    /// path; everything else is a plain guarded transition.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, CoreError> {
        if new_status == OrderStatus::Cancelled {
            return self.cancel_with_restock(order_id).await;
        }

        let store = &self.store;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            guard_transition(order.status, new_status)?;

            let mut updated = order;
            updated.status = new_status;

            let mut uow = UnitOfWork::new();
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::OrderStatusUpdated {
                order_id,
                status: new_status,
                message: None,
            });
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_fanout("orderStatusUpdated");
        tracing::info!(order_id = %order_id, status = %new_status, "order status updated");
        Ok(updated)
    }

    /// Admin-initiated cancellation: every line's stock is restored and the
    /// order reaches Cancelled in the same commit.
    pub async fn cancel_with_restock(&self, order_id: Uuid) -> Result<Order, CoreError> {
        let store = &self.store;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            guard_transition(order.status, OrderStatus::Cancelled)?;

            let mut updated = order;
            updated.status = OrderStatus::Cancelled;
            updated.cancelled_by = Some(CancelledBy::Admin);

            let mut uow = UnitOfWork::new();
            for line in &updated.lines {
                uow.release_stock(line.product_id, line.quantity);
            }
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::OrderCancelled {
                order_id,
                status: OrderStatus::Cancelled,
                refund_status: updated.refund.as_ref().map(|r| r.status),
            });
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_cancellation("admin");
        self.metrics.record_fanout("orderCancelled");
        tracing::info!(order_id = %order_id, "order cancelled with restock");
        Ok(updated)
    }

    /// Customer-initiated cancellation. Paid online orders are refunded
    /// first; the order flips to Cancelled only after the refund resolves.
    /// On refund failure only the failed attempt is recorded and the order
    /// keeps its current status, so the caller can retry.
    pub async fn customer_cancel(
        &self,
        principal: &Principal,
        order_id: Uuid,
    ) -> Result<Order, CoreError> {
        let (order, _) = self.store.get_order(order_id).await?;
        if order.customer_id != principal.id {
            return Err(OrderError::NotOrderOwner.into());
        }
        guard_customer_cancel(order.status).map_err(CoreError::from)?;

        let refund = self.resolve_refund(&order).await?;

        let store = &self.store;
        let refund_ref = &refund;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            if let Err(guard) = guard_customer_cancel(order.status) {
                // A competing cancellation can land between the refund call
                // and this commit. The money left the account either way, so
                // the refund record must still reach the cancelled order;
                // stock was already restored by the path that won.
                if order.status == OrderStatus::Cancelled {
                    if let Some(record) = refund_ref {
                        let mut updated = order;
                        updated.refund = Some(record.clone());
                        updated.payment_status = PaymentStatus::Refunded;
                        let mut uow = UnitOfWork::new();
                        uow.update_order(updated.clone(), version);
                        store.commit(uow).await?;
                        return Ok(updated);
                    }
                }
                return Err(guard.into());
            }

            let mut updated = order;
            updated.status = OrderStatus::Cancelled;
            updated.cancelled_by = Some(CancelledBy::Customer);
            if let Some(record) = refund_ref {
                updated.refund = Some(record.clone());
                updated.payment_status = PaymentStatus::Refunded;
            }

            let mut uow = UnitOfWork::new();
            for line in &updated.lines {
                uow.release_stock(line.product_id, line.quantity);
            }
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::OrderCancelled {
                order_id,
                status: OrderStatus::Cancelled,
                refund_status: updated.refund.as_ref().map(|r| r.status),
            });
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_cancellation("customer");
        self.metrics.record_fanout("orderCancelled");
        tracing::info!(
            order_id = %order_id,
            refunded = refund.is_some(),
            "order cancelled by customer"
        );

        self.notifier.spawn_cancellation_emails(updated.clone());
        Ok(updated)
    }

    /// Run the refund collaborator when the order was paid online. Returns
    /// the record to attach on success, or surfaces DependencyError after
    /// persisting the failed attempt.
    async fn resolve_refund(&self, order: &Order) -> Result<Option<RefundRecord>, CoreError> {
        if order.payment_mode != PaymentMode::Online || order.payment_status != PaymentStatus::Paid
        {
            return Ok(None);
        }
        let payment_id = order
            .payment_id
            .as_deref()
            .ok_or_else(|| CoreError::Validation("paid order has no payment id".to_string()))?;

        match self.refunds.refund(payment_id, order.total_amount).await {
            Ok(receipt) => Ok(Some(RefundRecord {
                status: RefundStatus::Processed,
                refund_id: Some(receipt.refund_id),
                amount: order.total_amount,
                date: Utc::now(),
            })),
            Err(e) => {
                self.metrics.refund_failures.inc();
                tracing::error!(order_id = %order.id, error = %e, "refund failed");
                self.record_failed_refund(order.id, order.total_amount).await;
                Err(CoreError::Dependency(format!(
                    "refund failed for order {}: {}",
                    order.id, e
                )))
            }
        }
    }

    /// Persist the failed refund attempt without touching status or stock.
    async fn record_failed_refund(&self, order_id: Uuid, amount: Decimal) {
        let store = &self.store;
        let result = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            let mut updated = order;
            updated.refund = Some(RefundRecord {
                status: RefundStatus::Failed,
                refund_id: None,
                amount,
                date: Utc::now(),
            });
            let mut uow = UnitOfWork::new();
            uow.update_order(updated, version);
            store.commit(uow).await?;
            Ok::<_, TxError>(())
        })
        .await;

        if let Err(e) = result {
            tracing::error!(order_id = %order_id, error = %e, "could not record failed refund");
        }
    }

    // ------------------------------------------------------------------
    // Delivery flow
    // ------------------------------------------------------------------

    /// Hand the order to a driver: issues the delivery confirmation code and
    /// moves the order to Shipped.
    pub async fn assign_driver(
        &self,
        order_id: Uuid,
        driver: &Principal,
    ) -> Result<Order, CoreError> {
        if driver.role != Role::Driver {
            return Err(OrderError::NotADriver.into());
        }

        let store = &self.store;
        let driver_id = driver.id;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            guard_transition(order.status, OrderStatus::Shipped)?;

            let mut updated = order;
            updated.assigned_driver = Some(driver_id);
            updated.delivery_confirmation = Some(generate_confirmation_code());
            updated.status = OrderStatus::Shipped;

            let mut uow = UnitOfWork::new();
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::DriverAssigned {
                order_id,
                driver_id,
            });
            uow.publish(LiveEvent::OrderStatusUpdated {
                order_id,
                status: OrderStatus::Shipped,
                message: None,
            });
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_fanout("driverAssigned");
        self.metrics.record_fanout("orderStatusUpdated");
        tracing::info!(order_id = %order_id, driver_id = %driver_id, "driver assigned");
        Ok(updated)
    }

    /// Driver-side delivery status update. Marking Delivered requires the
    /// confirmation code issued at assignment. Cancellation is not reachable
    /// through this path; it must go through the restocking operations.
    pub async fn driver_update(
        &self,
        principal: &Principal,
        order_id: Uuid,
        new_status: OrderStatus,
        confirmation: Option<&str>,
    ) -> Result<Order, CoreError> {
        if new_status == OrderStatus::Cancelled {
            return Err(OrderError::UnsupportedTarget(new_status).into());
        }

        let store = &self.store;
        let driver_id = principal.id;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            if order.assigned_driver != Some(driver_id) {
                return Err(OrderError::NotAssignedDriver.into());
            }
            guard_transition(order.status, new_status)?;

            let mut updated = order;
            if new_status == OrderStatus::Delivered {
                let stored = updated
                    .delivery_confirmation
                    .as_deref()
                    .ok_or(OrderError::ConfirmationNotIssued)?;
                let provided = confirmation.ok_or(OrderError::ConfirmationRequired)?;
                if provided != stored {
                    return Err(OrderError::ConfirmationMismatch.into());
                }
                if updated.payment_mode == PaymentMode::CashOnDelivery
                    && updated.payment_status == PaymentStatus::Unpaid
                {
                    updated.payment_status = PaymentStatus::Paid;
                }
            }
            updated.status = new_status;

            let mut uow = UnitOfWork::new();
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::DeliveryUpdate {
                order_id,
                status: new_status,
            });
            if new_status == OrderStatus::Delivered {
                uow.publish(LiveEvent::OrderDelivered { order_id });
            }
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_fanout("deliveryUpdate");
        if new_status == OrderStatus::Delivered {
            self.metrics.record_fanout("orderDelivered");
        }
        tracing::info!(order_id = %order_id, status = %new_status, "delivery status updated");
        Ok(updated)
    }

    /// Customer-side delivery confirmation by OTP. Exact match required.
    pub async fn confirm_delivery(&self, order_id: Uuid, otp: &str) -> Result<Order, CoreError> {
        let store = &self.store;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            guard_transition(order.status, OrderStatus::Delivered)?;

            let stored = order
                .delivery_confirmation
                .as_deref()
                .ok_or(OrderError::ConfirmationNotIssued)?;
            if otp != stored {
                return Err(OrderError::ConfirmationMismatch.into());
            }

            let mut updated = order;
            updated.status = OrderStatus::Delivered;
            if updated.payment_mode == PaymentMode::CashOnDelivery
                && updated.payment_status == PaymentStatus::Unpaid
            {
                updated.payment_status = PaymentStatus::Paid;
            }

            let mut uow = UnitOfWork::new();
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::OrderDelivered { order_id });
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_fanout("orderDelivered");
        tracing::info!(order_id = %order_id, "delivery confirmed");
        Ok(updated)
    }

    /// Shipment progress update: free-text location, optionally a status.
    /// Terminal targets are rejected: cancellation goes through the
    /// restocking operations, delivery through the confirmation-code paths.
    pub async fn update_shipment(
        &self,
        order_id: Uuid,
        new_status: Option<OrderStatus>,
        location: &str,
    ) -> Result<Order, CoreError> {
        if let Some(target @ (OrderStatus::Cancelled | OrderStatus::Delivered)) = new_status {
            return Err(OrderError::UnsupportedTarget(target).into());
        }

        let store = &self.store;
        let updated = retry_on_transient(&self.commit_retry, |_| async move {
            let (order, version) = store.get_order(order_id).await?;
            let target = new_status.unwrap_or(order.status);
            guard_transition(order.status, target)?;

            let mut updated = order;
            updated.status = target;
            updated.location = Some(location.to_string());

            let mut uow = UnitOfWork::new();
            uow.update_order(updated.clone(), version);
            uow.publish(LiveEvent::ShipmentUpdated {
                shipment_id: order_id,
                status: target,
                location: location.to_string(),
            });
            store.commit(uow).await?;
            Ok::<_, TxError>(updated)
        })
        .await
        .map_err(TxError::into_core)?;

        self.metrics.record_fanout("shipmentUpdated");
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, CoreError> {
        let (order, _) = self.store.get_order(order_id).await?;
        Ok(order)
    }

    pub async fn orders_for_customer(&self, customer_id: Uuid) -> Vec<Order> {
        self.store.orders_for_customer(customer_id).await
    }

    pub async fn orders_for_driver(&self, driver_id: Uuid) -> Vec<Order> {
        self.store.orders_for_driver(driver_id).await
    }

    /// Public, unauthenticated tracking lookup. Exposes status and location
    /// only.
    pub async fn resolve_by_tracking_id(&self, tracking_id: &str) -> Result<TrackingInfo, CoreError> {
        if tracking_id.trim().is_empty() {
            return Err(CoreError::Validation("missing tracking id".to_string()));
        }
        let order = self.store.resolve_tracking(tracking_id).await?;
        Ok(TrackingInfo {
            tracking_id: order.tracking_id.clone(),
            order_id: order.id,
            status: order.status,
            location: order.location.clone(),
        })
    }

    /// Render the invoice for an order, joining product names from the
    /// catalog. Products that have since disappeared render under their id.
    pub async fn render_invoice(
        &self,
        order_id: Uuid,
        customer: &InvoiceParty,
    ) -> Result<Vec<u8>, CoreError> {
        let (order, _) = self.store.get_order(order_id).await?;

        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let name = match self.store.get_product(line.product_id).await {
                Ok(product) => product.name,
                Err(_) => line.product_id.to_string(),
            };
            lines.push(InvoiceLine {
                name,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        Ok(invoice::render(&order, &lines, customer))
    }
}
