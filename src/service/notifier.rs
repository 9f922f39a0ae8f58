use std::sync::Arc;

use crate::domain::{Order, Product};
use crate::integrations::EmailSender;
use crate::metrics::Metrics;

// ============================================================================
// Post-Commit Notifier
// ============================================================================
//
// All email dispatch happens strictly after the transaction that triggered
// it has committed, on detached tasks. A transport failure is logged and
// counted; it can never unwind stock or order state.
//
// ============================================================================

pub struct Notifier {
    email: Arc<dyn EmailSender>,
    admin_email: String,
    metrics: Arc<Metrics>,
}

impl Notifier {
    pub fn new(email: Arc<dyn EmailSender>, admin_email: String, metrics: Arc<Metrics>) -> Self {
        Self {
            email,
            admin_email,
            metrics,
        }
    }

    /// Fire-and-forget replenishment alerts for products that crossed their
    /// threshold in a committed reservation.
    pub fn spawn_low_stock_alerts(&self, products: Vec<Product>) {
        for product in products {
            self.metrics.low_stock_alerts.inc();
            let email = self.email.clone();
            let metrics = self.metrics.clone();
            let admin = self.admin_email.clone();

            tokio::spawn(async move {
                let subject = format!("Low stock: {}", product.name);
                let body = format!(
                    "Product {} ({}) is down to {} units (threshold {}).",
                    product.name, product.id, product.stock, product.low_stock_threshold
                );
                if let Err(e) = email.send(&admin, &subject, &body).await {
                    tracing::error!(
                        product_id = %product.id,
                        error = %e,
                        "low stock alert could not be delivered"
                    );
                    metrics.record_notification_failure("low_stock_email");
                }
            });
        }
    }

    /// Fire-and-forget cancellation notices: one to the customer, one to the
    /// back office.
    pub fn spawn_cancellation_emails(&self, order: Order) {
        let email = self.email.clone();
        let metrics = self.metrics.clone();
        let admin = self.admin_email.clone();

        tokio::spawn(async move {
            let subject = format!("Order {} cancelled", order.id);
            let customer_body = format!(
                "Your order {} has been cancelled. Payment status: {}.",
                order.id, order.payment_status
            );
            let admin_body = format!(
                "Order {} (customer {}) was cancelled by the customer.",
                order.id, order.customer_id
            );

            let (to_customer, to_admin) = futures_util::join!(
                email.send(&order.contact_email, &subject, &customer_body),
                email.send(&admin, &subject, &admin_body),
            );

            if let Err(e) = to_customer {
                tracing::error!(order_id = %order.id, error = %e, "customer cancellation email failed");
                metrics.record_notification_failure("cancellation_email");
            }
            if let Err(e) = to_admin {
                tracing::error!(order_id = %order.id, error = %e, "admin cancellation email failed");
                metrics.record_notification_failure("cancellation_email");
            }
        });
    }
}
