use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics - Prometheus observability
// ============================================================================
//
// Counters and latency for the order pipeline:
// - placements and placement latency
// - cancellations by entry path
// - stock conflicts (rejected reservations)
// - low-stock alerts
// - fanout events by type
// - notification and refund failures
//
// The registry is exposed via registry() for an external scrape endpoint.
//
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub order_placement_duration: Histogram,
    pub orders_cancelled: IntCounterVec,
    pub stock_conflicts: IntCounter,
    pub low_stock_alerts: IntCounter,
    pub fanout_events: IntCounterVec,
    pub notification_failures: IntCounterVec,
    pub refund_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed =
            IntCounter::new("orders_placed_total", "Orders successfully placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let order_placement_duration = Histogram::with_opts(
            HistogramOpts::new(
                "order_placement_duration_seconds",
                "Order placement latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(order_placement_duration.clone()))?;

        let orders_cancelled = IntCounterVec::new(
            Opts::new("orders_cancelled_total", "Orders cancelled, by entry path"),
            &["by"],
        )?;
        registry.register(Box::new(orders_cancelled.clone()))?;

        let stock_conflicts = IntCounter::new(
            "stock_conflicts_total",
            "Placements rejected for insufficient stock",
        )?;
        registry.register(Box::new(stock_conflicts.clone()))?;

        let low_stock_alerts = IntCounter::new(
            "low_stock_alerts_total",
            "Low-stock alerts triggered by reservations",
        )?;
        registry.register(Box::new(low_stock_alerts.clone()))?;

        let fanout_events = IntCounterVec::new(
            Opts::new("fanout_events_total", "Live events broadcast, by type"),
            &["event"],
        )?;
        registry.register(Box::new(fanout_events.clone()))?;

        let notification_failures = IntCounterVec::new(
            Opts::new(
                "notification_failures_total",
                "Best-effort notifications that failed after retries",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(notification_failures.clone()))?;

        let refund_failures = IntCounter::new(
            "refund_failures_total",
            "Refund processor failures recorded on orders",
        )?;
        registry.register(Box::new(refund_failures.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            order_placement_duration,
            orders_cancelled,
            stock_conflicts,
            low_stock_alerts,
            fanout_events,
            notification_failures,
            refund_failures,
        })
    }

    /// Registry handle for the external scrape endpoint.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_cancellation(&self, by: &str) {
        self.orders_cancelled.with_label_values(&[by]).inc();
    }

    pub fn record_fanout(&self, event: &str) {
        self.fanout_events.with_label_values(&[event]).inc();
    }

    pub fn record_notification_failure(&self, kind: &str) {
        self.notification_failures.with_label_values(&[kind]).inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_counters_record() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_placed.inc();
        metrics.record_cancellation("customer");
        metrics.record_fanout("orderStatusUpdated");
        metrics.record_notification_failure("low_stock_email");

        let gathered = metrics.registry.gather();
        let placed = gathered
            .iter()
            .find(|m| m.name() == "orders_placed_total")
            .unwrap();
        assert_eq!(placed.metric[0].counter.value, Some(1.0));

        let cancelled = gathered
            .iter()
            .find(|m| m.name() == "orders_cancelled_total")
            .unwrap();
        assert_eq!(cancelled.metric[0].counter.value, Some(1.0));
    }
}
