use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use orderflow::domain::Product;
use orderflow::fanout::ChannelBroadcaster;
use orderflow::integrations::{AutoApproveRefunds, GuardedEmailSender, LoggingEmailSender};
use orderflow::metrics::Metrics;
use orderflow::service::{InvoiceParty, LineItemRequest, Notifier, OrderService, PlaceOrderRequest};
use orderflow::store::MemoryStore;
use orderflow::{OrderStatus, PaymentMode, Principal, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, environment-overridable: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,orderflow=debug")),
        )
        .init();

    tracing::info!("starting orderflow demo");

    // === 1. Wiring: fanout, store, metrics, collaborators ===
    let fanout = Arc::new(ChannelBroadcaster::new(256));
    let store = Arc::new(MemoryStore::new(fanout.clone()));
    let metrics = Arc::new(Metrics::new()?);

    let admin_email =
        std::env::var("ORDERFLOW_ADMIN_EMAIL").unwrap_or_else(|_| "ops@example.com".to_string());
    let email = Arc::new(GuardedEmailSender::new(Arc::new(LoggingEmailSender)));
    let notifier = Arc::new(Notifier::new(email, admin_email, metrics.clone()));

    let service = Arc::new(OrderService::new(
        store.clone(),
        Arc::new(AutoApproveRefunds),
        notifier,
        metrics.clone(),
    ));

    // === 2. Live listener ===
    let mut events = fanout.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(event = ?event, "live event");
        }
    });

    // === 3. Seed the catalog (product CRUD is external to the core) ===
    let widget = Product {
        id: Uuid::new_v4(),
        name: "Widget".to_string(),
        unit_price: rust_decimal::Decimal::new(1999, 2),
        stock: 10,
        low_stock_threshold: 5,
        category: "tools".to_string(),
    };
    let gadget = Product {
        id: Uuid::new_v4(),
        name: "Gadget".to_string(),
        unit_price: rust_decimal::Decimal::new(4950, 2),
        stock: 4,
        low_stock_threshold: 2,
        category: "tools".to_string(),
    };
    store.upsert_product(widget.clone()).await;
    store.upsert_product(gadget.clone()).await;

    // === 4. Full order lifecycle ===
    let customer = Principal::new(Uuid::new_v4(), Role::Customer);
    let order = service
        .place_order(PlaceOrderRequest {
            customer_id: customer.id,
            contact_email: "jane@example.com".to_string(),
            lines: vec![
                LineItemRequest {
                    product_id: widget.id,
                    quantity: 2,
                },
                LineItemRequest {
                    product_id: gadget.id,
                    quantity: 1,
                },
            ],
            shipping_address: "1 Main St, Springfield".to_string(),
            payment_mode: PaymentMode::CashOnDelivery,
            payment_id: None,
            total_amount: None,
        })
        .await?;
    tracing::info!(order_id = %order.id, tracking = %order.tracking_id, "order placed");

    service
        .update_status(order.id, OrderStatus::Processing)
        .await?;

    let driver = Principal::new(Uuid::new_v4(), Role::Driver);
    let shipped = service.assign_driver(order.id, &driver).await?;
    let otp = shipped
        .delivery_confirmation
        .clone()
        .expect("assignment issues a confirmation code");

    service
        .update_shipment(order.id, None, "Depot 4, Springfield")
        .await?;

    let lookup = service.resolve_by_tracking_id(&order.tracking_id).await?;
    tracing::info!(status = %lookup.status, location = ?lookup.location, "public tracking lookup");

    let delivered = service.confirm_delivery(order.id, &otp).await?;
    tracing::info!(status = %delivered.status, payment = %delivered.payment_status, "order delivered");

    // === 5. A second order that gets cancelled by the customer ===
    let paid = service
        .place_order(PlaceOrderRequest {
            customer_id: customer.id,
            contact_email: "jane@example.com".to_string(),
            lines: vec![LineItemRequest {
                product_id: widget.id,
                quantity: 5,
            }],
            shipping_address: "1 Main St, Springfield".to_string(),
            payment_mode: PaymentMode::Online,
            payment_id: Some("pay_demo_1".to_string()),
            total_amount: None,
        })
        .await?;

    let cancelled = service.customer_cancel(&customer, paid.id).await?;
    tracing::info!(
        order_id = %cancelled.id,
        payment = %cancelled.payment_status,
        "order refunded and cancelled"
    );

    // === 6. Invoice for the delivered order ===
    let invoice = service
        .render_invoice(
            order.id,
            &InvoiceParty {
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
            },
        )
        .await?;
    println!("{}", String::from_utf8_lossy(&invoice));

    // Let the detached notification tasks drain before exit.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    tracing::info!("demo complete");
    Ok(())
}
