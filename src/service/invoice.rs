use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::Order;

// ============================================================================
// Invoice Materializer
// ============================================================================
//
// Pure function: order plus caller-resolved read models in, document bytes
// out. No side effects. Monetary values always render with exactly two
// decimal places.
//
// ============================================================================

/// One invoice row; product name and price already resolved by the caller.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl InvoiceLine {
    fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Caller-resolved customer identity for the bill-to block.
#[derive(Debug, Clone)]
pub struct InvoiceParty {
    pub name: String,
    pub email: String,
}

const RULE: &str =
    "----------------------------------------------------------------------";
const DOUBLE_RULE: &str =
    "======================================================================";

// Commercial rounding: midpoints go away from zero, so 12.345 bills as 12.35.
fn money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Render a fixed-layout invoice document for an order.
pub fn render(order: &Order, lines: &[InvoiceLine], customer: &InvoiceParty) -> Vec<u8> {
    let mut doc = String::new();

    doc.push_str(DOUBLE_RULE);
    doc.push_str("\n                               INVOICE\n");
    doc.push_str(DOUBLE_RULE);
    doc.push('\n');
    doc.push_str(&format!("Invoice no : {}\n", order.id));
    doc.push_str(&format!("Date       : {}\n", order.created_at.format("%Y-%m-%d")));
    doc.push_str(&format!("Tracking   : {}\n", order.tracking_id));
    doc.push('\n');
    doc.push_str(&format!("Bill to    : {} <{}>\n", customer.name, customer.email));
    doc.push_str(&format!("Ship to    : {}\n", order.shipping_address));
    doc.push('\n');
    doc.push_str(RULE);
    doc.push('\n');
    doc.push_str(&format!(
        "{:<34} {:>5} {:>13} {:>13}\n",
        "Item", "Qty", "Unit Price", "Line Total"
    ));
    doc.push_str(RULE);
    doc.push('\n');

    let mut total = Decimal::ZERO;
    for line in lines {
        total += line.line_total();
        doc.push_str(&format!(
            "{:<34} {:>5} {:>13} {:>13}\n",
            line.name,
            line.quantity,
            money(line.unit_price),
            money(line.line_total())
        ));
    }

    doc.push_str(RULE);
    doc.push('\n');
    doc.push_str(&format!("{:<34} {:>5} {:>13} {:>13}\n", "", "", "Total", money(total)));
    doc.push('\n');
    doc.push_str(&format!(
        "Payment    : {} ({})\n",
        order.payment_mode, order.payment_status
    ));
    doc.push_str(DOUBLE_RULE);
    doc.push('\n');

    doc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderLine, OrderStatus, PaymentMode, PaymentStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            contact_email: "jane@example.com".to_string(),
            lines: vec![OrderLine {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: Decimal::new(1999, 2),
            }],
            total_amount: Decimal::new(3998, 2),
            shipping_address: "1 Main St".to_string(),
            status: OrderStatus::Pending,
            tracking_id: "TRK-ABC".to_string(),
            assigned_driver: None,
            delivery_confirmation: None,
            payment_mode: PaymentMode::Online,
            payment_status: PaymentStatus::Paid,
            payment_id: Some("pay_1".to_string()),
            refund: None,
            cancelled_by: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_invoice_contains_lines_and_totals() {
        let order = sample_order();
        let lines = vec![
            InvoiceLine {
                name: "Widget".to_string(),
                quantity: 2,
                unit_price: Decimal::new(1999, 2),
            },
            InvoiceLine {
                name: "Gadget".to_string(),
                quantity: 1,
                unit_price: Decimal::new(500, 2),
            },
        ];
        let customer = InvoiceParty {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
        };

        let text = String::from_utf8(render(&order, &lines, &customer)).unwrap();

        assert!(text.contains("INVOICE"));
        assert!(text.contains("Widget"));
        assert!(text.contains("Gadget"));
        assert!(text.contains("19.99"));
        assert!(text.contains("39.98")); // 2 x 19.99
        assert!(text.contains("44.98")); // grand total
        assert!(text.contains("Jane Doe <jane@example.com>"));
        assert!(text.contains("Online (Paid)"));
        assert!(text.contains(&order.tracking_id));
    }

    #[test]
    fn test_money_always_two_decimals() {
        assert_eq!(money(Decimal::from(5)), "5.00");
        assert_eq!(money(Decimal::new(125, 1)), "12.50");
        assert_eq!(money(Decimal::new(12345, 3)), "12.35"); // midpoint rounds up
        assert_eq!(money(Decimal::new(12344, 3)), "12.34");
    }

    #[test]
    fn test_render_is_pure() {
        let order = sample_order();
        let lines = vec![InvoiceLine {
            name: "Widget".to_string(),
            quantity: 2,
            unit_price: Decimal::new(1999, 2),
        }];
        let customer = InvoiceParty {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
        };
        assert_eq!(
            render(&order, &lines, &customer),
            render(&order, &lines, &customer)
        );
    }
}
