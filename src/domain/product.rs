use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Product - Stock Ledger Entity
// ============================================================================
//
// Stock is a u32: the "stock never goes negative" invariant is enforced by
// the type, and every mutation goes through checked arithmetic inside the
// unit of work. Product creation/editing is owned by an external
// collaborator; the core only reads name/price and mutates stock.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub stock: u32,
    pub low_stock_threshold: u32,
    pub category: String,
}

impl Product {
    /// True when current stock is at or below the replenishment threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: u32, threshold: u32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            unit_price: Decimal::new(1999, 2),
            stock,
            low_stock_threshold: threshold,
            category: "tools".to_string(),
        }
    }

    #[test]
    fn test_low_stock_at_threshold() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(0, 5).is_low_stock());
    }

    #[test]
    fn test_not_low_stock_above_threshold() {
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn test_product_serialization() {
        let p = product(10, 3);
        let json = serde_json::to_string(&p).unwrap();
        let back: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, p.id);
        assert_eq!(back.stock, 10);
        assert_eq!(back.unit_price, p.unit_price);
    }
}
