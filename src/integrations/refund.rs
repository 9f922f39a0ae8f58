use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

// ============================================================================
// Refund Processor Collaborator
// ============================================================================
//
// Synchronous from the core's perspective: customer cancellation awaits the
// refund before the order is allowed to reach Cancelled.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: String,
}

#[async_trait]
pub trait RefundProcessor: Send + Sync {
    async fn refund(&self, payment_id: &str, amount: Decimal) -> Result<RefundReceipt>;
}

/// Demo processor that approves every refund with a generated receipt id.
pub struct AutoApproveRefunds;

#[async_trait]
impl RefundProcessor for AutoApproveRefunds {
    async fn refund(&self, payment_id: &str, amount: Decimal) -> Result<RefundReceipt> {
        let receipt = RefundReceipt {
            refund_id: format!("RF-{}", uuid::Uuid::new_v4().simple()),
        };
        tracing::info!(
            payment_id = %payment_id,
            amount = %amount,
            refund_id = %receipt.refund_id,
            "refund processed"
        );
        Ok(receipt)
    }
}
