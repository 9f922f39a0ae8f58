use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::utils::{retry_with_backoff, BreakerConfig, BreakerError, CircuitBreaker, RetryConfig};

// ============================================================================
// Email Collaborator
// ============================================================================
//
// The transport is external; the core only sees this trait. Every dispatch
// path that follows a committed transaction is best-effort: failures are
// logged and counted, never surfaced into the transaction's outcome.
//
// ============================================================================

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Demo/dev sender that only logs. Stands in for a real transport.
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(to = %to, subject = %subject, bytes = body.len(), "email dispatched");
        Ok(())
    }
}

/// Wraps a sender with a circuit breaker and retry, so a struggling mail
/// transport degrades to dropped notifications instead of piling up work.
pub struct GuardedEmailSender {
    inner: Arc<dyn EmailSender>,
    breaker: CircuitBreaker,
    retry: RetryConfig,
}

impl GuardedEmailSender {
    pub fn new(inner: Arc<dyn EmailSender>) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(BreakerConfig::default()),
            retry: RetryConfig::notifications(),
        }
    }

    pub fn with_config(
        inner: Arc<dyn EmailSender>,
        breaker: BreakerConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(breaker),
            retry,
        }
    }
}

#[async_trait]
impl EmailSender for GuardedEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let result = retry_with_backoff(&self.retry, |_attempt| async move {
            self.breaker
                .call(self.inner.send(to, subject, body))
                .await
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(BreakerError::Open) => {
                tracing::error!(to = %to, subject = %subject, "email skipped, circuit breaker open");
                Err(anyhow::anyhow!("email transport unavailable"))
            }
            Err(BreakerError::Inner(e)) => {
                tracing::error!(to = %to, subject = %subject, error = %e, "email send failed");
                Err(e)
            }
        }
    }
}
