mod circuit_breaker;
mod retry;

pub use circuit_breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker};
pub use retry::{retry_on_transient, retry_with_backoff, IsTransient, RetryConfig};
