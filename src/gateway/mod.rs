//! Backend Gateway
//!
//! REST adapter for the StoRM backend and the retry schedule it uses.

pub mod client;
pub mod retry;

pub use client::{GatewayConfig, StormGateway};
pub use retry::{with_retry, CappedExponentialBackoff, RetryPolicy};
