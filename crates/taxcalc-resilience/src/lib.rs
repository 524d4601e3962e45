//! # taxcalc-resilience
//!
//! Resilience primitives for external AI/knowledge and storage calls:
//! retry with exponential backoff and jitter, a three-state circuit
//! breaker with a process-wide registry, and a cooperative cancellation
//! token honored by retry sleeps.

pub mod cancel;
pub mod circuit_breaker;
pub mod retry;

pub use cancel::*;
pub use circuit_breaker::*;
pub use retry::*;
