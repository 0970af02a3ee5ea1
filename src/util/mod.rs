//! Utility modules: retry, timeout, cancellable waits.

pub mod retry;
pub mod timeout;
pub mod wait;
