//! RPC utilities for gateway reconnection.
//!
//! This module provides `RetryExecutor`, exponential backoff retry logic
//! the bridge gateway can optionally apply around `register_session`.

pub mod retry;

pub use retry::RetryExecutor;
