//! Policy engine: reliability rules shared by every transport.
//!
//! ```text
//! Request → [RetryPolicy: classify + backoff] → [HTTP backend]
//! ```

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
