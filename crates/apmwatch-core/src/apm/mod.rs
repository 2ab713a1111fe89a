//! APM backend access
//!
//! Builds the time-windowed search and turns its response into raw samples.

mod client;
mod query;

pub use client::MetricsClient;
pub use query::{QueryBuilder, DURATION_VALUES_FIELD, TRANSACTION_NAME_FIELD};
