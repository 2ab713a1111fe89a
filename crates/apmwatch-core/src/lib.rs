//! # apmwatch
//!
//! Scheduled latency monitor for an APM search backend.
//!
//! Every few minutes apmwatch searches the backend for the latest transaction
//! latency histograms, averages them per transaction, and sends a single SMS
//! alert when any average crosses the threshold, at most once per cooldown.
//!
//! ## Architecture
//!
//! - **APM**: time-windowed query construction and the search client
//! - **Aggregator**: unit conversion and per-transaction means
//! - **Alerting**: threshold decision, cooldown gate and SMS delivery
//! - **Scheduler**: the forever loop and its business-hours window
//!
//! ## Quick Start
//!
//! ```bash
//! SMS_KEY=... SENDER_NUMBER=... RECEIVER_NUMBER=... \
//! QUERY_URL=http://elasticsearch:9200 INDEX_PATTERN='apm-*-transaction-*' \
//! apmwatch
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregator;
pub mod alerting;
pub mod apm;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::aggregator::Aggregator;
    pub use crate::alerting::{AlertGate, DeliveryError, Notifier, SmsNotifier};
    pub use crate::apm::{MetricsClient, QueryBuilder};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::scheduler::{CycleReport, Monitor, MonitoringWindow};
}
