//! Alerting for apmwatch
//!
//! Threshold breaches pass through a cooldown gate before an alert code is
//! delivered over SMS.

mod gate;
mod notifier;

pub use gate::AlertGate;
pub use notifier::{DeliveryError, Notifier, SmsNotifier, API_KEY_HEADER};
