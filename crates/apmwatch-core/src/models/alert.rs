//! Alert data models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::TransactionAggregate;

/// A transaction whose mean latency breached the threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offender {
    /// Transaction name
    pub name: String,

    /// Mean latency in milliseconds
    pub mean_ms: f64,
}

/// Whether this cycle should alert, and which transactions caused it
///
/// Derived fresh from the aggregates on every cycle; never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDecision {
    /// Threshold the aggregates were compared against
    pub threshold_ms: f64,

    /// Transactions strictly above the threshold, sorted by name
    pub offenders: Vec<Offender>,
}

impl AlertDecision {
    /// Compare every aggregate mean against `threshold_ms` (strictly greater)
    pub fn evaluate(aggregates: &HashMap<String, TransactionAggregate>, threshold_ms: f64) -> Self {
        let mut offenders: Vec<Offender> = aggregates
            .values()
            .filter_map(|agg| {
                let mean_ms = agg.mean_ms();
                (mean_ms > threshold_ms).then(|| Offender {
                    name: agg.name.clone(),
                    mean_ms,
                })
            })
            .collect();
        offenders.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            threshold_ms,
            offenders,
        }
    }

    /// A decision that never fires
    pub fn quiet(threshold_ms: f64) -> Self {
        Self {
            threshold_ms,
            offenders: Vec::new(),
        }
    }

    /// True if at least one transaction breached the threshold
    pub fn should_alert(&self) -> bool {
        !self.offenders.is_empty()
    }
}

/// Observable state of the alert gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// Nothing sent yet, or the cooldown has elapsed
    Idle,
    /// A delivery succeeded and the cooldown is still running
    CoolingDown {
        /// When the gate becomes idle again
        until: DateTime<Utc>,
    },
}

/// What the gate did with a decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Nothing breached the threshold
    NotTriggered,
    /// Breach detected but the cooldown has not elapsed
    Suppressed {
        /// Last successful delivery
        last_sent_at: DateTime<Utc>,
        /// Cooldown end
        until: DateTime<Utc>,
    },
    /// Alert delivered; cooldown restarted
    Sent {
        /// Delivery time recorded as the new cooldown start
        at: DateTime<Utc>,
    },
    /// Delivery attempted and failed; cooldown untouched
    DeliveryFailed {
        /// Failure description
        error: String,
    },
}

impl GateOutcome {
    /// Whether a delivery was attempted
    pub fn attempted_delivery(&self) -> bool {
        matches!(self, Self::Sent { .. } | Self::DeliveryFailed { .. })
    }
}
