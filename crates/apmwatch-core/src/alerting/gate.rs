//! Alert gate: one alert per cycle, at most one delivery per cooldown

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::models::{AlertDecision, GateOutcome, GateState};

use super::notifier::Notifier;

/// Owns the last-sent timestamp and serialises every delivery attempt
///
/// The cooldown check, the delivery and the timestamp update all happen under
/// one lock, so two callers can never both pass the check and both send.
pub struct AlertGate {
    notifier: Arc<dyn Notifier>,
    alert_code: String,
    cooldown: Duration,
    /// `None` until the first successful delivery
    last_sent_at: Mutex<Option<DateTime<Utc>>>,
}

impl AlertGate {
    /// Create a gate in the idle state
    pub fn new(
        notifier: Arc<dyn Notifier>,
        alert_code: impl Into<String>,
        cooldown: std::time::Duration,
    ) -> Result<Self> {
        let cooldown = Duration::from_std(cooldown)
            .map_err(|e| Error::config(format!("ALERT_COOLDOWN out of range: {e}")))?;

        Ok(Self {
            notifier,
            alert_code: alert_code.into(),
            cooldown,
            last_sent_at: Mutex::new(None),
        })
    }

    /// Configured cooldown
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Last successful delivery, if any
    pub async fn last_sent_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sent_at.lock().await
    }

    /// Gate state as seen at `now`
    pub async fn state(&self, now: DateTime<Utc>) -> GateState {
        match *self.last_sent_at.lock().await {
            Some(last) if now < last + self.cooldown => GateState::CoolingDown {
                until: last + self.cooldown,
            },
            _ => GateState::Idle,
        }
    }

    /// Apply `decision` at `now`, delivering at most one alert
    ///
    /// The timestamp only advances when the notifier reports success, so a
    /// failed delivery is retried on the next breaching cycle. The recorded
    /// timestamp is `now` as passed in, not the time the send completed.
    pub async fn evaluate(&self, decision: &AlertDecision, now: DateTime<Utc>) -> GateOutcome {
        if !decision.should_alert() {
            return GateOutcome::NotTriggered;
        }

        for offender in &decision.offenders {
            warn!(
                transaction = %offender.name,
                mean_ms = offender.mean_ms,
                threshold_ms = decision.threshold_ms,
                "Average latency above threshold"
            );
        }

        let mut last_sent_at = self.last_sent_at.lock().await;

        if let Some(last) = *last_sent_at {
            let until = last + self.cooldown;
            if now < until {
                info!(
                    last_sent_at = %last,
                    until = %until,
                    "Alert not sent, cooldown still active"
                );
                return GateOutcome::Suppressed {
                    last_sent_at: last,
                    until,
                };
            }
        }

        match self.notifier.send(&self.alert_code).await {
            Ok(()) => {
                *last_sent_at = Some(now);
                info!(
                    code = %self.alert_code,
                    offenders = decision.offenders.len(),
                    "Alert delivered"
                );
                GateOutcome::Sent { at: now }
            }
            Err(e) => {
                error!(code = %self.alert_code, error = %e, "Alert delivery failed");
                GateOutcome::DeliveryFailed {
                    error: e.to_string(),
                }
            }
        }
    }
}
