//! Monitoring loop
//!
//! Each tick runs query, aggregation and the alert gate once, then sleeps for
//! the poll interval whatever the outcome. Cycles never overlap.

mod window;

pub use window::{is_within_monitoring_window, MonitoringWindow};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::aggregator::Aggregator;
use crate::alerting::{AlertGate, SmsNotifier};
use crate::apm::{MetricsClient, QueryBuilder};
use crate::config::{Config, ScheduleConfig};
use crate::error::Result;
use crate::models::{AlertDecision, GateOutcome, TransactionAggregate};

/// What one cycle observed and decided
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Reference instant of the cycle
    pub started_at: DateTime<Utc>,
    /// Raw samples returned by the backend
    pub sample_count: usize,
    /// Per-transaction aggregates
    pub aggregates: HashMap<String, TransactionAggregate>,
    /// Threshold decision
    pub decision: AlertDecision,
    /// What the gate did with it
    pub outcome: GateOutcome,
}

/// Drives the repeating query → aggregate → gate cycle
pub struct Monitor {
    query: QueryBuilder,
    client: MetricsClient,
    aggregator: Aggregator,
    gate: Arc<AlertGate>,
    threshold_ms: f64,
    schedule: ScheduleConfig,
}

impl Monitor {
    /// Wire up the monitor from validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        let notifier = Arc::new(SmsNotifier::new(&config.notifier)?);
        let gate = AlertGate::new(
            notifier,
            config.alerting.alert_code.clone(),
            config.alerting.cooldown,
        )?;

        Ok(Self {
            query: QueryBuilder::from_config(&config.apm)?,
            client: MetricsClient::new(&config.apm)?,
            aggregator: Aggregator::new(config.apm.sample_unit_divisor)?,
            gate: Arc::new(gate),
            threshold_ms: config.alerting.threshold_ms,
            schedule: config.schedule.clone(),
        })
    }

    /// Shared alert gate, for callers that trigger evaluations out of band
    pub fn gate(&self) -> Arc<AlertGate> {
        Arc::clone(&self.gate)
    }

    fn timezone(&self) -> Tz {
        self.schedule
            .window
            .as_ref()
            .map_or(chrono_tz::UTC, MonitoringWindow::timezone)
    }

    /// Run a single cycle at `now`
    ///
    /// Backend failures are returned before any aggregation happens. `now` is
    /// also the instant the gate records on a successful delivery, so the
    /// cooldown is measured between cycle starts rather than send completions.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let local_now = now.with_timezone(&self.timezone());
        let query = self.query.build(&local_now);

        let samples = self.client.fetch_samples(&query).await?;
        let sample_count = samples.len();

        let aggregates = self.aggregator.aggregate(samples);
        let decision = AlertDecision::evaluate(&aggregates, self.threshold_ms);
        let outcome = self.gate.evaluate(&decision, now).await;

        Ok(CycleReport {
            started_at: now,
            sample_count,
            aggregates,
            decision,
            outcome,
        })
    }

    /// One scheduler step at `now`; returns how long to sleep afterwards
    pub async fn tick(&self, now: DateTime<Utc>) -> Duration {
        if let Some(window) = &self.schedule.window {
            if !window.contains(now) {
                info!(
                    local_time = %window.local_time(now),
                    "Outside monitoring hours, skipping cycle"
                );
                return self.schedule.off_hours_delay + self.schedule.poll_interval;
            }
        }

        info!(started_at = %now.with_timezone(&self.timezone()), "Monitoring APM started");

        match self.run_cycle(now).await {
            Ok(report) => {
                info!(
                    samples = report.sample_count,
                    transactions = report.aggregates.len(),
                    alert = report.decision.should_alert(),
                    delivery_attempted = report.outcome.attempted_delivery(),
                    outcome = ?report.outcome,
                    "Monitoring APM finished"
                );
            }
            Err(e) => {
                info!(failed = true, "Monitoring APM finished");
                error!(error = %e, "Error monitoring APM");
            }
        }

        self.schedule.poll_interval
    }

    /// Run forever
    pub async fn run(&self) {
        info!(
            interval = %humantime::format_duration(self.schedule.poll_interval),
            threshold_ms = self.threshold_ms,
            cooldown = %self.gate.cooldown(),
            window = ?self.schedule.window,
            search_url = %self.client.search_url(),
            "Starting APM monitor"
        );

        loop {
            let delay = self.tick(Utc::now()).await;
            tokio::time::sleep(delay).await;
        }
    }
}
