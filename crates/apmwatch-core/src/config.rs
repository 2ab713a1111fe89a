//! Configuration management for apmwatch
//!
//! Settings come from the process environment (optionally seeded from a
//! `.env` file). They are read into a flat [`RawSettings`] and then
//! validated into the nested [`Config`] the rest of the crate consumes.

use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::scheduler::MonitoringWindow;

/// Default messaging endpoint
pub const DEFAULT_SMS_API_URL: &str = "https://api.limosms.com/api/sendpatternmessage";

/// Upper bound accepted for the search result-size cap
pub const MAX_QUERY_SIZE: usize = 20_000;

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    /// Metrics backend configuration
    pub apm: ApmConfig,

    /// Alert threshold and cooldown
    pub alerting: AlertingConfig,

    /// Messaging endpoint configuration
    pub notifier: NotifierConfig,

    /// Polling cadence and business-hours gate
    pub schedule: ScheduleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Metrics backend configuration
#[derive(Debug, Clone)]
pub struct ApmConfig {
    /// Base URL of the search backend
    pub base_url: String,
    /// Index pattern searched on every cycle
    pub index_pattern: String,
    /// Value of the `service.name` term filter
    pub service_name: String,
    /// How far back each query looks
    pub lookback: Duration,
    /// Maximum number of hits requested
    pub query_size: usize,
    /// Raw sample value divided by this yields milliseconds
    pub sample_unit_divisor: f64,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ApmConfig {
    /// Full `_search` endpoint for the configured index pattern
    pub fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.base_url.trim_end_matches('/'),
            self.index_pattern.trim_matches('/')
        )
    }
}

/// Alerting configuration
#[derive(Debug, Clone)]
pub struct AlertingConfig {
    /// Mean latency, in milliseconds, that must be strictly exceeded
    pub threshold_ms: f64,
    /// Minimum time between two successful deliveries
    pub cooldown: Duration,
    /// Opaque code sent with every alert
    pub alert_code: String,
}

/// Messaging endpoint configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Messaging API URL
    pub api_url: String,
    /// API key sent in the `ApiKey` header
    pub api_key: String,
    /// Sender identity
    pub sender: String,
    /// Receiver identity
    pub receiver: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Sleep between the end of one cycle and the start of the next
    pub poll_interval: Duration,
    /// Extra sleep when a tick falls outside the monitoring window
    pub off_hours_delay: Duration,
    /// Business-hours gate, `None` to monitor around the clock
    pub window: Option<MonitoringWindow>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::config(format!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{other}'"
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Settings exactly as they appear in the environment
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettings {
    sms_key: Option<String>,
    sender_number: Option<String>,
    receiver_number: Option<String>,
    query_url: Option<String>,
    index_pattern: Option<String>,

    #[serde(default = "default_sms_api_url")]
    sms_api_url: String,
    #[serde(default = "default_alert_code")]
    alert_code: String,
    #[serde(default = "default_service_name")]
    service_name: String,
    #[serde(default = "default_threshold_ms")]
    latency_threshold_ms: f64,
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    alert_cooldown: Duration,
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    poll_interval: Duration,
    #[serde(default = "default_lookback", with = "humantime_serde")]
    lookback_window: Duration,
    #[serde(default = "default_query_size")]
    query_size: usize,
    #[serde(default = "default_sample_unit_divisor")]
    sample_unit_divisor: f64,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    request_timeout: Duration,
    #[serde(default = "default_true")]
    monitoring_window_enabled: bool,
    #[serde(default = "default_start_hour")]
    monitoring_start_hour: u32,
    #[serde(default = "default_end_hour")]
    monitoring_end_hour: u32,
    #[serde(default = "default_timezone")]
    monitoring_timezone: String,
    #[serde(default = "default_off_hours_delay", with = "humantime_serde")]
    off_hours_delay: Duration,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_log_format")]
    log_format: String,
}

fn default_sms_api_url() -> String {
    DEFAULT_SMS_API_URL.to_string()
}

fn default_alert_code() -> String {
    "673".to_string()
}

fn default_service_name() -> String {
    "production-search-afra".to_string()
}

fn default_threshold_ms() -> f64 {
    2000.0
}

fn default_cooldown() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_lookback() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_query_size() -> usize {
    10_000
}

fn default_sample_unit_divisor() -> f64 {
    1000.0
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_start_hour() -> u32 {
    7
}

fn default_end_hour() -> u32 {
    24
}

fn default_timezone() -> String {
    "Asia/Tehran".to_string()
}

fn default_off_hours_delay() -> Duration {
    Duration::from_secs(25 * 60)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let source = ::config::Config::builder()
            .add_source(::config::Environment::default())
            .build()?;

        Self::from_source(&source)
    }

    /// Build and validate configuration from an already assembled source
    pub fn from_source(source: &::config::Config) -> Result<Self> {
        let raw: RawSettings = source.clone().try_deserialize()?;
        Self::from_raw(raw)
    }

    /// Validate raw settings
    pub fn from_raw(raw: RawSettings) -> Result<Self> {
        let api_key = required("SMS_KEY", raw.sms_key)?;
        let sender = required("SENDER_NUMBER", raw.sender_number)?;
        let receiver = required("RECEIVER_NUMBER", raw.receiver_number)?;
        let base_url = required("QUERY_URL", raw.query_url)?;
        let index_pattern = required("INDEX_PATTERN", raw.index_pattern)?;

        parse_url("QUERY_URL", &base_url)?;
        parse_url("SMS_API_URL", &raw.sms_api_url)?;

        if !(raw.latency_threshold_ms.is_finite() && raw.latency_threshold_ms > 0.0) {
            return Err(Error::config("LATENCY_THRESHOLD_MS must be a positive number"));
        }
        if !(raw.sample_unit_divisor.is_finite() && raw.sample_unit_divisor > 0.0) {
            return Err(Error::config("SAMPLE_UNIT_DIVISOR must be a positive number"));
        }
        if raw.query_size == 0 || raw.query_size > MAX_QUERY_SIZE {
            return Err(Error::config(format!(
                "QUERY_SIZE must be between 1 and {MAX_QUERY_SIZE}"
            )));
        }
        non_zero("ALERT_COOLDOWN", raw.alert_cooldown)?;
        non_zero("POLL_INTERVAL", raw.poll_interval)?;
        non_zero("LOOKBACK_WINDOW", raw.lookback_window)?;
        non_zero("REQUEST_TIMEOUT", raw.request_timeout)?;

        if raw.alert_code.trim().is_empty() {
            return Err(Error::config("ALERT_CODE must not be empty"));
        }

        let timezone = Tz::from_str(&raw.monitoring_timezone).map_err(|e| {
            Error::config(format!(
                "MONITORING_TIMEZONE '{}' is not a known timezone: {e}",
                raw.monitoring_timezone
            ))
        })?;
        // Validated even when disabled so a typo doesn't surface only on re-enable.
        let window = MonitoringWindow::new(
            raw.monitoring_start_hour,
            raw.monitoring_end_hour,
            timezone,
        )?;

        Ok(Self {
            apm: ApmConfig {
                base_url,
                index_pattern,
                service_name: raw.service_name,
                lookback: raw.lookback_window,
                query_size: raw.query_size,
                sample_unit_divisor: raw.sample_unit_divisor,
                request_timeout: raw.request_timeout,
            },
            alerting: AlertingConfig {
                threshold_ms: raw.latency_threshold_ms,
                cooldown: raw.alert_cooldown,
                alert_code: raw.alert_code,
            },
            notifier: NotifierConfig {
                api_url: raw.sms_api_url,
                api_key,
                sender,
                receiver,
                request_timeout: raw.request_timeout,
            },
            schedule: ScheduleConfig {
                poll_interval: raw.poll_interval,
                off_hours_delay: raw.off_hours_delay,
                window: raw.monitoring_window_enabled.then_some(window),
            },
            logging: LoggingConfig {
                level: raw.log_level,
                format: raw.log_format.parse()?,
            },
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::config(format!("{name} is not set"))),
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url> {
    Url::parse(value)
        .map_err(|e| Error::config(format!("{name} '{value}' is not a valid URL: {e}")))
}

fn non_zero(name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(Error::config(format!("{name} must be greater than zero")));
    }
    Ok(())
}
