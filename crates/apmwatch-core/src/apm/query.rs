//! Search query construction

use std::fmt::Display;

use chrono::{DateTime, Duration, SecondsFormat, TimeZone};
use serde_json::{json, Value};

use crate::config::ApmConfig;
use crate::error::{Error, Result};

/// Source field holding the transaction name
pub const TRANSACTION_NAME_FIELD: &str = "transaction.name";

/// Source field holding the latency histogram values
pub const DURATION_VALUES_FIELD: &str = "transaction.duration.histogram.values";

/// Builds the latency search for a single service over a fixed lookback
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    service_name: String,
    lookback: Duration,
    size: usize,
}

impl QueryBuilder {
    /// Create a builder
    pub fn new(service_name: impl Into<String>, lookback: Duration, size: usize) -> Self {
        Self {
            service_name: service_name.into(),
            lookback,
            size,
        }
    }

    /// Create a builder from backend configuration
    pub fn from_config(config: &ApmConfig) -> Result<Self> {
        let lookback = Duration::from_std(config.lookback)
            .map_err(|e| Error::config(format!("LOOKBACK_WINDOW out of range: {e}")))?;

        Ok(Self::new(config.service_name.clone(), lookback, config.query_size))
    }

    /// Query selecting `[now - lookback, now]`
    ///
    /// Bounds are written as offset-qualified RFC 3339 timestamps, so the
    /// backend reads the same instant whatever zone `now` is expressed in.
    pub fn build<Tz>(&self, now: &DateTime<Tz>) -> Value
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let start = now.clone() - self.lookback;

        json!({
            "query": {
                "bool": {
                    "filter": [
                        {
                            "range": {
                                "@timestamp": {
                                    "gte": start.to_rfc3339_opts(SecondsFormat::Secs, true),
                                    "lte": now.to_rfc3339_opts(SecondsFormat::Secs, true),
                                }
                            }
                        },
                        {
                            "term": {
                                "service.name": self.service_name,
                            }
                        }
                    ]
                }
            },
            "_source": [TRANSACTION_NAME_FIELD, DURATION_VALUES_FIELD],
            "size": self.size,
        })
    }
}
