//! Latency sample and per-transaction aggregate models

use serde::Serialize;

/// A single raw latency observation, still in the backend's source unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Transaction the observation belongs to
    pub transaction: String,

    /// Raw value in the source unit (microseconds for APM histograms)
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(transaction: impl Into<String>, value: f64) -> Self {
        Self {
            transaction: transaction.into(),
            value,
        }
    }
}

/// All samples seen for one transaction during the current window
///
/// Only ever built from at least one sample, so the mean is always defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAggregate {
    /// Transaction name
    pub name: String,

    /// Converted samples in milliseconds
    pub samples_ms: Vec<f64>,
}

impl TransactionAggregate {
    /// Start an aggregate from its first converted sample
    pub fn new(name: impl Into<String>, first_ms: f64) -> Self {
        Self {
            name: name.into(),
            samples_ms: vec![first_ms],
        }
    }

    /// Add a converted sample
    pub fn push(&mut self, value_ms: f64) {
        self.samples_ms.push(value_ms);
    }

    /// Arithmetic mean latency in milliseconds
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_ms(&self) -> f64 {
        self.samples_ms.iter().sum::<f64>() / self.samples_ms.len() as f64
    }
}
