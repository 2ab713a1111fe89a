//! Reduces raw samples into per-transaction mean latency

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{Sample, TransactionAggregate};

/// Groups samples by transaction after converting them to milliseconds
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    /// Raw value divided by this yields milliseconds
    unit_divisor: f64,
}

impl Aggregator {
    /// Aggregator for microsecond samples
    pub const MICROSECONDS: Self = Self {
        unit_divisor: 1000.0,
    };

    /// Create an aggregator with an explicit source-unit divisor
    pub fn new(unit_divisor: f64) -> Result<Self> {
        if !(unit_divisor.is_finite() && unit_divisor > 0.0) {
            return Err(Error::config(format!(
                "sample unit divisor must be a positive number, got {unit_divisor}"
            )));
        }
        Ok(Self { unit_divisor })
    }

    /// Convert a raw value to milliseconds
    pub fn to_millis(&self, raw: f64) -> f64 {
        raw / self.unit_divisor
    }

    /// Group samples by transaction name
    ///
    /// A transaction appears in the result only if it had at least one sample.
    pub fn aggregate<I>(&self, samples: I) -> HashMap<String, TransactionAggregate>
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut groups: HashMap<String, TransactionAggregate> = HashMap::new();

        for sample in samples {
            let value_ms = self.to_millis(sample.value);
            match groups.get_mut(&sample.transaction) {
                Some(agg) => agg.push(value_ms),
                None => {
                    let agg = TransactionAggregate::new(sample.transaction.clone(), value_ms);
                    groups.insert(sample.transaction, agg);
                }
            }
        }

        groups
    }
}
