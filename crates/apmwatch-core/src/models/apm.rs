//! Wire types for the APM search response

use serde::{Deserialize, Deserializer};

use super::Sample;

/// Top-level `_search` response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Outer hits envelope
    pub hits: HitsEnvelope,
}

/// `hits` object of a search response
#[derive(Debug, Clone, Deserialize)]
pub struct HitsEnvelope {
    /// Matching documents
    pub hits: Vec<Hit>,
}

/// One matching document
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    /// Filtered document source
    #[serde(rename = "_source", default, deserialize_with = "null_as_default")]
    pub source: HitSource,
}

/// Document source restricted to the requested fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitSource {
    /// Transaction fields, absent for non-transaction documents
    #[serde(default)]
    pub transaction: Option<TransactionDoc>,
}

/// `transaction` object of a document
///
/// The histogram arrives either under a literal `"duration.histogram"` key or
/// as nested `duration.histogram` objects, depending on how the backend
/// applies the source filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionDoc {
    /// Transaction name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Dotted-key histogram
    #[serde(rename = "duration.histogram", default)]
    pub duration_histogram: Option<Histogram>,

    /// Nested-object histogram
    #[serde(default)]
    pub duration: Option<DurationDoc>,
}

/// Nested `duration` object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DurationDoc {
    /// Latency histogram
    #[serde(default)]
    pub histogram: Option<Histogram>,
}

/// Latency histogram values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Histogram {
    /// Raw observations
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<f64>,
}

/// Absent and `null` fields both decode to the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TransactionDoc {
    /// Histogram values, whichever shape they were delivered in
    pub fn values(&self) -> &[f64] {
        self.duration_histogram
            .as_ref()
            .or_else(|| self.duration.as_ref().and_then(|d| d.histogram.as_ref()))
            .map_or(&[], |h| h.values.as_slice())
    }
}

impl SearchResponse {
    /// Flatten hits into one sample per histogram value
    pub fn into_samples(self) -> Vec<Sample> {
        self.hits
            .hits
            .into_iter()
            .filter_map(|hit| hit.source.transaction)
            .flat_map(|tx| {
                let name = tx.name.clone();
                tx.values()
                    .iter()
                    .map(move |v| Sample::new(name.clone(), *v))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
