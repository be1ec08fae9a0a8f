//! Traits describing dataset providers and shared helper types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde::Deserialize;
use serde_json::{Error as JsonError, Value};

use crate::model::{DatasetKey, Geometry, Properties};
use crate::registry::DatasetSource;

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to a dataset provider.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// Provider answered with a non-success status.
    #[error("Provider returned HTTP {0}")]
    Status(u16),
    /// Response body was not the expected JSON.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// The key is not in the dataset registry.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(DatasetKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Geographic restriction applied to a dataset query.
pub struct AreaFilter {
    /// Administrative area code, e.g. `14` for the 14th arrondissement.
    pub code: String,
}

impl AreaFilter {
    /// Filter on the given area code.
    #[must_use]
    pub fn new<S: Into<String>>(code: S) -> Self {
        Self { code: code.into() }
    }

    /// Check if the filter has no usable code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
/// One record of a records-API response.
pub struct RawRecord {
    /// Provider-side record id.
    #[serde(default)]
    pub recordid: Option<String>,
    /// Attribute table.
    #[serde(default)]
    pub fields: Properties,
    /// Geometry, when the dataset is geographic.
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone)]
/// Decoded response plus the raw JSON it came from.
pub struct DatasetResponse {
    /// Response body as received, persisted verbatim.
    pub raw: Value,
    /// Records decoded from the body.
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RecordsEnvelope {
    #[serde(default)]
    records: Vec<RawRecord>,
}

impl DatasetResponse {
    /// Decode a records-API body, keeping the raw value alongside.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Decode`] when `records` holds something other than records.
    pub fn from_value(raw: Value) -> Result<Self, PortError> {
        let envelope = RecordsEnvelope::deserialize(&raw)?;
        Ok(Self {
            raw,
            records: envelope.records,
        })
    }

    /// Response with no records.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            raw: Value::Object(Properties::new()),
            records: Vec::new(),
        }
    }
}

#[async_trait]
/// Trait for provider-specific dataset query backends.
pub trait DatasetPort: Send + Sync {
    /// Query up to `rows` records of `source`, narrowed by `filter` when given.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the body cannot be decoded.
    async fn query(
        &self,
        source: &DatasetSource,
        filter: Option<&AreaFilter>,
        rows: u32,
    ) -> Result<DatasetResponse, PortError>;
}
