//! Fetcher stage: pulls datasets from a provider and persists them.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{Instrument, info, info_span, warn};

use crate::model::{Crs, DatasetKey, Feature, FeatureCollection, Properties, WGS84};
use crate::ports::{AreaFilter, DatasetPort, DatasetResponse, PortError};
use crate::registry::{DatasetRegistry, DatasetSource, FetchScope};
use crate::store::{ArtifactError, DataLayout, write_json};

#[derive(Debug, Clone, PartialEq)]
/// Records of one dataset, flattened into attribute rows.
pub struct RecordTable {
    /// Dataset the rows belong to.
    pub key: DatasetKey,
    /// Raw response body.
    pub raw: Value,
    /// One feature per record; geometry is `None` for tabular records.
    pub rows: Vec<Feature>,
}

impl RecordTable {
    /// Whether any record carries a geometry.
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        self.rows.iter().any(|row| row.geometry.is_some())
    }

    /// Rows as a feature collection in WGS84.
    #[must_use]
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection::new(self.rows.clone(), Some(Crs::named(WGS84)))
    }

    fn from_response(key: &DatasetKey, response: DatasetResponse) -> Self {
        let rows = response
            .records
            .into_iter()
            .map(|record| {
                let mut properties = record.fields;
                properties.insert(
                    "_record_id".to_owned(),
                    record.recordid.map_or(Value::Null, Value::String),
                );
                properties.insert("_dataset".to_owned(), json!(key.as_str()));
                Feature::new(record.geometry, properties)
            })
            .collect();

        Self {
            key: key.clone(),
            raw: response.raw,
            rows,
        }
    }

    fn has_fields(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.geometry.is_some() || row.properties.len() > 2)
    }
}

#[derive(Debug)]
/// Result of fetching one dataset.
pub enum FetchOutcome {
    /// Records were retrieved.
    Records(RecordTable),
    /// The provider had nothing for the query, even unfiltered.
    Empty,
    /// The query failed.
    Failed(PortError),
}

impl FetchOutcome {
    /// Records, if any were retrieved.
    #[must_use]
    pub fn records(&self) -> Option<&RecordTable> {
        match self {
            FetchOutcome::Records(table) => Some(table),
            FetchOutcome::Empty | FetchOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug, Default)]
/// Per-dataset outcomes of one fetch run, in fetch order.
pub struct FetchReport {
    /// Outcome for each attempted dataset.
    pub outcomes: Vec<(DatasetKey, FetchOutcome)>,
}

impl FetchReport {
    /// Number of datasets that produced records.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.records().is_some())
            .count()
    }

    /// Number of attempted datasets.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Share of datasets fetched successfully, in percent.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let successes = u32::try_from(self.successes()).unwrap_or(u32::MAX);
        let attempted = u32::try_from(self.attempted()).unwrap_or(u32::MAX);
        f64::from(successes) / f64::from(attempted) * 100.0
    }
}

/// Fetches datasets through a provider port and writes them under a [`DataLayout`].
pub struct Fetcher {
    port: Arc<dyn DatasetPort>,
    registry: Arc<DatasetRegistry>,
    layout: DataLayout,
    rows: u32,
}

impl Fetcher {
    /// Create a fetcher bound to the provided port, registry and layout.
    #[must_use]
    pub fn new(
        port: Arc<dyn DatasetPort>,
        registry: Arc<DatasetRegistry>,
        layout: DataLayout,
        rows: u32,
    ) -> Self {
        Self {
            port,
            registry,
            layout,
            rows,
        }
    }

    /// Fetch one dataset; an empty filtered result is retried once without the filter.
    ///
    /// Failures are logged and returned as [`FetchOutcome::Failed`], never raised.
    pub async fn fetch_dataset(
        &self,
        key: &DatasetKey,
        filter: Option<&AreaFilter>,
    ) -> FetchOutcome {
        let source = match self.registry.source(key) {
            Ok(source) => source,
            Err(err) => {
                warn!(dataset = %key, "unknown dataset key");
                return FetchOutcome::Failed(err);
            }
        };

        let filter = filter.filter(|area| !area.is_empty());
        let mut response = match self.query(source, filter).await {
            Ok(response) => response,
            Err(err) => return FetchOutcome::Failed(err),
        };

        if response.records.is_empty() {
            info!(dataset = %key, "no records found");
            if filter.is_none() {
                return FetchOutcome::Empty;
            }

            info!(dataset = %key, "retrying without area filter");
            response = match self.query(source, None).await {
                Ok(response) => response,
                Err(err) => return FetchOutcome::Failed(err),
            };
            if response.records.is_empty() {
                info!(dataset = %key, "no records found without filter either");
                return FetchOutcome::Empty;
            }
        }

        let table = RecordTable::from_response(key, response);
        if !table.has_fields() {
            warn!(dataset = %key, "records carry no data columns");
            return FetchOutcome::Empty;
        }

        info!(dataset = %key, records = table.rows.len(), "fetched records");
        FetchOutcome::Records(table)
    }

    /// Fetch every registered dataset for `area` and persist what was retrieved.
    ///
    /// Priority datasets go first; city-scoped datasets are fetched unfiltered.
    pub async fn fetch_area(&self, area: &AreaFilter) -> FetchReport {
        info!(area = %area.code, datasets = self.registry.len(), "fetching area data");
        let mut report = FetchReport::default();

        for source in self.registry.fetch_order() {
            let filter = match source.scope {
                FetchScope::Area => Some(area),
                FetchScope::City => None,
            };
            let span = info_span!("dataset", key = %source.key);
            let outcome = self
                .fetch_dataset(&source.key, filter)
                .instrument(span.clone())
                .await;

            if let FetchOutcome::Records(table) = &outcome
                && let Err(err) = span.in_scope(|| self.persist(table))
            {
                warn!(dataset = %source.key, error = %err, "failed to persist dataset");
            }

            report.outcomes.push((source.key.clone(), outcome));
        }

        info!(
            fetched = report.successes(),
            attempted = report.attempted(),
            success_rate = %format!("{:.1}%", report.success_rate()),
            "data fetching summary"
        );
        report
    }

    /// Write the raw response and the processed rows of `table`.
    ///
    /// Geographic datasets become a GeoJSON feature collection; others a plain JSON table.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if a file cannot be written.
    pub fn persist(&self, table: &RecordTable) -> Result<(), ArtifactError> {
        write_json(&self.layout.raw_file(&table.key), &table.raw)?;

        if table.is_geographic() {
            let collection = table.to_feature_collection();
            write_json(&self.layout.feature_file(&table.key), &collection)?;
            info!(features = collection.len(), "saved geometric features");
        } else {
            let rows: Vec<&Properties> = table.rows.iter().map(|row| &row.properties).collect();
            write_json(&self.layout.table_file(&table.key), &rows)?;
            info!(rows = rows.len(), "saved tabular records");
        }
        Ok(())
    }

    async fn query(
        &self,
        source: &DatasetSource,
        filter: Option<&AreaFilter>,
    ) -> Result<DatasetResponse, PortError> {
        match self.port.query(source, filter, self.rows).await {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(dataset = %source.key, error = %err, "fetch failed");
                Err(err)
            }
        }
    }
}
