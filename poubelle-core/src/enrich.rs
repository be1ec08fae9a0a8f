//! Enricher stage: attaches flow estimates to the fetched datasets.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::estimate::{EstimateConfig, FlowEstimate, estimate_waste_flows};
use crate::model::{DatasetKey, FeatureCollection, FlowEdge, FlowNetwork};
use crate::network::{NetworkConfig, build_flow_network};
use crate::store::{
    ArtifactError, DataLayout, EDGES_FILE, ESTIMATES_FILE, NODES_FILE, load_feature_files,
    write_json,
};

/// Processed datasets keyed by dataset key.
pub type Datasets = BTreeMap<DatasetKey, FeatureCollection>;

#[derive(Debug, Clone, PartialEq)]
/// What one enrichment run produced.
pub struct Enrichment {
    /// Estimates the network was built from.
    pub estimate: FlowEstimate,
    /// Nodes and edges.
    pub network: FlowNetwork,
}

/// Builds the flow network and estimate artifacts from processed datasets.
pub struct Enricher<'cfg> {
    estimates: &'cfg EstimateConfig,
    network: &'cfg NetworkConfig,
    layout: DataLayout,
}

impl<'cfg> Enricher<'cfg> {
    /// Create an enricher reading and writing under `layout`.
    #[must_use]
    pub fn new(
        estimates: &'cfg EstimateConfig,
        network: &'cfg NetworkConfig,
        layout: DataLayout,
    ) -> Self {
        Self {
            estimates,
            network,
            layout,
        }
    }

    /// Load every processed GeoJSON dataset; unreadable files are skipped.
    #[must_use]
    pub fn load_processed(&self) -> Datasets {
        let datasets: Datasets = load_feature_files(&self.layout.processed_dir())
            .into_iter()
            .collect();
        for (key, collection) in &datasets {
            info!(dataset = %key, records = collection.len(), "loaded processed dataset");
        }
        datasets
    }

    /// Compute estimates and the flow network for `area` without touching the disk.
    #[must_use]
    pub fn enrich(&self, datasets: &Datasets, area: &str) -> Enrichment {
        let estimate = estimate_waste_flows(self.estimates, area);
        let network = build_flow_network(
            datasets.get(&self.network.collection_dataset),
            &estimate,
            self.network,
        );
        Enrichment { estimate, network }
    }

    /// Load, enrich and persist. Returns `None` when there is no processed data.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if an artifact cannot be written.
    pub fn run(&self, area: &str) -> Result<Option<Enrichment>, ArtifactError> {
        let datasets = self.load_processed();
        if datasets.is_empty() {
            warn!("no processed data found for enrichment, run the fetch step first");
            return Ok(None);
        }

        let enrichment = self.enrich(&datasets, area);
        self.persist(&enrichment)?;
        info!(
            nodes = enrichment.network.nodes.len(),
            edges = enrichment.network.edges.len(),
            "created flow network"
        );
        Ok(Some(enrichment))
    }

    /// Write nodes, edges and estimates to the enriched directory.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if encoding or writing fails.
    pub fn persist(&self, enrichment: &Enrichment) -> Result<(), ArtifactError> {
        let nodes_path = self.layout.enriched_file(NODES_FILE);
        let features = enrichment
            .network
            .nodes
            .iter()
            .map(|node| node.to_feature())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ArtifactError::Json {
                path: nodes_path.clone(),
                source,
            })?;
        write_json(&nodes_path, &FeatureCollection::new(features, None))?;

        let edges: &[FlowEdge] = &enrichment.network.edges;
        write_json(&self.layout.enriched_file(EDGES_FILE), edges)?;
        write_json(
            &self.layout.enriched_file(ESTIMATES_FILE),
            &enrichment.estimate,
        )?;

        info!(dir = %self.layout.enriched_dir().display(), "saved enrichment artifacts");
        Ok(())
    }
}
