//! Loading of the artifacts the map is drawn from.

use std::path::Path;

use poubelle_core::enrich::Datasets;
use poubelle_core::estimate::FlowEstimate;
use poubelle_core::model::{FeatureCollection, FlowEdge, FlowNode, NodeKind};
use poubelle_core::store::{
    DataLayout, EDGES_FILE, ESTIMATES_FILE, NODES_FILE, load_feature_files, read_optional_json,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
/// Everything available for drawing; each part may be missing.
pub struct MapData {
    /// Flow network nodes.
    pub nodes: Option<Vec<FlowNode>>,
    /// Flow network edges.
    pub edges: Option<Vec<FlowEdge>>,
    /// Flow estimates.
    pub estimate: Option<FlowEstimate>,
    /// Processed datasets by key.
    pub datasets: Datasets,
}

impl MapData {
    /// Load enrichment artifacts and processed datasets under `layout`.
    ///
    /// Missing or unreadable files are logged and left out.
    #[must_use]
    pub fn load(layout: &DataLayout) -> Self {
        let nodes = load_optional::<FeatureCollection>(&layout.enriched_file(NODES_FILE)).map(
            |collection| {
                collection
                    .features
                    .iter()
                    .filter_map(FlowNode::from_feature)
                    .collect::<Vec<_>>()
            },
        );
        if let Some(nodes) = &nodes {
            info!(count = nodes.len(), "loaded flow nodes");
        }

        let edges = load_optional::<Vec<FlowEdge>>(&layout.enriched_file(EDGES_FILE));
        if let Some(edges) = &edges {
            info!(count = edges.len(), "loaded flow edges");
        }

        let estimate = load_optional::<FlowEstimate>(&layout.enriched_file(ESTIMATES_FILE));
        if estimate.is_some() {
            info!("loaded waste flow estimates");
        }

        let datasets: Datasets = load_feature_files(&layout.processed_dir())
            .into_iter()
            .collect();
        for (key, collection) in &datasets {
            info!(dataset = %key, features = collection.len(), "loaded processed dataset");
        }

        Self {
            nodes,
            edges,
            estimate,
            datasets,
        }
    }

    /// Whether nothing at all was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_none()
            && self.edges.is_none()
            && self.estimate.is_none()
            && self.datasets.is_empty()
    }

    /// Loaded nodes of the given kind.
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &FlowNode> {
        self.nodes
            .iter()
            .flatten()
            .filter(move |node| node.kind == kind)
    }
}

fn load_optional<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match read_optional_json(path) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "skipping unreadable artifact");
            None
        }
    }
}
