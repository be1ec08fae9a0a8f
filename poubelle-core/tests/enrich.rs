//! Enricher runs against processed files on disk.

use poubelle_core::enrich::Enricher;
use poubelle_core::estimate::{EstimateConfig, FlowEstimate};
use poubelle_core::network::NetworkConfig;
use poubelle_core::store::{
    DataLayout, EDGES_FILE, ESTIMATES_FILE, NODES_FILE, read_json, write_json,
};
use poubelle_core::{
    Crs, DatasetKey, Feature, FeatureCollection, FlowEdge, FlowNode, GeoPoint, Geometry,
    NodeKind, Properties, WGS84, WasteCategory,
};
use serde_json::json;

fn collection_points() -> FeatureCollection {
    let features = [("Denfert", 2.3324, 48.8339), ("Pernety", 2.3182, 48.8339)]
        .into_iter()
        .map(|(name, lon, lat)| {
            let mut properties = Properties::new();
            properties.insert("nom".to_owned(), json!(name));
            Feature::new(Some(Geometry::point(GeoPoint::new(lon, lat))), properties)
        })
        .collect();
    FeatureCollection::new(features, Some(Crs::named(WGS84)))
}

#[test]
fn no_processed_data_means_no_enrichment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(dir.path(), dir.path());
    let estimates = EstimateConfig::default();
    let network = NetworkConfig::default();

    let result = Enricher::new(&estimates, &network, layout.clone())
        .run("14")
        .expect("no I/O failure");

    assert!(result.is_none(), "nothing to enrich");
    assert!(!layout.enriched_file(NODES_FILE).exists(), "nothing written");
}

#[test]
fn artifacts_are_written_for_collection_points() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(dir.path(), dir.path());
    write_json(
        &layout.feature_file(&DatasetKey::from("waste_collection_points")),
        &collection_points(),
    )
    .expect("writes");
    let estimates = EstimateConfig::default();
    let network = NetworkConfig::default();

    let enrichment = Enricher::new(&estimates, &network, layout.clone())
        .run("14")
        .expect("no I/O failure")
        .expect("processed data exists");

    assert_eq!(enrichment.network.nodes.len(), 5);
    assert_eq!(enrichment.network.edges.len(), 6);

    let nodes: FeatureCollection =
        read_json(&layout.enriched_file(NODES_FILE)).expect("nodes written");
    let decoded: Vec<FlowNode> = nodes.features.iter().filter_map(FlowNode::from_feature).collect();
    assert_eq!(decoded, enrichment.network.nodes);
    assert_eq!(
        decoded.iter().filter(|node| node.kind == NodeKind::Collection).count(),
        2
    );

    let edges: Vec<FlowEdge> = read_json(&layout.enriched_file(EDGES_FILE)).expect("edges");
    assert_eq!(edges, enrichment.network.edges);

    let estimate: FlowEstimate =
        read_json(&layout.enriched_file(ESTIMATES_FILE)).expect("estimates");
    assert_eq!(
        estimate.annual_tonnage.get(&WasteCategory::HouseholdWaste),
        Some(&35_560.0)
    );
    assert_eq!(estimate.treatment_flows.len(), 4);
    assert_eq!(estimate.collection_flows.collection_routes.len(), 4);
}

#[test]
fn other_datasets_alone_give_treatment_nodes_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(dir.path(), dir.path());
    write_json(
        &layout.feature_file(&DatasetKey::from("glass_igloos")),
        &collection_points(),
    )
    .expect("writes");
    let estimates = EstimateConfig::default();
    let network = NetworkConfig::default();

    let enrichment = Enricher::new(&estimates, &network, layout)
        .run("14")
        .expect("no I/O failure")
        .expect("processed data exists");

    assert_eq!(enrichment.network.nodes.len(), 3);
    assert!(enrichment.network.edges.is_empty(), "no collection nodes, no edges");
}
