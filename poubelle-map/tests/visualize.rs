//! Visualizer runs against artifacts produced by the enricher.

use poubelle_core::config::MapConfig;
use poubelle_core::enrich::Enricher;
use poubelle_core::estimate::EstimateConfig;
use poubelle_core::network::NetworkConfig;
use poubelle_core::store::{DataLayout, write_json};
use poubelle_core::{
    Crs, DatasetKey, Feature, FeatureCollection, GeoPoint, Geometry, NodeKind, Properties, WGS84,
    WasteCategory,
};
use poubelle_map::{MapData, Overlay, Visualizer};
use serde_json::json;

fn points(names: &[(&str, f64, f64)]) -> FeatureCollection {
    let features = names
        .iter()
        .map(|&(name, lon, lat)| {
            let mut properties = Properties::new();
            properties.insert("nom".to_owned(), json!(name));
            properties.insert("c_ar".to_owned(), json!(14));
            Feature::new(Some(Geometry::point(GeoPoint::new(lon, lat))), properties)
        })
        .collect();
    FeatureCollection::new(features, Some(Crs::named(WGS84)))
}

fn enriched_layout(dir: &std::path::Path) -> DataLayout {
    let layout = DataLayout::new(&dir.join("data"), &dir.join("static"));
    write_json(
        &layout.feature_file(&DatasetKey::from("waste_collection_points")),
        &points(&[("Denfert", 2.3324, 48.8339), ("Pernety", 2.3182, 48.8339)]),
    )
    .expect("writes");
    write_json(
        &layout.feature_file(&DatasetKey::from("glass_igloos")),
        &points(&[("Igloo Alésia", 2.327, 48.828)]),
    )
    .expect("writes");

    let estimates = EstimateConfig::default();
    let network = NetworkConfig::default();
    Enricher::new(&estimates, &network, layout.clone())
        .run("14")
        .expect("no I/O failure")
        .expect("processed data exists");
    layout
}

#[test]
fn artifacts_load_back_into_map_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = enriched_layout(dir.path());

    let data = MapData::load(&layout);
    assert_eq!(data.nodes.as_ref().map(Vec::len), Some(5));
    assert_eq!(data.nodes_of(NodeKind::Treatment).count(), 3);
    assert_eq!(data.edges.as_ref().map(Vec::len), Some(6));
    let household = data
        .estimate
        .as_ref()
        .and_then(|estimate| estimate.annual_tonnage.get(&WasteCategory::HouseholdWaste));
    assert_eq!(household, Some(&35_560.0));
    assert_eq!(data.datasets.len(), 2);
}

#[test]
fn map_is_drawn_and_saved() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = enriched_layout(dir.path());
    let config = MapConfig::default();
    let visualizer = Visualizer::new(&config, layout.clone(), 500.0);

    let map = visualizer
        .create_map("14")
        .expect("renders")
        .expect("data available");

    let names: Vec<&str> = map.overlays.iter().filter_map(Overlay::name).collect();
    assert_eq!(
        names,
        [
            "Glass Igloos (1)",
            "Legacy Collection Points",
            "Treatment Facilities",
            "Collection Intensity",
            "Waste Flows",
        ]
    );
    assert!(map.layer_control);
    assert!(
        map.overlays
            .iter()
            .any(|overlay| matches!(overlay, Overlay::Marker(_))),
        "statistics marker present"
    );

    let path = visualizer.save(&map).expect("saved");
    assert_eq!(path, layout.output_dir().join("garbage_flow_map.html"));
    let html = std::fs::read_to_string(&path).expect("readable");
    assert!(html.contains("Waste Flows"), "flow layer embedded");
    assert!(html.contains("14th Arrondissement Waste Statistics"));
    assert!(html.contains("L.control.layers"));
}

#[test]
fn empty_data_dir_draws_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(&dir.path().join("data"), &dir.path().join("static"));
    let config = MapConfig::default();

    let map = Visualizer::new(&config, layout.clone(), 500.0)
        .create_map("14")
        .expect("no render error");

    assert!(map.is_none());
    assert!(!layout.output_dir().exists(), "no page written");
}
