//! Map model and the layer builders that fill it.

use std::collections::HashMap;

use poubelle_core::config::{InfrastructureLayer, MapConfig};
use poubelle_core::estimate::FlowEstimate;
use poubelle_core::model::{FeatureCollection, FlowEdge, FlowNode, Geometry, NodeKind, value_text};
use serde::Serialize;
use tracing::{debug, info};

use crate::data::MapData;
use crate::popup::{self, StatRow};
use crate::render::MapError;

/// Minimum and maximum flow line weight in pixels.
pub const FLOW_WEIGHT_RANGE: (f64, f64) = (2.0, 8.0);

const NAME_ALIASES: [&str; 2] = ["nom", "name"];
const ADDRESS_ALIASES: [&str; 2] = ["adresse", "address"];
const AREA_ALIASES: [&str; 2] = ["arrondissement", "c_ar"];

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Background tile layer.
pub struct TileLayer {
    /// Name shown in the layer control.
    pub name: String,
    /// Tile URL template.
    pub url: String,
    /// Attribution text.
    pub attribution: String,
}

impl TileLayer {
    fn new(name: &str, url: &str, attribution: &str) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            attribution: attribution.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Point marker with an awesome-markers icon.
pub struct Marker {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Rendered popup HTML.
    pub popup: String,
    /// Popup width limit in pixels.
    pub max_width: u32,
    /// Hover text.
    pub tooltip: String,
    /// Marker color name.
    pub color: String,
    /// Font Awesome icon name.
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Line between two nodes.
pub struct FlowLine {
    /// `[lat, lon]` of the source.
    pub from: [f64; 2],
    /// `[lat, lon]` of the target.
    pub to: [f64; 2],
    /// Line weight in pixels.
    pub weight: f64,
    /// Popup text.
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Overlay drawn on top of the base layers.
pub enum Overlay {
    /// Clustered markers.
    Cluster {
        /// Name shown in the layer control.
        name: String,
        /// Markers in the cluster.
        markers: Vec<Marker>,
    },
    /// Heat layer of `[lat, lon, intensity]` points.
    Heat {
        /// Name shown in the layer control.
        name: String,
        /// Weighted points.
        points: Vec<[f64; 3]>,
        /// Point radius.
        radius: u32,
        /// Blur radius.
        blur: u32,
        /// Zoom at which points reach full intensity.
        max_zoom: u32,
        /// Whether the layer starts visible.
        show: bool,
    },
    /// Flow polylines.
    Flows {
        /// Name shown in the layer control.
        name: String,
        /// Line color.
        color: String,
        /// Line opacity.
        opacity: f64,
        /// Lines.
        lines: Vec<FlowLine>,
    },
    /// Single marker added straight to the map.
    Marker(Marker),
    /// Area outline.
    Boundary {
        /// Outline geometry.
        geometry: Geometry,
        /// Hover text.
        tooltip: String,
    },
}

impl Overlay {
    /// Name shown in the layer control, if the overlay has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Overlay::Cluster { name, .. }
            | Overlay::Heat { name, .. }
            | Overlay::Flows { name, .. } => Some(name.as_str()),
            Overlay::Marker(_) | Overlay::Boundary { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Complete map, serialized into the page for the browser-side script.
pub struct LeafletMap {
    /// Page title.
    pub title: String,
    /// `[lat, lon]` of the initial view.
    pub center: [f64; 2],
    /// Initial zoom.
    pub zoom: u8,
    /// Background layers; the first is shown initially.
    pub base_layers: Vec<TileLayer>,
    /// Overlays in drawing order.
    pub overlays: Vec<Overlay>,
    /// Whether a layer toggle control is added.
    pub layer_control: bool,
}

/// Base map with OpenStreetMap and the two alternate backgrounds.
#[must_use]
pub fn base_map(config: &MapConfig, title: String) -> LeafletMap {
    LeafletMap {
        title,
        center: [config.center_lat, config.center_lon],
        zoom: config.zoom,
        base_layers: vec![
            TileLayer::new(
                "OpenStreetMap",
                "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                "&copy; OpenStreetMap contributors",
            ),
            TileLayer::new(
                "Satellite",
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
                "Esri",
            ),
            TileLayer::new(
                "CartoDB Positron",
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                "&copy; OpenStreetMap contributors &copy; CARTO",
            ),
        ],
        overlays: Vec::new(),
        layer_control: false,
    }
}

/// `glass_igloos` → `Glass Igloos`.
#[must_use]
pub fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `14` → `14th`, `1` → `1st`; non-numeric codes are returned unchanged.
#[must_use]
pub fn ordinal(code: &str) -> String {
    let Ok(number) = code.trim().parse::<u32>() else {
        return code.to_owned();
    };
    let suffix = match (number % 10, number % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{number}{suffix}")
}

/// Line weight for a daily tonnage, clamped to [`FLOW_WEIGHT_RANGE`].
#[must_use]
pub fn flow_weight(tonnage: f64) -> f64 {
    let (min, max) = FLOW_WEIGHT_RANGE;
    (tonnage * 2.0).clamp(min, max)
}

/// Clustered markers for one infrastructure dataset.
///
/// # Errors
///
/// Returns [`MapError::Render`] if a popup template fails.
pub fn infrastructure_cluster(
    layer: &InfrastructureLayer,
    collection: &FeatureCollection,
) -> Result<Overlay, MapError> {
    let type_name = title_case(layer.dataset.as_str());
    let mut markers = Vec::with_capacity(collection.len());

    for (idx, feature) in collection.features.iter().enumerate() {
        let Some(location) = feature.location() else {
            continue;
        };
        let name = feature
            .text(&NAME_ALIASES)
            .unwrap_or_else(|| format!("{type_name} {idx}"));
        let address = feature
            .text(&ADDRESS_ALIASES)
            .unwrap_or_else(|| "N/A".to_owned());
        let area = feature
            .text(&AREA_ALIASES)
            .unwrap_or_else(|| "N/A".to_owned());

        markers.push(Marker {
            lat: location.lat,
            lon: location.lon,
            popup: popup::record(&name, &type_name, &address, &area)?,
            max_width: 280,
            tooltip: name,
            color: layer.color.clone(),
            icon: layer.icon.clone(),
        });
    }

    Ok(Overlay::Cluster {
        name: format!("{type_name} ({})", collection.len()),
        markers,
    })
}

/// Cluster of collection nodes from the flow network.
///
/// # Errors
///
/// Returns [`MapError::Render`] if a popup template fails.
pub fn collection_cluster<'node>(
    nodes: impl Iterator<Item = &'node FlowNode>,
) -> Result<Overlay, MapError> {
    let markers = nodes
        .map(|node| {
            Ok(Marker {
                lat: node.location.lat,
                lon: node.location.lon,
                popup: popup::collection(node)?,
                max_width: 250,
                tooltip: node.name.clone(),
                color: "red".to_owned(),
                icon: "trash".to_owned(),
            })
        })
        .collect::<Result<Vec<_>, MapError>>()?;

    Ok(Overlay::Cluster {
        name: "Legacy Collection Points".to_owned(),
        markers,
    })
}

/// Cluster of treatment facilities, colored by treatment type.
///
/// # Errors
///
/// Returns [`MapError::Render`] if a popup template fails.
pub fn treatment_cluster<'node>(
    nodes: impl Iterator<Item = &'node FlowNode>,
    config: &MapConfig,
) -> Result<Overlay, MapError> {
    let markers = nodes
        .map(|node| {
            let treatment_type = node.treatment_type.as_deref().unwrap_or("unknown");
            Ok(Marker {
                lat: node.location.lat,
                lon: node.location.lon,
                popup: popup::treatment(&node.name, &title_case(treatment_type))?,
                max_width: 250,
                tooltip: node.name.clone(),
                color: config
                    .treatment_colors
                    .get(treatment_type)
                    .cloned()
                    .unwrap_or_else(|| "blue".to_owned()),
                icon: "industry".to_owned(),
            })
        })
        .collect::<Result<Vec<_>, MapError>>()?;

    Ok(Overlay::Cluster {
        name: "Treatment Facilities".to_owned(),
        markers,
    })
}

/// Hidden heat layer weighted by collection capacity; `None` without collection nodes.
#[must_use]
pub fn collection_heat<'node>(
    nodes: impl Iterator<Item = &'node FlowNode>,
    default_capacity_kg: f64,
) -> Option<Overlay> {
    let points: Vec<[f64; 3]> = nodes
        .map(|node| {
            let capacity = node.daily_capacity_kg.unwrap_or(default_capacity_kg);
            [node.location.lat, node.location.lon, capacity / 100.0]
        })
        .collect();

    (!points.is_empty()).then(|| Overlay::Heat {
        name: "Collection Intensity".to_owned(),
        points,
        radius: 20,
        blur: 15,
        max_zoom: 1,
        show: false,
    })
}

/// Polylines for every edge whose endpoints are both known nodes.
#[must_use]
pub fn flow_lines(nodes: &[FlowNode], edges: &[FlowEdge], color: &str) -> Overlay {
    let coords: HashMap<&str, [f64; 2]> = nodes
        .iter()
        .map(|node| (node.id.as_str(), [node.location.lat, node.location.lon]))
        .collect();

    let lines = edges
        .iter()
        .filter_map(|edge| {
            let from = *coords.get(edge.source.as_str())?;
            let to = *coords.get(edge.target.as_str())?;
            Some(FlowLine {
                from,
                to,
                weight: flow_weight(edge.estimated_daily_tonnage),
                popup: format!("Daily Flow: {:.1} tonnes", edge.estimated_daily_tonnage),
            })
        })
        .collect();

    Overlay::Flows {
        name: "Waste Flows".to_owned(),
        color: color.to_owned(),
        opacity: 0.7,
        lines,
    }
}

/// Marker next to the center whose popup tabulates annual tonnage per category.
///
/// # Errors
///
/// Returns [`MapError::Render`] if the popup template fails.
pub fn statistics_marker(
    estimate: &FlowEstimate,
    config: &MapConfig,
    area: &str,
) -> Result<Overlay, MapError> {
    let rows: Vec<StatRow> = estimate
        .annual_tonnage
        .iter()
        .map(|(category, tonnes)| StatRow {
            label: title_case(category.as_str()),
            color: config
                .waste_colors
                .get(category)
                .cloned()
                .unwrap_or_else(|| "#666666".to_owned()),
            tonnes: format!("{tonnes:.0}"),
        })
        .collect();

    let title = format!("{} Arrondissement Waste Statistics", ordinal(area));
    let generated = estimate.generated_at.format("%Y-%m-%d %H:%M UTC").to_string();

    Ok(Overlay::Marker(Marker {
        lat: config.center_lat + 0.01,
        lon: config.center_lon + 0.01,
        popup: popup::statistics(&title, &rows, &generated)?,
        max_width: 300,
        tooltip: "Click for waste statistics".to_owned(),
        color: "green".to_owned(),
        icon: "bar-chart".to_owned(),
    }))
}

/// Outline of the area whose `field` equals `area`.
///
/// When no feature carries `field` at all, the first feature is used.
#[must_use]
pub fn boundary(collection: &FeatureCollection, field: &str, area: &str) -> Option<Overlay> {
    let has_field = collection
        .features
        .iter()
        .any(|feature| feature.properties.contains_key(field));

    let feature = if has_field {
        collection.features.iter().find(|feature| {
            feature
                .properties
                .get(field)
                .and_then(value_text)
                .is_some_and(|code| code.trim() == area.trim())
        })
    } else {
        collection.features.first()
    }?;

    Some(Overlay::Boundary {
        geometry: feature.geometry.clone()?,
        tooltip: format!("{} Arrondissement", ordinal(area)),
    })
}

/// Assemble the full map for `area`; `None` when there is nothing to draw.
///
/// # Errors
///
/// Returns [`MapError::Render`] if a popup template fails.
pub fn build_map(
    data: &MapData,
    config: &MapConfig,
    area: &str,
    default_capacity_kg: f64,
) -> Result<Option<LeafletMap>, MapError> {
    if data.is_empty() {
        info!("no data available for visualization");
        return Ok(None);
    }

    let title = format!("Waste flows, {} arrondissement", ordinal(area));
    let mut map = base_map(config, title);

    for layer in &config.infrastructure {
        match data.datasets.get(&layer.dataset) {
            Some(collection) if !collection.is_empty() => {
                map.overlays.push(infrastructure_cluster(layer, collection)?);
            }
            _ => debug!(dataset = %layer.dataset, "no infrastructure data"),
        }
    }

    if let Some(nodes) = &data.nodes {
        map.overlays
            .push(collection_cluster(data.nodes_of(NodeKind::Collection))?);
        map.overlays
            .push(treatment_cluster(data.nodes_of(NodeKind::Treatment), config)?);
        if let Some(heat) = collection_heat(data.nodes_of(NodeKind::Collection), default_capacity_kg)
        {
            map.overlays.push(heat);
        }
        if let Some(edges) = &data.edges {
            map.overlays.push(flow_lines(nodes, edges, &config.flow_color));
        }
    }

    if let Some(estimate) = &data.estimate {
        map.overlays.push(statistics_marker(estimate, config, area)?);
    }

    if let Some(outline) = data
        .datasets
        .get(&config.boundary_dataset)
        .and_then(|boundaries| boundary(boundaries, &config.boundary_field, area))
    {
        map.overlays.push(outline);
    }

    map.layer_control = true;
    info!(overlays = map.overlays.len(), "assembled map");
    Ok(Some(map))
}

#[cfg(test)]
mod tests {
    use poubelle_core::model::{DatasetKey, Feature, GeoPoint, Properties};
    use serde_json::json;

    use super::*;

    fn feature(properties: serde_json::Value, location: Option<GeoPoint>) -> Feature {
        let properties = match properties {
            serde_json::Value::Object(map) => map,
            _ => Properties::new(),
        };
        Feature::new(location.map(Geometry::point), properties)
    }

    fn node(id: &str, kind: NodeKind, lon: f64, lat: f64) -> FlowNode {
        FlowNode {
            id: id.to_owned(),
            kind,
            name: id.to_owned(),
            location: GeoPoint::new(lon, lat),
            daily_capacity_kg: (kind == NodeKind::Collection).then_some(500.0),
            treatment_type: (kind == NodeKind::Treatment).then(|| "incineration".to_owned()),
        }
    }

    #[test]
    fn weight_is_clamped() {
        assert!((flow_weight(0.1) - 2.0).abs() < f64::EPSILON);
        assert!((flow_weight(3.0) - 6.0).abs() < f64::EPSILON);
        assert!((flow_weight(11.4) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn names_are_title_cased() {
        assert_eq!(title_case("glass_igloos"), "Glass Igloos");
        assert_eq!(title_case("household_waste"), "Household Waste");
        assert_eq!(title_case("recycling"), "Recycling");
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal("14"), "14th");
        assert_eq!(ordinal("1"), "1st");
        assert_eq!(ordinal("2"), "2nd");
        assert_eq!(ordinal("3"), "3rd");
        assert_eq!(ordinal("11"), "11th");
        assert_eq!(ordinal("Centre"), "Centre");
    }

    #[test]
    fn infrastructure_popup_probes_aliases() {
        let layer = InfrastructureLayer {
            dataset: DatasetKey::from("glass_igloos"),
            color: "blue".to_owned(),
            icon: "wine-bottle".to_owned(),
        };
        let collection = FeatureCollection::new(
            vec![
                feature(
                    json!({"name": "Igloo <Alésia>", "address": "12 rue d'Alésia", "c_ar": 14}),
                    Some(GeoPoint::new(2.327, 48.828)),
                ),
                feature(json!({}), Some(GeoPoint::new(2.33, 48.83))),
                feature(json!({"nom": "Sans géométrie"}), None),
            ],
            None,
        );

        let overlay = infrastructure_cluster(&layer, &collection).expect("renders");
        let Overlay::Cluster { name, markers } = overlay else {
            panic!("expected a cluster");
        };
        assert_eq!(name, "Glass Igloos (3)");
        assert_eq!(markers.len(), 2);

        let first = markers.first().expect("first marker");
        assert_eq!(first.tooltip, "Igloo <Alésia>");
        assert!(first.popup.contains("Igloo &lt;Alésia&gt;"), "{}", first.popup);
        assert!(first.popup.contains("14"), "{}", first.popup);

        let second = markers.get(1).expect("second marker");
        assert_eq!(second.tooltip, "Glass Igloos 1");
        assert!(second.popup.contains("N/A"), "{}", second.popup);
    }

    #[test]
    fn flow_lines_skip_unknown_endpoints() {
        let nodes = vec![
            node("collection_0", NodeKind::Collection, 2.32, 48.83),
            node("treatment_incineration", NodeKind::Treatment, 2.27, 48.82),
        ];
        let edge = |source: &str, target: &str| FlowEdge {
            source: source.to_owned(),
            target: target.to_owned(),
            flow_type: "waste_transport".to_owned(),
            estimated_daily_tonnage: 11.4,
        };
        let edges = vec![
            edge("collection_0", "treatment_incineration"),
            edge("collection_9", "treatment_incineration"),
        ];

        let Overlay::Flows { lines, .. } = flow_lines(&nodes, &edges, "#FF6B6B") else {
            panic!("expected flows");
        };
        assert_eq!(lines.len(), 1);
        let line = lines.first().expect("one line");
        assert_eq!(line.from, [48.83, 2.32]);
        assert_eq!(line.popup, "Daily Flow: 11.4 tonnes");
        assert!((line.weight - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn heat_needs_collection_nodes() {
        let nodes = [node("collection_0", NodeKind::Collection, 2.32, 48.83)];
        let Some(Overlay::Heat { points, show, .. }) = collection_heat(nodes.iter(), 500.0) else {
            panic!("expected heat layer");
        };
        assert_eq!(points, vec![[48.83, 2.32, 5.0]]);
        assert!(!show, "heat layer starts hidden");

        assert!(collection_heat(std::iter::empty(), 500.0).is_none());
    }

    #[test]
    fn boundary_is_filtered_by_area_code() {
        let square = |lon: f64| Geometry::Polygon {
            coordinates: vec![vec![
                vec![lon, 48.8],
                vec![lon + 0.01, 48.8],
                vec![lon + 0.01, 48.81],
                vec![lon, 48.8],
            ]],
        };
        let collection = FeatureCollection::new(
            vec![
                Feature::new(Some(square(2.30)), json_props(json!({"c_ar": 13}))),
                Feature::new(Some(square(2.32)), json_props(json!({"c_ar": 14}))),
            ],
            None,
        );

        let Some(Overlay::Boundary { geometry, tooltip }) = boundary(&collection, "c_ar", "14")
        else {
            panic!("expected a boundary");
        };
        assert_eq!(geometry, square(2.32));
        assert_eq!(tooltip, "14th Arrondissement");
        assert!(boundary(&collection, "c_ar", "20").is_none());

        let unkeyed = FeatureCollection::new(
            vec![Feature::new(Some(square(2.40)), Properties::new())],
            None,
        );
        assert!(boundary(&unkeyed, "c_ar", "14").is_some(), "falls back to the first feature");
    }

    fn json_props(value: serde_json::Value) -> Properties {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    #[test]
    fn empty_data_gives_no_map() {
        let map = build_map(&MapData::default(), &MapConfig::default(), "14", 500.0)
            .expect("no render error");
        assert!(map.is_none(), "nothing to draw");
    }
}
