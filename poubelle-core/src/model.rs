//! Domain data structures for datasets, geographic features, and the flow network.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Coordinate reference system written into every processed feature file.
pub const WGS84: &str = "EPSG:4326";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Local name of a dataset, used for file names and layer lookups.
pub struct DatasetKey(pub String);

impl DatasetKey {
    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for DatasetKey {
    fn from(key: &str) -> Self {
        DatasetKey(key.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier of a dataset on the remote data portal.
pub struct DatasetId(pub String);

impl fmt::Display for DatasetId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Waste categories covered by the flow estimates.
pub enum WasteCategory {
    /// Residual household waste.
    HouseholdWaste,
    /// Packaging and paper.
    Recyclables,
    /// Glass.
    Glass,
    /// Separately collected bio-waste.
    OrganicWaste,
    /// Bulky items.
    BulkyWaste,
    /// Waste electrical and electronic equipment.
    ElectronicWaste,
}

impl WasteCategory {
    /// Every category, in reporting order.
    pub const ALL: [WasteCategory; 6] = [
        WasteCategory::HouseholdWaste,
        WasteCategory::Recyclables,
        WasteCategory::Glass,
        WasteCategory::OrganicWaste,
        WasteCategory::BulkyWaste,
        WasteCategory::ElectronicWaste,
    ];

    /// Snake-case name as used in artifacts and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WasteCategory::HouseholdWaste => "household_waste",
            WasteCategory::Recyclables => "recyclables",
            WasteCategory::Glass => "glass",
            WasteCategory::OrganicWaste => "organic_waste",
            WasteCategory::BulkyWaste => "bulky_waste",
            WasteCategory::ElectronicWaste => "electronic_waste",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Geographic point in WGS84 degrees.
pub struct GeoPoint {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
}

impl GeoPoint {
    /// Build a point from longitude and latitude.
    #[must_use]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Read a GeoJSON position (`[lon, lat, ...]`).
    #[must_use]
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lon, lat, ..] => Some(Self::new(*lon, *lat)),
            _ => None,
        }
    }

    /// GeoJSON position for this point.
    #[must_use]
    pub fn to_position(self) -> Position {
        vec![self.lon, self.lat]
    }
}

/// A GeoJSON position; extra elements such as altitude are carried but ignored.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
/// GeoJSON geometry objects found in the open data records.
pub enum Geometry {
    /// Single position.
    Point {
        /// Position of the point.
        coordinates: Position,
    },
    /// Several positions.
    MultiPoint {
        /// Positions.
        coordinates: Vec<Position>,
    },
    /// Polyline.
    LineString {
        /// Vertices.
        coordinates: Vec<Position>,
    },
    /// Several polylines.
    MultiLineString {
        /// Lines.
        coordinates: Vec<Vec<Position>>,
    },
    /// Polygon with an outer ring and optional holes.
    Polygon {
        /// Rings.
        coordinates: Vec<Vec<Position>>,
    },
    /// Several polygons.
    MultiPolygon {
        /// Polygons.
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// Point geometry at the given location.
    #[must_use]
    pub fn point(location: GeoPoint) -> Self {
        Geometry::Point {
            coordinates: location.to_position(),
        }
    }

    /// Location used to place a marker for this geometry.
    ///
    /// Points map to themselves; other shapes use the vertex mean of their first part.
    #[must_use]
    pub fn representative_point(&self) -> Option<GeoPoint> {
        match self {
            Geometry::Point { coordinates } => GeoPoint::from_position(coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                vertex_mean(coordinates)
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.first().and_then(|part| vertex_mean(part))
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .first()
                .and_then(|polygon| polygon.first())
                .and_then(|ring| vertex_mean(ring)),
        }
    }
}

fn vertex_mean(positions: &[Position]) -> Option<GeoPoint> {
    let (lon_sum, lat_sum, count) = positions
        .iter()
        .filter_map(|position| GeoPoint::from_position(position))
        .fold((0.0, 0.0, 0.0_f64), |(lon, lat, count), point| {
            (lon + point.lon, lat + point.lat, count + 1.0)
        });

    (count > 0.0).then(|| GeoPoint::new(lon_sum / count, lat_sum / count))
}

/// Free-form attribute table of a feature.
pub type Properties = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureCollectionTag {
    FeatureCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// GeoJSON feature: an optional geometry plus its attributes.
pub struct Feature {
    #[serde(rename = "type")]
    tag: FeatureTag,
    /// Geometry, `null` when the record has none.
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// Record attributes.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Properties,
}

impl Feature {
    /// Build a feature from its parts.
    #[must_use]
    pub fn new(geometry: Option<Geometry>, properties: Properties) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry,
            properties,
        }
    }

    /// Marker location of the feature, if it has a usable geometry.
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        self.geometry
            .as_ref()
            .and_then(Geometry::representative_point)
    }

    /// First non-null attribute among `aliases`, rendered as text.
    #[must_use]
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| self.properties.get(*alias))
            .find_map(value_text)
    }
}

/// Text form of a scalar JSON value; `None` for null and containers.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Properties>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Named coordinate reference system marker.
pub struct Crs {
    #[serde(rename = "type")]
    kind: String,
    properties: CrsProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CrsProperties {
    name: String,
}

impl Crs {
    /// Marker referring to a CRS by name, e.g. `EPSG:4326`.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            kind: "name".to_owned(),
            properties: CrsProperties {
                name: name.to_owned(),
            },
        }
    }

    /// Name of the referenced CRS.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.properties.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// GeoJSON feature collection, the on-disk form of a processed dataset.
pub struct FeatureCollection {
    #[serde(rename = "type")]
    tag: FeatureCollectionTag,
    /// CRS marker, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
    /// Features in record order.
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Collection in the given CRS.
    #[must_use]
    pub fn new(features: Vec<Feature>, crs: Option<Crs>) -> Self {
        Self {
            tag: FeatureCollectionTag::FeatureCollection,
            crs,
            features,
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Role of a node in the flow network.
pub enum NodeKind {
    /// Site where waste is deposited for pickup.
    Collection,
    /// Site that processes collected waste.
    Treatment,
}

#[derive(Debug, Clone, PartialEq)]
/// Collection point or treatment facility.
pub struct FlowNode {
    /// Unique node identifier, e.g. `collection_3` or `treatment_incineration`.
    pub id: String,
    /// Collection or treatment.
    pub kind: NodeKind,
    /// Display name.
    pub name: String,
    /// Where the site is.
    pub location: GeoPoint,
    /// Estimated daily capacity, set on collection nodes.
    pub daily_capacity_kg: Option<f64>,
    /// Treatment process, set on treatment nodes.
    pub treatment_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Modeled transport relationship between two nodes.
pub struct FlowEdge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Kind of flow, currently always `waste_transport`.
    pub flow_type: String,
    /// Estimated tonnes per day along the edge.
    pub estimated_daily_tonnage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Nodes and edges produced by one enrichment run.
pub struct FlowNetwork {
    /// Collection nodes first, then treatment nodes.
    pub nodes: Vec<FlowNode>,
    /// Collection × treatment edges.
    pub edges: Vec<FlowEdge>,
}

impl FlowNetwork {
    /// Nodes of the given kind.
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &FlowNode> {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn polygon_location_is_vertex_mean_of_outer_ring() {
        let geometry: Geometry = serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[[2.0, 48.0], [4.0, 48.0], [4.0, 50.0], [2.0, 50.0]]]
        }))
        .expect("polygon parses");

        let point = geometry.representative_point().expect("has a point");
        assert!((point.lon - 3.0).abs() < 1e-12, "lon {}", point.lon);
        assert!((point.lat - 49.0).abs() < 1e-12, "lat {}", point.lat);
    }

    #[test]
    fn feature_with_null_geometry_and_properties_parses() {
        let feature: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": null
        }))
        .expect("feature parses");

        assert!(feature.geometry.is_none(), "geometry should be absent");
        assert!(feature.properties.is_empty(), "properties should be empty");
        assert!(feature.location().is_none(), "no location without geometry");
    }

    #[test]
    fn text_probes_aliases_in_order_and_skips_nulls() {
        let mut properties = Properties::new();
        properties.insert("nom".to_owned(), Value::Null);
        properties.insert("name".to_owned(), json!("Colonne Alésia"));
        properties.insert("c_ar".to_owned(), json!(14));
        let feature = Feature::new(None, properties);

        assert_eq!(
            feature.text(&["nom", "name"]).as_deref(),
            Some("Colonne Alésia")
        );
        assert_eq!(
            feature.text(&["arrondissement", "c_ar"]).as_deref(),
            Some("14")
        );
        assert_eq!(feature.text(&["adresse", "address"]), None);
    }

    #[test]
    fn waste_category_serializes_in_snake_case() {
        let encoded = serde_json::to_string(&WasteCategory::OrganicWaste).expect("serializes");
        assert_eq!(encoded, "\"organic_waste\"");
        assert_eq!(WasteCategory::ElectronicWaste.to_string(), "electronic_waste");
    }
}
