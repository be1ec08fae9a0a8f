//! Construction of the collection → treatment flow network.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::estimate::FlowEstimate;
use crate::model::{
    DatasetKey, Feature, FeatureCollection, FlowEdge, FlowNetwork, FlowNode, GeoPoint, Geometry,
    NodeKind, WasteCategory,
};

/// Flow type label carried by every modeled edge.
pub const WASTE_TRANSPORT: &str = "waste_transport";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Treatment site placed on the map as a destination node.
pub struct TreatmentDestination {
    /// Site name.
    pub name: String,
    /// Process type; also forms the node id.
    pub treatment_type: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl TreatmentDestination {
    fn new(name: &str, treatment_type: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_owned(),
            treatment_type: treatment_type.to_owned(),
            lat,
            lon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Parameters of the placeholder flow model.
pub struct NetworkConfig {
    /// Processed dataset whose features become collection nodes.
    pub collection_dataset: DatasetKey,
    /// Capacity assigned to every collection node.
    pub default_daily_capacity_kg: f64,
    /// Category whose daily flow is spread over the edges.
    pub edge_category: WasteCategory,
    /// Each edge carries the category's daily flow divided by this.
    pub edge_tonnage_divisor: f64,
    /// Treatment destinations.
    pub destinations: Vec<TreatmentDestination>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            collection_dataset: DatasetKey::from("waste_collection_points"),
            default_daily_capacity_kg: 500.0,
            edge_category: WasteCategory::HouseholdWaste,
            edge_tonnage_divisor: 10.0,
            destinations: vec![
                TreatmentDestination::new("Issy-les-Moulineaux", "incineration", 48.8247, 2.2725),
                TreatmentDestination::new("Centre de tri Nanterre", "recycling", 48.8944, 2.1981),
                TreatmentDestination::new("Verrerie Brosse", "glass_processing", 48.7589, 2.3447),
            ],
        }
    }
}

/// Collection nodes for every located feature of the collection dataset.
#[must_use]
pub fn collection_nodes(points: &FeatureCollection, config: &NetworkConfig) -> Vec<FlowNode> {
    points
        .features
        .iter()
        .enumerate()
        .filter_map(|(idx, feature)| {
            let Some(location) = feature.location() else {
                debug!(index = idx, "skipping collection point without geometry");
                return None;
            };
            Some(FlowNode {
                id: format!("collection_{idx}"),
                kind: NodeKind::Collection,
                name: feature
                    .text(&["nom"])
                    .unwrap_or_else(|| format!("Collection Point {idx}")),
                location,
                daily_capacity_kg: Some(config.default_daily_capacity_kg),
                treatment_type: None,
            })
        })
        .collect()
}

/// One treatment node per configured destination.
#[must_use]
pub fn treatment_nodes(config: &NetworkConfig) -> Vec<FlowNode> {
    config
        .destinations
        .iter()
        .map(|destination| FlowNode {
            id: format!("treatment_{}", destination.treatment_type),
            kind: NodeKind::Treatment,
            name: destination.name.clone(),
            location: GeoPoint::new(destination.lon, destination.lat),
            daily_capacity_kg: None,
            treatment_type: Some(destination.treatment_type.clone()),
        })
        .collect()
}

/// Daily tonnage assigned to each edge.
#[must_use]
pub fn edge_tonnage(estimate: &FlowEstimate, config: &NetworkConfig) -> f64 {
    let daily = estimate
        .collection_flows
        .daily_flows
        .get(&config.edge_category)
        .copied()
        .unwrap_or(0.0);
    daily / config.edge_tonnage_divisor
}

/// Build the network: collection nodes from `collection_points` (when present), the
/// configured treatment nodes, and an edge for every collection × treatment pair.
#[must_use]
pub fn build_flow_network(
    collection_points: Option<&FeatureCollection>,
    estimate: &FlowEstimate,
    config: &NetworkConfig,
) -> FlowNetwork {
    let collection = collection_points
        .map(|points| collection_nodes(points, config))
        .unwrap_or_default();
    let treatment = treatment_nodes(config);
    let tonnage = edge_tonnage(estimate, config);

    let edges = collection
        .iter()
        .flat_map(|source| {
            treatment.iter().map(move |target| FlowEdge {
                source: source.id.clone(),
                target: target.id.clone(),
                flow_type: WASTE_TRANSPORT.to_owned(),
                estimated_daily_tonnage: tonnage,
            })
        })
        .collect();

    let mut nodes = collection;
    nodes.extend(treatment);
    FlowNetwork { nodes, edges }
}

#[derive(Serialize, Deserialize)]
struct NodeProperties {
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    daily_capacity_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    treatment_type: Option<String>,
}

impl FlowNode {
    /// GeoJSON point feature carrying the node attributes as properties.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the attributes cannot be encoded.
    pub fn to_feature(&self) -> Result<Feature, serde_json::Error> {
        let properties = NodeProperties {
            id: self.id.clone(),
            kind: self.kind,
            name: self.name.clone(),
            daily_capacity_kg: self.daily_capacity_kg,
            treatment_type: self.treatment_type.clone(),
        };
        let properties = match serde_json::to_value(properties)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Ok(Feature::new(Some(Geometry::point(self.location)), properties))
    }

    /// Read a node back from a feature written by [`FlowNode::to_feature`].
    ///
    /// Returns `None` when the feature has no location or lacks node attributes.
    #[must_use]
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let location = feature.location()?;
        let properties: NodeProperties =
            serde_json::from_value(Value::Object(feature.properties.clone())).ok()?;
        Some(Self {
            id: properties.id,
            kind: properties.kind,
            name: properties.name,
            location,
            daily_capacity_kg: properties.daily_capacity_kg,
            treatment_type: properties.treatment_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::estimate::{EstimateConfig, estimate_waste_flows};
    use crate::model::Properties;

    fn point_feature(lon: f64, lat: f64, name: Option<&str>) -> Feature {
        let mut properties = Properties::new();
        if let Some(name) = name {
            properties.insert("nom".to_owned(), json!(name));
        }
        Feature::new(Some(Geometry::point(GeoPoint::new(lon, lat))), properties)
    }

    #[test]
    fn no_collection_points_means_no_edges() {
        let estimate = estimate_waste_flows(&EstimateConfig::default(), "14");
        let config = NetworkConfig::default();

        let absent = build_flow_network(None, &estimate, &config);
        assert_eq!(absent.nodes.len(), 3);
        assert!(absent.edges.is_empty(), "no edges without collection points");

        let empty = FeatureCollection::new(Vec::new(), None);
        let network = build_flow_network(Some(&empty), &estimate, &config);
        assert!(network.edges.is_empty(), "no edges for an empty dataset");
        assert_eq!(network.nodes_of(NodeKind::Treatment).count(), 3);
    }

    #[test]
    fn edges_are_the_full_cross_product_with_uniform_tonnage() {
        let estimate = estimate_waste_flows(&EstimateConfig::default(), "14");
        let config = NetworkConfig::default();
        let points = FeatureCollection::new(
            vec![
                point_feature(2.32, 48.83, Some("Place Denfert")),
                point_feature(2.33, 48.82, None),
                Feature::new(None, Properties::new()),
            ],
            None,
        );

        let network = build_flow_network(Some(&points), &estimate, &config);

        assert_eq!(network.nodes_of(NodeKind::Collection).count(), 2);
        assert_eq!(network.edges.len(), 2 * 3);

        let expected = 35_560.0 / 52.0 / 6.0 / 10.0;
        assert!(
            network
                .edges
                .iter()
                .all(|edge| (edge.estimated_daily_tonnage - expected).abs() < 1e-9),
            "every edge carries household daily flow / 10"
        );

        let names: Vec<&str> = network
            .nodes_of(NodeKind::Collection)
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, ["Place Denfert", "Collection Point 1"]);
    }

    #[test]
    fn node_survives_feature_conversion() {
        let node = treatment_nodes(&NetworkConfig::default())
            .into_iter()
            .next()
            .expect("default destinations");

        let feature = node.to_feature().expect("encodes");
        assert_eq!(
            feature.properties.get("type"),
            Some(&json!("treatment"))
        );
        assert_eq!(FlowNode::from_feature(&feature), Some(node));
    }
}
