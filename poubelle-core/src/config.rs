//! Pipeline configuration: built-in defaults, optionally overlaid by a TOML file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::estimate::EstimateConfig;
use crate::model::{DatasetKey, WasteCategory};
use crate::network::NetworkConfig;
use crate::registry::{DatasetRegistry, DatasetSource, paris_datasets};
use crate::store::DataLayout;

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading a configuration file.
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Remote records API settings.
pub struct ApiConfig {
    /// Base URL of the records API.
    pub base_url: String,
    /// Row cap sent with every query.
    pub rows: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Candidate field names the area filter is applied to.
    pub refine_fields: Vec<String>,
    /// User agent sent with requests.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://opendata.paris.fr/api/records/1.0".to_owned(),
            rows: 10_000,
            timeout_secs: 30,
            refine_fields: vec![
                "c_ar".to_owned(),
                "arrondissement".to_owned(),
                "code_postal".to_owned(),
            ],
            user_agent: "poubelle/0.1".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Styling of one drop-off infrastructure layer.
pub struct InfrastructureLayer {
    /// Processed dataset drawn by the layer.
    pub dataset: DatasetKey,
    /// Marker color name.
    pub color: String,
    /// Font Awesome icon name.
    pub icon: String,
}

impl InfrastructureLayer {
    fn new(dataset: &str, color: &str, icon: &str) -> Self {
        Self {
            dataset: DatasetKey::from(dataset),
            color: color.to_owned(),
            icon: icon.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Map rendering settings.
pub struct MapConfig {
    /// Latitude of the initial view.
    pub center_lat: f64,
    /// Longitude of the initial view.
    pub center_lon: f64,
    /// Initial zoom level.
    pub zoom: u8,
    /// File name of the rendered map inside the output directory.
    pub output_file: String,
    /// Infrastructure layers, drawn in this order.
    pub infrastructure: Vec<InfrastructureLayer>,
    /// Marker color per treatment type.
    pub treatment_colors: BTreeMap<String, String>,
    /// Legend color per waste category.
    pub waste_colors: BTreeMap<WasteCategory, String>,
    /// Color of flow polylines.
    pub flow_color: String,
    /// Processed dataset holding area boundaries.
    pub boundary_dataset: DatasetKey,
    /// Attribute carrying the area code in the boundary dataset.
    pub boundary_field: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        let treatment_colors = [
            ("recycling", "green"),
            ("incineration", "orange"),
            ("composting", "darkgreen"),
            ("glass_processing", "blue"),
        ]
        .into_iter()
        .map(|(kind, color)| (kind.to_owned(), color.to_owned()))
        .collect();

        let waste_colors = [
            (WasteCategory::HouseholdWaste, "#FF4444"),
            (WasteCategory::Recyclables, "#44FF44"),
            (WasteCategory::Glass, "#4444FF"),
            (WasteCategory::OrganicWaste, "#FFA500"),
            (WasteCategory::BulkyWaste, "#800080"),
            (WasteCategory::ElectronicWaste, "#008080"),
        ]
        .into_iter()
        .map(|(category, color)| (category, color.to_owned()))
        .collect();

        Self {
            center_lat: 48.8332,
            center_lon: 2.3270,
            zoom: 14,
            output_file: "garbage_flow_map.html".to_owned(),
            infrastructure: vec![
                InfrastructureLayer::new("glass_igloos", "blue", "wine-bottle"),
                InfrastructureLayer::new("trilib_stations", "green", "recycle"),
                InfrastructureLayer::new("public_composters", "darkgreen", "seedling"),
                InfrastructureLayer::new("textile_containers", "purple", "tshirt"),
                InfrastructureLayer::new("street_bins", "orange", "trash"),
                InfrastructureLayer::new("recycling_centers", "cadetblue", "industry"),
            ],
            treatment_colors,
            waste_colors,
            flow_color: "#FF6B6B".to_owned(),
            boundary_dataset: DatasetKey::from("arrondissement_boundaries"),
            boundary_field: "c_ar".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Everything the three stages need, passed explicitly into each of them.
pub struct PipelineConfig {
    /// Root of the raw, processed and enriched data directories.
    pub data_dir: PathBuf,
    /// Directory the rendered map is written to.
    pub output_dir: PathBuf,
    /// Remote API settings.
    pub api: ApiConfig,
    /// Dataset sources.
    pub datasets: Vec<DatasetSource>,
    /// Estimation constants.
    pub estimates: EstimateConfig,
    /// Flow network parameters.
    pub network: NetworkConfig,
    /// Map settings.
    pub map: MapConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("static"),
            api: ApiConfig::default(),
            datasets: paris_datasets(),
            estimates: EstimateConfig::default(),
            network: NetworkConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory layout rooted at [`PipelineConfig::data_dir`].
    #[must_use]
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir, &self.output_dir)
    }

    /// Registry built from the configured dataset sources.
    #[must_use]
    pub fn registry(&self) -> DatasetRegistry {
        DatasetRegistry::new(self.datasets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overrides_only_what_it_names() {
        let text = r#"
            data_dir = "/tmp/poubelle"

            [api]
            rows = 500

            [estimates]
            population = 100000

            [estimates.rates]
            household_waste = 300
            glass = 40.5

            [network]
            edge_tonnage_divisor = 4.0
        "#;

        let config: PipelineConfig = toml::from_str(text).expect("parses");

        assert_eq!(config.data_dir, PathBuf::from("/tmp/poubelle"));
        assert_eq!(config.api.rows, 500);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.estimates.population, 100_000);
        assert_eq!(config.estimates.rates.len(), 2);
        assert_eq!(
            config.estimates.rates.get(&WasteCategory::HouseholdWaste),
            Some(&300.0)
        );
        assert_eq!(config.estimates.neighborhoods.len(), 4);
        assert_eq!(config.datasets.len(), 15);
        assert_eq!(config.network.destinations.len(), 3);
        assert_eq!(config.map.zoom, 14);
    }

    #[test]
    fn dataset_list_can_be_replaced() {
        let text = r#"
            [[datasets]]
            key = "glass_igloos"
            id = "colonnes-a-verre"
            scope = "area"
            priority = true

            [[datasets]]
            key = "arrondissement_boundaries"
            id = "arrondissements"
            scope = "city"
        "#;

        let config: PipelineConfig = toml::from_str(text).expect("parses");
        let registry = config.registry();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/poubelle.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })), "file does not exist");
    }

    #[test]
    fn no_path_means_defaults() {
        let config = PipelineConfig::load(None).expect("defaults");
        assert_eq!(config, PipelineConfig::default());
    }
}
