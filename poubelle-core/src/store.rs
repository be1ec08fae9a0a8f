//! On-disk layout shared by the stages and JSON artifact helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::model::{DatasetKey, FeatureCollection};

/// Raw response files, one per dataset.
pub const RAW_DIR: &str = "raw";
/// Processed feature files, one per dataset.
pub const PROCESSED_DIR: &str = "processed";
/// Enrichment artifacts.
pub const ENRICHED_DIR: &str = "enriched";

/// Flow nodes as a GeoJSON feature collection.
pub const NODES_FILE: &str = "flow_nodes.geojson";
/// Flow edges as a JSON array.
pub const EDGES_FILE: &str = "flow_edges.json";
/// Full estimate structure.
pub const ESTIMATES_FILE: &str = "waste_flow_estimates.json";

/// Extension of processed geographic datasets.
pub const GEOJSON_EXT: &str = "geojson";

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading or writing pipeline artifacts.
pub enum ArtifactError {
    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Content could not be encoded or decoded.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Paths of every directory the pipeline reads or writes.
pub struct DataLayout {
    data_dir: PathBuf,
    output_dir: PathBuf,
}

impl DataLayout {
    /// Layout rooted at `data_dir`, writing maps to `output_dir`.
    #[must_use]
    pub fn new(data_dir: &Path, output_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Directory of raw responses.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join(RAW_DIR)
    }

    /// Directory of processed datasets.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join(PROCESSED_DIR)
    }

    /// Directory of enrichment artifacts.
    #[must_use]
    pub fn enriched_dir(&self) -> PathBuf {
        self.data_dir.join(ENRICHED_DIR)
    }

    /// Directory rendered maps are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Raw response file of `key`.
    #[must_use]
    pub fn raw_file(&self, key: &DatasetKey) -> PathBuf {
        self.raw_dir().join(format!("{key}.json"))
    }

    /// Processed feature file of a geographic dataset.
    #[must_use]
    pub fn feature_file(&self, key: &DatasetKey) -> PathBuf {
        self.processed_dir().join(format!("{key}.{GEOJSON_EXT}"))
    }

    /// Processed table file of a dataset without geometry.
    #[must_use]
    pub fn table_file(&self, key: &DatasetKey) -> PathBuf {
        self.processed_dir().join(format!("{key}.json"))
    }

    /// Path of an enrichment artifact.
    #[must_use]
    pub fn enriched_file(&self, name: &str) -> PathBuf {
        self.enriched_dir().join(name)
    }
}

/// Create `dir` and its parents.
///
/// # Errors
///
/// Returns [`ArtifactError::Io`] if the directory cannot be created.
pub fn ensure_dir(dir: &Path) -> Result<(), ArtifactError> {
    fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write `value` as pretty JSON, creating the parent directory if needed.
///
/// # Errors
///
/// Returns an [`ArtifactError`] if encoding or writing fails.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let encoded = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, encoded).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and decode a JSON file.
///
/// # Errors
///
/// Returns an [`ArtifactError`] if reading or decoding fails.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON artifact that may legitimately be absent.
///
/// Missing files yield `Ok(None)`.
///
/// # Errors
///
/// Returns an [`ArtifactError`] if the file exists but cannot be read or decoded.
pub fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    if path.is_file() {
        read_json(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Load every processed GeoJSON dataset in `dir`, sorted by key.
///
/// Files that fail to parse are logged and skipped; a missing directory yields nothing.
#[must_use]
pub fn load_feature_files(dir: &Path) -> Vec<(DatasetKey, FeatureCollection)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot list processed data");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == GEOJSON_EXT))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let key = DatasetKey(path.file_stem()?.to_string_lossy().into_owned());
            match read_json::<FeatureCollection>(&path) {
                Ok(collection) => Some((key, collection)),
                Err(err) => {
                    warn!(dataset = %key, error = %err, "skipping unreadable dataset");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::model::{Crs, WGS84};

    #[test]
    fn feature_files_are_loaded_sorted_and_broken_ones_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path(), dir.path());
        let empty = FeatureCollection::new(Vec::new(), Some(Crs::named(WGS84)));

        write_json(&layout.feature_file(&DatasetKey::from("street_bins")), &empty)
            .expect("writes");
        write_json(&layout.feature_file(&DatasetKey::from("glass_igloos")), &empty)
            .expect("writes");
        write_json(&layout.table_file(&DatasetKey::from("waste_statistics")), &[1, 2])
            .expect("writes");
        fs::write(layout.processed_dir().join("broken.geojson"), b"{not json")
            .expect("writes");

        let loaded = load_feature_files(&layout.processed_dir());
        let keys: Vec<&str> = loaded.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["glass_igloos", "street_bins"]);
    }

    #[test]
    fn missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_feature_files(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn optional_json_distinguishes_missing_from_broken() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        let broken = dir.path().join("broken.json");
        fs::write(&broken, b"[").expect("writes");

        assert!(matches!(read_optional_json::<Vec<u8>>(&missing), Ok(None)));
        assert!(matches!(
            read_optional_json::<Vec<u8>>(&broken),
            Err(ArtifactError::Json { .. })
        ));
    }
}
