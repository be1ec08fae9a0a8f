//! Map page rendering and the visualization stage.

use std::fs;
use std::path::{Path, PathBuf};

use askama::Template;
use poubelle_core::config::MapConfig;
use poubelle_core::store::{ArtifactError, DataLayout, ensure_dir};
use tracing::info;

use crate::data::MapData;
use crate::layers::{LeafletMap, build_map};

#[derive(thiserror::Error, Debug)]
/// Errors raised while drawing or saving a map.
pub enum MapError {
    /// A template failed to render.
    #[error("template error: {0}")]
    Render(#[from] askama::Error),
    /// The map model could not be serialized.
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    /// The page could not be written.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Template)]
#[template(path = "map.html")]
struct MapPage<'page> {
    title: &'page str,
    document: String,
}

/// Render `map` as a self-contained HTML page.
///
/// # Errors
///
/// Returns a [`MapError`] if encoding or templating fails.
pub fn render(map: &LeafletMap) -> Result<String, MapError> {
    // Popups carry markup; keep `</script>` inside them from closing the page script.
    let document = serde_json::to_string(map)?.replace("</", "<\\/");
    Ok(MapPage {
        title: &map.title,
        document,
    }
    .render()?)
}

/// Render `map` into `dir/file`, creating `dir` if needed.
///
/// # Errors
///
/// Returns a [`MapError`] if rendering or writing fails.
pub fn save(map: &LeafletMap, dir: &Path, file: &str) -> Result<PathBuf, MapError> {
    let html = render(map)?;
    ensure_dir(dir)?;
    let path = dir.join(file);
    fs::write(&path, html).map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "map saved");
    Ok(path)
}

/// Visualization stage: loads artifacts and draws the map.
pub struct Visualizer<'cfg> {
    config: &'cfg MapConfig,
    layout: DataLayout,
    default_capacity_kg: f64,
}

impl<'cfg> Visualizer<'cfg> {
    /// Create a visualizer reading from and writing to `layout`.
    #[must_use]
    pub fn new(config: &'cfg MapConfig, layout: DataLayout, default_capacity_kg: f64) -> Self {
        Self {
            config,
            layout,
            default_capacity_kg,
        }
    }

    /// Build the map for `area`; `None` when no artifact is available.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Render`] if a popup template fails.
    pub fn create_map(&self, area: &str) -> Result<Option<LeafletMap>, MapError> {
        let data = MapData::load(&self.layout);
        build_map(&data, self.config, area, self.default_capacity_kg)
    }

    /// Write `map` to the configured output file.
    ///
    /// # Errors
    ///
    /// Returns a [`MapError`] if rendering or writing fails.
    pub fn save(&self, map: &LeafletMap) -> Result<PathBuf, MapError> {
        save(map, self.layout.output_dir(), &self.config.output_file)
    }
}
