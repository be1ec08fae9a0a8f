//! Visualizer stage: turns pipeline artifacts into an interactive Leaflet map.

/// Artifact loading.
pub mod data;
/// Map model and layer builders.
pub mod layers;
/// Popup templates.
pub mod popup;
/// Page rendering and the [`Visualizer`](render::Visualizer).
pub mod render;

pub use data::MapData;
pub use layers::{LeafletMap, Overlay, build_map};
pub use render::{MapError, Visualizer};
