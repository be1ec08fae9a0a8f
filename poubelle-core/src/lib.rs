//! Core types and pipeline stages for the poubelle waste-flow map.

/// Configuration shared by all stages.
pub mod config;
/// Enricher stage.
pub mod enrich;
/// Pure flow estimation.
pub mod estimate;
/// Fetcher stage.
pub mod fetch;
/// Domain models and identifiers shared by all crates.
pub mod model;
/// Flow network construction.
pub mod network;
/// Traits describing the dataset provider interface.
pub mod ports;
/// Registry of known datasets.
pub mod registry;
/// On-disk layout and artifact helpers.
pub mod store;

pub use config::*;
pub use model::*;
pub use ports::*;
pub use registry::*;
