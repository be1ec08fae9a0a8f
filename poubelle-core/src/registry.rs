//! Registry of the remote datasets the fetcher knows about.

use serde::{Deserialize, Serialize};

use crate::model::{DatasetId, DatasetKey};
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Whether a dataset is narrowed to the requested area.
pub enum FetchScope {
    /// Query with the area filter, falling back to the whole city when it matches nothing.
    Area,
    /// Context dataset, always queried for the whole city.
    City,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A dataset on the remote portal and how to query it.
pub struct DatasetSource {
    /// Local key.
    pub key: DatasetKey,
    /// Remote identifier.
    pub id: DatasetId,
    /// Area or city scope.
    pub scope: FetchScope,
    /// Fetched before the non-priority sources.
    #[serde(default)]
    pub priority: bool,
}

impl DatasetSource {
    /// Area-scoped source.
    #[must_use]
    pub fn area(key: &str, id: &str) -> Self {
        Self {
            key: DatasetKey::from(key),
            id: DatasetId(id.to_owned()),
            scope: FetchScope::Area,
            priority: false,
        }
    }

    /// City-scoped source.
    #[must_use]
    pub fn city(key: &str, id: &str) -> Self {
        Self {
            scope: FetchScope::City,
            ..Self::area(key, id)
        }
    }

    /// Mark the source as fetched first.
    #[must_use]
    pub fn prioritized(self) -> Self {
        Self {
            priority: true,
            ..self
        }
    }
}

/// Registry that resolves dataset sources by key.
pub struct DatasetRegistry {
    sources: Vec<DatasetSource>,
}

impl DatasetRegistry {
    /// Build a registry from the provided source list; later duplicates of a key are ignored.
    #[must_use]
    pub fn new(sources: Vec<DatasetSource>) -> Self {
        let mut unique: Vec<DatasetSource> = Vec::with_capacity(sources.len());
        for source in sources {
            if unique.iter().all(|known| known.key != source.key) {
                unique.push(source);
            }
        }
        Self { sources: unique }
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sources in fetch order: priority sources first, otherwise registration order.
    pub fn fetch_order(&self) -> impl Iterator<Item = &DatasetSource> {
        let priority = self.sources.iter().filter(|source| source.priority);
        let rest = self.sources.iter().filter(|source| !source.priority);
        priority.chain(rest)
    }

    /// Look up a source by key.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnknownDataset`] when no source is registered under `key`.
    pub fn source(&self, key: &DatasetKey) -> Result<&DatasetSource, PortError> {
        self.sources
            .iter()
            .find(|source| &source.key == key)
            .ok_or_else(|| PortError::UnknownDataset(key.clone()))
    }
}

/// Waste-management datasets published on the Paris open data portal.
#[must_use]
pub fn paris_datasets() -> Vec<DatasetSource> {
    vec![
        // Drop-off infrastructure and context needed by the map come first.
        DatasetSource::area(
            "glass_igloos",
            "dechets-menagers-points-dapport-volontaire-colonnes-a-verre",
        )
        .prioritized(),
        DatasetSource::area(
            "trilib_stations",
            "dechets-menagers-points-dapport-volontaire-stations-trilib",
        )
        .prioritized(),
        DatasetSource::area(
            "public_composters",
            "dechets-menagers-points-dapport-volontaire-composteurs",
        )
        .prioritized(),
        DatasetSource::area(
            "textile_containers",
            "dechets-menagers-points-dapport-volontaire-conteneur-textile",
        )
        .prioritized(),
        DatasetSource::area(
            "street_bins",
            "plan-de-voirie-mobiliers-urbains-jardinieres-bancs-corbeilles-de-rue",
        )
        .prioritized(),
        DatasetSource::city("arrondissement_boundaries", "arrondissements").prioritized(),
        DatasetSource::area(
            "waste_per_capita",
            "quantite-de-dechets-produits-et-tries-par-habitant-et-par-an",
        ),
        DatasetSource::area(
            "recycling_centers",
            "dechets-menagers-points-dapport-volontaire-recycleries-et-ressourceries",
        ),
        DatasetSource::area("citizen_reports", "dans-ma-rue"),
        DatasetSource::city("neighborhoods", "quartier_paris"),
        DatasetSource::city("road_network", "voie"),
        DatasetSource::city(
            "ghg_emissions",
            "inventaire-des-emissions-de-gaz-a-effet-de-serre-du-territoire",
        ),
        DatasetSource::area("waste_collection_points", "points-dapport-volontaire"),
        DatasetSource::area(
            "waste_treatment_facilities",
            "equipements-de-traitement-des-dechets",
        ),
        DatasetSource::area("waste_statistics", "tonnages-des-dechets-collectes"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_order_puts_priority_sources_first() {
        let registry = DatasetRegistry::new(vec![
            DatasetSource::area("a", "id-a"),
            DatasetSource::city("b", "id-b").prioritized(),
            DatasetSource::area("c", "id-c"),
            DatasetSource::area("d", "id-d").prioritized(),
        ]);

        let order: Vec<&str> = registry
            .fetch_order()
            .map(|source| source.key.as_str())
            .collect();
        assert_eq!(order, ["b", "d", "a", "c"]);
    }

    #[test]
    fn unknown_key_is_reported() {
        let registry = DatasetRegistry::new(paris_datasets());
        let missing = DatasetKey::from("parking_meters");

        assert!(
            matches!(registry.source(&missing), Err(PortError::UnknownDataset(key)) if key == missing),
            "lookup of an unregistered key must fail"
        );
    }

    #[test]
    fn paris_registry_has_every_source_once() {
        let registry = DatasetRegistry::new(paris_datasets());
        assert_eq!(registry.len(), 15);

        let boundaries = registry
            .source(&DatasetKey::from("arrondissement_boundaries"))
            .expect("boundaries registered");
        assert_eq!(boundaries.scope, FetchScope::City);
        assert!(boundaries.priority, "boundaries are fetched first");
    }
}
