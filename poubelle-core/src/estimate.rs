//! Research-based waste flow estimates.
//!
//! Everything here is pure: the figures depend only on [`EstimateConfig`],
//! never on fetched data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::WasteCategory;

/// Weeks per year used to spread annual tonnage.
pub const WEEKS_PER_YEAR: f64 = 52.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// How often a category is picked up.
pub struct CollectionSchedule {
    /// Human label, e.g. `daily` or `on_demand`.
    pub frequency: String,
    /// Pickups per week; may be fractional for on-demand services.
    pub days_per_week: f64,
}

impl CollectionSchedule {
    fn new(frequency: &str, days_per_week: f64) -> Self {
        Self {
            frequency: frequency.to_owned(),
            days_per_week,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Neighborhood used to size collection routes.
pub struct Neighborhood {
    /// Display name.
    pub name: String,
    /// Planning priority label.
    pub priority: String,
    /// Density label: `high`, `medium` or `low`.
    pub density: String,
}

impl Neighborhood {
    fn new(name: &str, priority: &str, density: &str) -> Self {
        Self {
            name: name.to_owned(),
            priority: priority.to_owned(),
            density: density.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Treatment facility that receives one or more categories.
pub struct TreatmentFacility {
    /// Process type, e.g. `incineration`.
    pub facility_type: String,
    /// Site name.
    pub name: String,
    /// Yearly intake capacity in tonnes.
    pub capacity_tonnes_year: u32,
    /// Categories the facility accepts.
    pub serves: Vec<WasteCategory>,
    /// Road distance from the area in kilometres.
    pub distance_km: f64,
    /// Whether incineration recovers energy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_recovery: Option<bool>,
    /// Share of input recovered as material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Constants the estimates are derived from.
pub struct EstimateConfig {
    /// Resident population of the area.
    pub population: u32,
    /// Generation rates in kg per person per year.
    pub rates: BTreeMap<WasteCategory, f64>,
    /// Pickup schedules; categories without one get no daily flow.
    pub schedules: BTreeMap<WasteCategory, CollectionSchedule>,
    /// Truck emission factor in kg CO2 per tonne-kilometre.
    pub emission_factor: f64,
    /// Neighborhoods collection routes are estimated for.
    pub neighborhoods: Vec<Neighborhood>,
    /// Categories each collection route handles.
    pub route_waste_types: Vec<WasteCategory>,
    /// Facilities treatment flows are matched against.
    pub facilities: Vec<TreatmentFacility>,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        let rates = BTreeMap::from([
            (WasteCategory::HouseholdWaste, 254.0),
            (WasteCategory::Recyclables, 85.0),
            (WasteCategory::Glass, 38.0),
            (WasteCategory::OrganicWaste, 45.0),
            (WasteCategory::BulkyWaste, 25.0),
            (WasteCategory::ElectronicWaste, 12.0),
        ]);

        let schedules = BTreeMap::from([
            (
                WasteCategory::HouseholdWaste,
                CollectionSchedule::new("daily", 6.0),
            ),
            (
                WasteCategory::Recyclables,
                CollectionSchedule::new("weekly", 1.0),
            ),
            (
                WasteCategory::Glass,
                CollectionSchedule::new("on_demand", 0.5),
            ),
            (
                WasteCategory::OrganicWaste,
                CollectionSchedule::new("twice_weekly", 2.0),
            ),
            (
                WasteCategory::BulkyWaste,
                CollectionSchedule::new("on_demand", 0.2),
            ),
        ]);

        let neighborhoods = vec![
            Neighborhood::new("Montparnasse", "high", "high"),
            Neighborhood::new("Plaisance", "medium", "medium"),
            Neighborhood::new("Petit-Montrouge", "medium", "medium"),
            Neighborhood::new("Parc Montsouris", "low", "low"),
        ];

        let facilities = vec![
            TreatmentFacility {
                facility_type: "incineration".to_owned(),
                name: "Issy-les-Moulineaux".to_owned(),
                capacity_tonnes_year: 700_000,
                serves: vec![WasteCategory::HouseholdWaste],
                distance_km: 8.0,
                energy_recovery: Some(true),
                recovery_rate: None,
            },
            TreatmentFacility {
                facility_type: "recycling_center".to_owned(),
                name: "Centre de tri Nanterre".to_owned(),
                capacity_tonnes_year: 50_000,
                serves: vec![WasteCategory::Recyclables],
                distance_km: 15.0,
                energy_recovery: None,
                recovery_rate: Some(0.85),
            },
            TreatmentFacility {
                facility_type: "glass_processing".to_owned(),
                name: "Verrerie Brosse".to_owned(),
                capacity_tonnes_year: 20_000,
                serves: vec![WasteCategory::Glass],
                distance_km: 25.0,
                energy_recovery: None,
                recovery_rate: Some(0.95),
            },
            TreatmentFacility {
                facility_type: "composting".to_owned(),
                name: "Plateforme compostage Gennevilliers".to_owned(),
                capacity_tonnes_year: 15_000,
                serves: vec![WasteCategory::OrganicWaste],
                distance_km: 18.0,
                energy_recovery: None,
                recovery_rate: Some(0.75),
            },
        ];

        Self {
            population: 140_000,
            rates,
            schedules,
            emission_factor: 0.8,
            neighborhoods,
            route_waste_types: vec![WasteCategory::HouseholdWaste, WasteCategory::Recyclables],
            facilities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Estimated collection round in one neighborhood.
pub struct CollectionRoute {
    /// Route identifier, `R{area}_{n}`.
    pub route_id: String,
    /// Neighborhood served.
    pub neighborhood: String,
    /// Number of stops.
    pub estimated_stops: u32,
    /// Round duration in hours.
    pub estimated_duration_hours: f64,
    /// Categories picked up on the round.
    pub waste_types: Vec<WasteCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Collection side of the estimate.
pub struct CollectionFlows {
    /// Tonnes per pickup day for each scheduled category.
    pub daily_flows: BTreeMap<WasteCategory, f64>,
    /// Schedules the daily flows were derived from.
    pub collection_schedule: BTreeMap<WasteCategory, CollectionSchedule>,
    /// Estimated rounds.
    pub collection_routes: Vec<CollectionRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Annual flow of one category into one facility.
pub struct TreatmentFlow {
    /// Tonnes per year.
    pub tonnage: f64,
    /// Facility name.
    pub facility: String,
    /// Distance in kilometres.
    pub distance: f64,
    /// Transport emissions in kg CO2.
    pub transport_emissions_kg_co2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Full estimate structure persisted by the enricher.
pub struct FlowEstimate {
    /// Population the figures are based on.
    pub population: u32,
    /// Tonnes per year per category.
    pub annual_tonnage: BTreeMap<WasteCategory, f64>,
    /// Collection flows and routes.
    pub collection_flows: CollectionFlows,
    /// Treatment flows keyed `{category}_to_{facility_type}`.
    pub treatment_flows: BTreeMap<String, TreatmentFlow>,
    /// When the estimate was computed.
    pub generated_at: DateTime<Utc>,
}

/// Annual tonnage produced by `population` at `rate_kg_per_person` kg per person per year.
#[must_use]
pub fn annual_tonnage(population: u32, rate_kg_per_person: f64) -> f64 {
    f64::from(population) * rate_kg_per_person / 1000.0
}

/// Tonnes collected per pickup day; zero when nothing is scheduled.
#[must_use]
pub fn daily_flow(annual_tonnes: f64, days_per_week: f64) -> f64 {
    if days_per_week > 0.0 {
        annual_tonnes / WEEKS_PER_YEAR / days_per_week
    } else {
        0.0
    }
}

/// Collection stops for a neighborhood of the given density.
#[must_use]
pub fn stops_for_density(density: &str) -> u32 {
    match density {
        "high" => 150,
        "medium" => 100,
        "low" => 50,
        _ => 75,
    }
}

/// Round duration in hours for a neighborhood of the given density.
#[must_use]
pub fn duration_for_density(density: &str) -> f64 {
    match density {
        "high" => 8.0,
        "medium" => 6.0,
        "low" => 4.0,
        _ => 6.0,
    }
}

/// Transport emissions in kg CO2 for moving `tonnage` over `distance_km`.
#[must_use]
pub fn transport_emissions(tonnage: f64, distance_km: f64, emission_factor: f64) -> f64 {
    tonnage * distance_km * emission_factor
}

/// Annual tonnage for every category with a configured rate.
#[must_use]
pub fn annual_tonnages(config: &EstimateConfig) -> BTreeMap<WasteCategory, f64> {
    config
        .rates
        .iter()
        .map(|(category, rate)| (*category, annual_tonnage(config.population, *rate)))
        .collect()
}

/// Daily flows for every category that has both a tonnage and a schedule.
#[must_use]
pub fn daily_flows(
    annual: &BTreeMap<WasteCategory, f64>,
    schedules: &BTreeMap<WasteCategory, CollectionSchedule>,
) -> BTreeMap<WasteCategory, f64> {
    annual
        .iter()
        .filter_map(|(category, tonnes)| {
            schedules
                .get(category)
                .map(|schedule| (*category, daily_flow(*tonnes, schedule.days_per_week)))
        })
        .collect()
}

/// One route per configured neighborhood, numbered from 1.
#[must_use]
pub fn collection_routes(config: &EstimateConfig, area: &str) -> Vec<CollectionRoute> {
    config
        .neighborhoods
        .iter()
        .zip(1_usize..)
        .map(|(neighborhood, number)| CollectionRoute {
            route_id: format!("R{area}_{number}"),
            neighborhood: neighborhood.name.clone(),
            estimated_stops: stops_for_density(&neighborhood.density),
            estimated_duration_hours: duration_for_density(&neighborhood.density),
            waste_types: config.route_waste_types.clone(),
        })
        .collect()
}

/// Match every category against the facilities that accept it.
#[must_use]
pub fn treatment_flows(
    annual: &BTreeMap<WasteCategory, f64>,
    config: &EstimateConfig,
) -> BTreeMap<String, TreatmentFlow> {
    let mut flows = BTreeMap::new();

    for (category, tonnage) in annual {
        for facility in config
            .facilities
            .iter()
            .filter(|facility| facility.serves.contains(category))
        {
            flows.insert(
                format!("{category}_to_{}", facility.facility_type),
                TreatmentFlow {
                    tonnage: *tonnage,
                    facility: facility.name.clone(),
                    distance: facility.distance_km,
                    transport_emissions_kg_co2: transport_emissions(
                        *tonnage,
                        facility.distance_km,
                        config.emission_factor,
                    ),
                },
            );
        }
    }

    flows
}

/// Compute the complete estimate for `area`.
#[must_use]
pub fn estimate_waste_flows(config: &EstimateConfig, area: &str) -> FlowEstimate {
    let annual = annual_tonnages(config);

    let collection_flows = CollectionFlows {
        daily_flows: daily_flows(&annual, &config.schedules),
        collection_schedule: config.schedules.clone(),
        collection_routes: collection_routes(config, area),
    };
    let treatment_flows = treatment_flows(&annual, config);

    FlowEstimate {
        population: config.population,
        annual_tonnage: annual,
        collection_flows,
        treatment_flows,
        generated_at: Utc::now(),
    }
}
