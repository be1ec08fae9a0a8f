//! Popup bodies, rendered through auto-escaping templates.

use askama::Template;
use poubelle_core::model::FlowNode;

/// One line of the statistics table.
pub struct StatRow {
    /// Category label.
    pub label: String,
    /// Legend color.
    pub color: String,
    /// Formatted tonnes per year.
    pub tonnes: String,
}

#[derive(Template)]
#[template(path = "popup_record.html")]
struct RecordPopup<'page> {
    name: &'page str,
    type_name: &'page str,
    address: &'page str,
    area: &'page str,
}

#[derive(Template)]
#[template(path = "popup_collection.html")]
struct CollectionPopup<'page> {
    name: &'page str,
    capacity: String,
}

#[derive(Template)]
#[template(path = "popup_treatment.html")]
struct TreatmentPopup<'page> {
    name: &'page str,
    treatment: &'page str,
}

#[derive(Template)]
#[template(path = "popup_stats.html")]
struct StatsPopup<'page> {
    title: &'page str,
    rows: &'page [StatRow],
    generated: &'page str,
}

/// Popup of a drop-off infrastructure record.
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn record(name: &str, type_name: &str, address: &str, area: &str) -> askama::Result<String> {
    RecordPopup {
        name,
        type_name,
        address,
        area,
    }
    .render()
}

/// Popup of a collection node.
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn collection(node: &FlowNode) -> askama::Result<String> {
    CollectionPopup {
        name: &node.name,
        capacity: node
            .daily_capacity_kg
            .map_or_else(|| "N/A".to_owned(), |kg| format!("{kg:.0}")),
    }
    .render()
}

/// Popup of a treatment facility.
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn treatment(name: &str, treatment: &str) -> askama::Result<String> {
    TreatmentPopup { name, treatment }.render()
}

/// Popup holding the annual tonnage table.
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn statistics(title: &str, rows: &[StatRow], generated: &str) -> askama::Result<String> {
    StatsPopup {
        title,
        rows,
        generated,
    }
    .render()
}
