//! Aggregation of resolved statuses for listings, summaries and the AI context.
//!
//! Everything here reads a status mapping produced by
//! [`resolve_all`](crate::flood::resolve_all) and never changes it. Areas that
//! are missing from the mapping read as [`CalculatedFloodStatus::default`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::areas::AreaTable;
use crate::model::{AreaStatusView, CalculatedFloodStatus, FloodStatus};

/// Sentence used when no area is at BANJIR or SIAGA.
const ALL_CLEAR_CONTEXT: &str =
    "Situasi di Jakarta Timur terpantau AMAN secara umum, namun tetap waspada.";

/// Number of areas at each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub banjir: usize,
    pub siaga: usize,
    pub waspada: usize,
    pub aman: usize,
}

impl StatusCounts {
    /// Count the resolved entries of a status mapping.
    pub fn from_statuses(statuses: &HashMap<String, CalculatedFloodStatus>) -> Self {
        let mut counts = Self::default();
        for s in statuses.values() {
            match s.status {
                FloodStatus::Banjir => counts.banjir += 1,
                FloodStatus::Siaga => counts.siaga += 1,
                FloodStatus::Waspada => counts.waspada += 1,
                FloodStatus::Aman => counts.aman += 1,
            }
        }
        counts
    }
}

/// Response for GET /status/summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    /// When the statuses were computed; absent before the first cycle.
    pub computed_at: Option<DateTime<Utc>>,

    /// Number of areas in the dataset.
    pub total_areas: usize,

    pub counts: StatusCounts,

    /// The sentence handed to the chat assistant.
    pub context: String,
}

impl StatusSummary {
    pub fn new(
        table: &AreaTable,
        statuses: &HashMap<String, CalculatedFloodStatus>,
        computed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            computed_at,
            total_areas: table.len(),
            counts: StatusCounts::from_statuses(statuses),
            context: status_context(table, statuses),
        }
    }
}

/// Status of one area, defaulting to safe when it has not been resolved.
pub fn status_of(
    statuses: &HashMap<String, CalculatedFloodStatus>,
    name: &str,
) -> CalculatedFloodStatus {
    statuses.get(name).copied().unwrap_or_default()
}

/// One-sentence situation summary for the chat assistant.
///
/// Lists areas at BANJIR if there are any, otherwise areas at SIAGA, in
/// dataset order.
pub fn status_context(
    table: &AreaTable,
    statuses: &HashMap<String, CalculatedFloodStatus>,
) -> String {
    let names_at = |level: FloodStatus| -> Vec<&str> {
        table
            .iter()
            .filter(|(_, area)| statuses.get(&area.name).is_some_and(|s| s.status == level))
            .map(|(_, area)| area.name.as_str())
            .collect()
    };

    let banjir = names_at(FloodStatus::Banjir);
    if !banjir.is_empty() {
        return format!("Saat ini sedang BANJIR di: {}.", banjir.join(", "));
    }

    let siaga = names_at(FloodStatus::Siaga);
    if !siaga.is_empty() {
        return format!("Saat ini status SIAGA di: {}.", siaga.join(", "));
    }

    ALL_CLEAR_CONTEXT.to_string()
}

/// Areas with their statuses, filtered and sorted most severe first.
///
/// Areas at the same level keep dataset order.
pub fn list_areas(
    table: &AreaTable,
    statuses: &HashMap<String, CalculatedFloodStatus>,
    district: Option<&str>,
    status: Option<FloodStatus>,
) -> Vec<AreaStatusView> {
    let mut views: Vec<AreaStatusView> = table
        .iter()
        .filter(|(_, area)| district.is_none_or(|d| area.district.eq_ignore_ascii_case(d)))
        .map(|(_, area)| AreaStatusView {
            name: area.name.clone(),
            district: area.district.clone(),
            base_risk: area.rule.base_risk,
            duration_threshold: area.rule.duration_threshold,
            dependency: area.rule.dependency.clone(),
            location: area.location,
            status: status_of(statuses, &area.name),
        })
        .filter(|view| status.is_none_or(|s| view.status.status == s))
        .collect();

    views.sort_by_key(|view| view.status.status.priority());
    views
}
