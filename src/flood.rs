//! Flood status determination.
//!
//! Three pieces, all pure and synchronous:
//!
//! 1. [`rain_duration`]: consecutive rainy hours ending at the current hour.
//! 2. [`evaluate_status`]: the per-area rule, optionally gated on another
//!    area's status.
//! 3. [`resolve_all`]: the two-pass driver over every area in an [`AreaTable`].
//!
//! # Dependency resolution
//!
//! Pass 1 evaluates every area with no dependency status, so any area whose
//! rule names a dependency can only reach WASPADA or AMAN. Pass 2 re-evaluates
//! just those areas against their dependency's pass-1 status. A dependency that
//! itself depends on a third area is read at its pass-1 value; chains deeper
//! than one hop are not resolved.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Timelike};

use crate::areas::{AreaTable, DependencyRef};
use crate::model::{CalculatedFloodStatus, FloodRule, FloodStatus, HourlySeries};

/// Hourly precipitation (mm) at or above which an hour counts as raining.
pub const RAIN_THRESHOLD_MM: f64 = 0.5;

/// Count consecutive rainy hours ending at `reference_index`, scanning backward.
///
/// Returns 0 when the reference hour itself is dry. An out-of-range index is
/// treated as index 0.
pub fn rain_duration(precipitation: &[f64], reference_index: usize) -> u32 {
    if precipitation.is_empty() {
        return 0;
    }
    let start = clamp_index(precipitation, reference_index);

    precipitation[..=start]
        .iter()
        .rev()
        .take_while(|&&mm| mm >= RAIN_THRESHOLD_MM)
        .count() as u32
}

/// Whether the hour at `reference_index` has measurable rain.
pub fn is_raining_at(precipitation: &[f64], reference_index: usize) -> bool {
    if precipitation.is_empty() {
        return false;
    }
    precipitation[clamp_index(precipitation, reference_index)] >= RAIN_THRESHOLD_MM
}

fn clamp_index(precipitation: &[f64], index: usize) -> usize {
    if index < precipitation.len() { index } else { 0 }
}

/// Index of the series entry for the hour containing `now`.
///
/// Falls back to index 0 when no entry matches.
pub fn current_hour_index(times: &[NaiveDateTime], now: NaiveDateTime) -> usize {
    let hour = truncate_to_hour(now);
    times
        .iter()
        .position(|t| truncate_to_hour(*t) == hour)
        .unwrap_or(0)
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_hms_opt(t.hour(), 0, 0).unwrap_or(t)
}

/// Evaluate one area's rule.
///
/// `dependency_status` is the status of the area named by `rule.dependency`,
/// or `None` when it is not known (pass 1, or an unknown name). It is ignored
/// when the rule has no dependency.
///
/// # Rules
///
/// - not raining: AMAN, whatever the duration
/// - dependency set and not at BANJIR: WASPADA
/// - `duration >= threshold`: BANJIR
/// - `threshold - 1 <= duration < threshold`: SIAGA
/// - otherwise: WASPADA
pub fn evaluate_status(
    duration: u32,
    is_raining_now: bool,
    rule: &FloodRule,
    dependency_status: Option<FloodStatus>,
) -> FloodStatus {
    if !is_raining_now {
        return FloodStatus::Aman;
    }

    if rule.dependency.is_some() && dependency_status != Some(FloodStatus::Banjir) {
        return FloodStatus::Waspada;
    }

    let duration = f64::from(duration);
    let threshold = rule.duration_threshold;

    if duration >= threshold {
        FloodStatus::Banjir
    } else if duration >= threshold - 1.0 {
        FloodStatus::Siaga
    } else {
        FloodStatus::Waspada
    }
}

/// Rain duration and raining flag for one district at the reference hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RainReading {
    pub duration: u32,
    pub is_raining_now: bool,
}

impl RainReading {
    /// Read a district series at the hour containing `now`.
    pub fn from_series(series: &HourlySeries, now: NaiveDateTime) -> Self {
        let index = current_hour_index(&series.time, now);
        Self {
            duration: rain_duration(&series.precipitation, index),
            is_raining_now: is_raining_at(&series.precipitation, index),
        }
    }
}

/// Resolve the status of every area in `table`.
///
/// `series_by_district` maps district name to its hourly series; areas whose
/// district has no series read as dry. `now` is the local wall-clock time used
/// to pick the current hour.
pub fn resolve_all(
    table: &AreaTable,
    series_by_district: &HashMap<String, HourlySeries>,
    now: NaiveDateTime,
) -> HashMap<String, CalculatedFloodStatus> {
    let readings: HashMap<&str, RainReading> = table
        .districts()
        .iter()
        .map(|district| {
            let reading = series_by_district
                .get(district)
                .map(|series| RainReading::from_series(series, now))
                .unwrap_or_default();
            (district.as_str(), reading)
        })
        .collect();

    // Pass 1: provisional statuses, dependencies unknown.
    let provisional: Vec<CalculatedFloodStatus> = table
        .iter()
        .map(|(_, area)| {
            let reading = readings
                .get(area.district.as_str())
                .copied()
                .unwrap_or_default();
            CalculatedFloodStatus {
                status: evaluate_status(
                    reading.duration,
                    reading.is_raining_now,
                    &area.rule,
                    None,
                ),
                current_rain_duration: reading.duration,
                is_raining_now: reading.is_raining_now,
                dependency_met: true,
            }
        })
        .collect();

    // Pass 2: gated areas against their dependency's pass-1 status.
    table
        .iter()
        .zip(&provisional)
        .map(|((id, area), first)| {
            let resolved = match table.dependency(id) {
                None => *first,
                Some(dependency) => {
                    let dependency_status = match dependency {
                        DependencyRef::Area(dep) => Some(provisional[dep.index()].status),
                        DependencyRef::Unknown => None,
                    };
                    CalculatedFloodStatus {
                        status: evaluate_status(
                            first.current_rain_duration,
                            first.is_raining_now,
                            &area.rule,
                            dependency_status,
                        ),
                        dependency_met: dependency_status == Some(FloodStatus::Banjir),
                        ..*first
                    }
                }
            };
            (area.name.clone(), resolved)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Area, Location, RiskLevel};
    use chrono::NaiveDate;

    fn rule(threshold: f64, dependency: Option<&str>) -> FloodRule {
        FloodRule {
            duration_threshold: threshold,
            dependency: dependency.map(str::to_string),
            base_risk: RiskLevel::Sedang,
        }
    }

    fn area(name: &str, district: &str, threshold: f64, dependency: Option<&str>) -> Area {
        Area {
            name: name.to_string(),
            district: district.to_string(),
            rule: rule(threshold, dependency),
            location: Location { lat: -6.2, lon: 106.9 },
        }
    }

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    /// A series starting at 00:00 with one value per hour.
    fn series(precipitation: &[f64]) -> HourlySeries {
        HourlySeries {
            time: (0..precipitation.len() as u32).map(at).collect(),
            precipitation: precipitation.to_vec(),
        }
    }

    // ------------------------------------------------------------------
    // rain_duration
    // ------------------------------------------------------------------

    #[test]
    fn test_duration_monotonic_run() {
        let precip = [0.0, 1.0, 1.0, 1.0];
        assert_eq!(rain_duration(&precip, 3), 3);
        assert_eq!(rain_duration(&precip, 0), 0);
    }

    #[test]
    fn test_duration_zero_when_current_hour_dry() {
        let precip = [5.0, 5.0, 5.0, 0.4];
        assert_eq!(rain_duration(&precip, 3), 0);
    }

    #[test]
    fn test_duration_all_rain_to_series_start() {
        let precip = [0.5, 2.0, 0.7, 3.1, 0.0];
        assert_eq!(rain_duration(&precip, 3), 4);
    }

    #[test]
    fn test_duration_ignores_later_hours() {
        let a = [0.0, 1.0, 1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 1.0, 9.0, 9.0];
        assert_eq!(rain_duration(&a, 2), rain_duration(&b, 2));
    }

    #[test]
    fn test_duration_threshold_is_inclusive() {
        assert_eq!(rain_duration(&[0.49, 0.5], 1), 1);
    }

    #[test]
    fn test_duration_out_of_range_uses_first_hour() {
        assert_eq!(rain_duration(&[1.0, 0.0], 10), 1);
        assert_eq!(rain_duration(&[], 0), 0);
    }

    #[test]
    fn test_raining_flag() {
        let precip = [0.0, 0.6];
        assert!(!is_raining_at(&precip, 0));
        assert!(is_raining_at(&precip, 1));
        assert!(!is_raining_at(&[], 0));
    }

    // ------------------------------------------------------------------
    // current_hour_index
    // ------------------------------------------------------------------

    #[test]
    fn test_current_hour_matches_within_hour() {
        let times: Vec<_> = (0..24).map(at).collect();
        let now = at(13) + chrono::Duration::minutes(42);
        assert_eq!(current_hour_index(&times, now), 13);
    }

    #[test]
    fn test_current_hour_falls_back_to_first() {
        let times: Vec<_> = (0..24).map(at).collect();
        let tomorrow = at(5) + chrono::Duration::days(1);
        assert_eq!(current_hour_index(&times, tomorrow), 0);
        assert_eq!(current_hour_index(&[], at(5)), 0);
    }

    // ------------------------------------------------------------------
    // evaluate_status
    // ------------------------------------------------------------------

    #[test]
    fn test_rain_stopped_resets_to_aman() {
        assert_eq!(evaluate_status(5, false, &rule(2.0, None), None), FloodStatus::Aman);
        assert_eq!(
            evaluate_status(5, false, &rule(2.0, Some("Y")), Some(FloodStatus::Banjir)),
            FloodStatus::Aman
        );
    }

    #[test]
    fn test_threshold_boundaries() {
        let r = rule(2.0, None);
        assert_eq!(evaluate_status(2, true, &r, None), FloodStatus::Banjir);
        assert_eq!(evaluate_status(1, true, &r, None), FloodStatus::Siaga);
        assert_eq!(evaluate_status(0, true, &r, None), FloodStatus::Waspada);
    }

    #[test]
    fn test_fractional_threshold() {
        let r = rule(1.5, None);
        assert_eq!(evaluate_status(2, true, &r, None), FloodStatus::Banjir);
        assert_eq!(evaluate_status(1, true, &r, None), FloodStatus::Siaga);
        assert_eq!(evaluate_status(0, true, &r, None), FloodStatus::Waspada);
    }

    #[test]
    fn test_dependency_gate() {
        let r = rule(1.0, Some("Y"));
        assert_eq!(evaluate_status(5, true, &r, None), FloodStatus::Waspada);
        assert_eq!(
            evaluate_status(5, true, &r, Some(FloodStatus::Siaga)),
            FloodStatus::Waspada
        );
        assert_eq!(
            evaluate_status(5, true, &r, Some(FloodStatus::Banjir)),
            FloodStatus::Banjir
        );
    }

    #[test]
    fn test_dependency_status_ignored_without_dependency() {
        let r = rule(2.0, None);
        assert_eq!(
            evaluate_status(2, true, &r, Some(FloodStatus::Aman)),
            FloodStatus::Banjir
        );
    }

    // ------------------------------------------------------------------
    // resolve_all
    // ------------------------------------------------------------------

    fn districts(entries: Vec<(&str, Vec<f64>)>) -> HashMap<String, HourlySeries> {
        entries
            .into_iter()
            .map(|(d, p)| (d.to_string(), series(&p)))
            .collect()
    }

    #[test]
    fn test_gate_blocks_escalation() {
        let table = AreaTable::new(vec![
            area("X", "Wet", 1.0, Some("Y")),
            area("Y", "Dry", 1.0, None),
        ])
        .unwrap();
        let data = districts(vec![("Wet", vec![1.0; 6]), ("Dry", vec![0.0; 6])]);

        let statuses = resolve_all(&table, &data, at(5));

        let x = statuses["X"];
        assert_eq!(x.current_rain_duration, 6);
        assert_eq!(x.status, FloodStatus::Waspada);
        assert!(!x.dependency_met);
        assert_eq!(statuses["Y"].status, FloodStatus::Aman);
    }

    #[test]
    fn test_satisfied_dependency_allows_escalation() {
        let table = AreaTable::new(vec![
            area("X", "Wet", 1.0, Some("Y")),
            area("Y", "Wet", 1.0, None),
        ])
        .unwrap();
        let data = districts(vec![("Wet", vec![1.0; 6])]);

        let statuses = resolve_all(&table, &data, at(4));

        assert_eq!(statuses["Y"].status, FloodStatus::Banjir);
        assert_eq!(statuses["X"].status, FloodStatus::Banjir);
        assert!(statuses["X"].dependency_met);
    }

    #[test]
    fn test_unknown_dependency_caps_at_waspada() {
        let table = AreaTable::new(vec![area("X", "Wet", 1.0, Some("Ghost"))]).unwrap();
        let data = districts(vec![("Wet", vec![3.0; 4])]);

        let statuses = resolve_all(&table, &data, at(3));

        assert_eq!(statuses["X"].status, FloodStatus::Waspada);
        assert!(!statuses["X"].dependency_met);
    }

    #[test]
    fn test_missing_district_reads_dry() {
        let table = AreaTable::new(vec![area("X", "Offline", 1.0, None)]).unwrap();

        let statuses = resolve_all(&table, &HashMap::new(), at(3));

        assert_eq!(statuses["X"], CalculatedFloodStatus::default());
    }

    #[test]
    fn test_end_to_end_single_hop() {
        // B's district is raining for one hour only; A's for two.
        let table = AreaTable::new(vec![
            area("A", "North", 2.0, None),
            area("B", "South", 1.0, Some("A")),
        ])
        .unwrap();

        let data = districts(vec![("North", vec![0.0, 1.0, 1.0]), ("South", vec![0.0, 0.0, 1.0])]);
        let statuses = resolve_all(&table, &data, at(2));
        assert_eq!(statuses["A"].status, FloodStatus::Banjir);
        assert_eq!(statuses["B"].status, FloodStatus::Banjir);
        assert!(statuses["B"].dependency_met);

        // Same, but B's current hour is the first rainy one of a long
        // threshold: dependency satisfied, local threshold not yet met.
        let table = AreaTable::new(vec![
            area("A", "North", 2.0, None),
            area("B", "South", 3.0, Some("A")),
        ])
        .unwrap();
        let statuses = resolve_all(&table, &data, at(2));
        assert_eq!(statuses["B"].status, FloodStatus::Waspada);
        assert!(statuses["B"].dependency_met);
    }

    #[test]
    fn test_two_hop_chain_reads_pass_one_value() {
        // C -> B -> A, all flooding locally. B only reaches BANJIR in pass 2,
        // so C still sees B's provisional WASPADA.
        let table = AreaTable::new(vec![
            area("A", "Wet", 1.0, None),
            area("B", "Wet", 1.0, Some("A")),
            area("C", "Wet", 1.0, Some("B")),
        ])
        .unwrap();
        let data = districts(vec![("Wet", vec![2.0; 3])]);

        let statuses = resolve_all(&table, &data, at(2));

        assert_eq!(statuses["A"].status, FloodStatus::Banjir);
        assert_eq!(statuses["B"].status, FloodStatus::Banjir);
        assert_eq!(statuses["C"].status, FloodStatus::Waspada);
        assert!(!statuses["C"].dependency_met);
    }

    #[test]
    fn test_result_independent_of_dataset_order() {
        let forward = AreaTable::new(vec![
            area("A", "Wet", 1.0, None),
            area("B", "Wet", 1.0, Some("A")),
        ])
        .unwrap();
        let reversed = AreaTable::new(vec![
            area("B", "Wet", 1.0, Some("A")),
            area("A", "Wet", 1.0, None),
        ])
        .unwrap();
        let data = districts(vec![("Wet", vec![2.0; 3])]);

        assert_eq!(
            resolve_all(&forward, &data, at(2)),
            resolve_all(&reversed, &data, at(2))
        );
    }

    #[test]
    fn test_areas_share_district_series() {
        let table = AreaTable::new(vec![
            area("A", "Wet", 3.0, None),
            area("B", "Wet", 1.0, None),
        ])
        .unwrap();
        let data = districts(vec![("Wet", vec![0.0, 1.0, 1.0])]);

        let statuses = resolve_all(&table, &data, at(2));

        assert_eq!(statuses["A"].current_rain_duration, 2);
        assert_eq!(statuses["B"].current_rain_duration, 2);
        assert_eq!(statuses["A"].status, FloodStatus::Siaga);
        assert_eq!(statuses["B"].status, FloodStatus::Banjir);
    }
}
