//! The static area dataset and the interned lookup table built from it.
//!
//! Areas are loaded once at startup and never mutated. [`AreaTable`] assigns
//! each area an [`AreaId`] handle and resolves every rule dependency to a
//! handle up front, so status resolution never does string lookups.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::error::DatasetError;
use crate::model::{Area, FloodRule, Location, RiskLevel};

/// Handle to an area in an [`AreaTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaId(u32);

impl AreaId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a rule's dependency name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRef {
    /// The dependency names an area in the table.
    Area(AreaId),

    /// The dependency names an area that does not exist.
    Unknown,
}

/// Immutable table of monitored areas, in dataset order.
#[derive(Debug, Clone)]
pub struct AreaTable {
    areas: Vec<Area>,
    by_name: HashMap<String, AreaId>,
    dependencies: Vec<Option<DependencyRef>>,
    districts: Vec<String>,
}

impl AreaTable {
    /// Build a table, validating names and thresholds.
    ///
    /// Unknown dependency names are accepted and logged; the dependent area
    /// can then never reach BANJIR.
    pub fn new(areas: Vec<Area>) -> Result<Self, DatasetError> {
        if areas.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut by_name = HashMap::with_capacity(areas.len());
        let mut districts: Vec<String> = Vec::new();

        for (i, area) in areas.iter().enumerate() {
            let threshold = area.rule.duration_threshold;
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(DatasetError::InvalidThreshold {
                    name: area.name.clone(),
                    threshold,
                });
            }
            if by_name.insert(area.name.clone(), AreaId(i as u32)).is_some() {
                return Err(DatasetError::DuplicateArea(area.name.clone()));
            }
            if !districts.contains(&area.district) {
                districts.push(area.district.clone());
            }
        }

        let dependencies = areas
            .iter()
            .map(|area| {
                area.rule.dependency.as_deref().map(|dep| match by_name.get(dep) {
                    Some(id) => DependencyRef::Area(*id),
                    None => {
                        warn!(area = %area.name, dependency = %dep, "Unknown dependency area");
                        DependencyRef::Unknown
                    }
                })
            })
            .collect();

        Ok(Self {
            areas,
            by_name,
            dependencies,
            districts,
        })
    }

    /// Load a dataset from a JSON array of areas.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let raw = std::fs::read_to_string(path)?;
        let areas: Vec<Area> = serde_json::from_str(&raw)?;
        Self::new(areas)
    }

    /// The built-in East Jakarta dataset.
    pub fn east_jakarta() -> Result<Self, DatasetError> {
        Self::new(east_jakarta_areas())
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Iterate areas with their handles, in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = (AreaId, &Area)> {
        self.areas
            .iter()
            .enumerate()
            .map(|(i, area)| (AreaId(i as u32), area))
    }

    /// Get an area by handle, `None` for a handle from another table.
    pub fn get(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(id.index())
    }

    /// Look up an area handle by name.
    pub fn lookup(&self, name: &str) -> Option<AreaId> {
        self.by_name.get(name).copied()
    }

    /// Look up an area by name.
    pub fn area(&self, name: &str) -> Option<&Area> {
        self.lookup(name).and_then(|id| self.get(id))
    }

    /// The resolved dependency of an area, `None` when its rule has none.
    ///
    /// A handle from another table also reads as having no dependency.
    pub fn dependency(&self, id: AreaId) -> Option<DependencyRef> {
        self.dependencies.get(id.index()).copied().flatten()
    }

    /// Distinct districts in order of first appearance.
    pub fn districts(&self) -> &[String] {
        &self.districts
    }

    /// The first area of a district; its coordinates stand in for the district.
    pub fn district_representative(&self, district: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.district == district)
    }
}

fn kelurahan(
    district: &str,
    name: &str,
    hours: f64,
    base_risk: RiskLevel,
    lat: f64,
    lon: f64,
    dependency: Option<&str>,
) -> Area {
    Area {
        name: name.to_string(),
        district: district.to_string(),
        rule: FloodRule {
            duration_threshold: hours,
            dependency: dependency.map(str::to_string),
            base_risk,
        },
        location: Location { lat, lon },
    }
}

/// Kelurahan of East Jakarta with their local flood rules.
pub fn east_jakarta_areas() -> Vec<Area> {
    use RiskLevel::{Rendah, SangatTinggi, Sedang, Tinggi};

    vec![
        // Kecamatan Matraman
        kelurahan("Matraman", "Utan Kayu Utara", 2.0, Sedang, -6.1956, 106.8711, None),
        kelurahan("Matraman", "Utan Kayu Selatan", 2.0, Sedang, -6.1998, 106.8685, Some("Utan Kayu Utara")),
        kelurahan("Matraman", "Palmeriam", 1.5, Tinggi, -6.2055, 106.8580, None),
        kelurahan("Matraman", "Kebon Manggis", 1.5, Tinggi, -6.2120, 106.8550, None),
        kelurahan("Matraman", "Pisangan Baru", 2.0, Sedang, -6.2105, 106.8690, None),
        kelurahan("Matraman", "Kayu Manis", 1.5, Tinggi, -6.2030, 106.8620, None),

        // Kecamatan Pulo Gadung
        kelurahan("Pulo Gadung", "Kayu Putih", 2.5, Rendah, -6.1780, 106.8850, None),
        kelurahan("Pulo Gadung", "Rawamangun", 2.0, Sedang, -6.1945, 106.8860, None),
        kelurahan("Pulo Gadung", "Jati", 1.5, Tinggi, -6.1910, 106.8960, None),
        kelurahan("Pulo Gadung", "Pisangan Timur", 2.0, Sedang, -6.2100, 106.8850, None),
        kelurahan("Pulo Gadung", "Cipinang", 1.5, Tinggi, -6.2140, 106.8920, None),
        kelurahan("Pulo Gadung", "Rawasari", 2.0, Sedang, -6.1890, 106.8740, None),
        kelurahan("Pulo Gadung", "Pulogadung", 2.0, Sedang, -6.1850, 106.9050, None),

        // Kecamatan Cakung
        kelurahan("Cakung", "Cakung Barat", 2.0, Tinggi, -6.1700, 106.9400, None),
        kelurahan("Cakung", "Cakung Timur", 2.5, Tinggi, -6.1750, 106.9550, Some("Penggilingan")),
        kelurahan("Cakung", "Penggilingan", 1.5, Tinggi, -6.2050, 106.9350, None),
        kelurahan("Cakung", "Pulogebang", 3.0, Sedang, -6.2150, 106.9500, Some("Cakung Barat")),
        kelurahan("Cakung", "Ujung Menteng", 2.0, Sedang, -6.1780, 106.9650, None),
        kelurahan("Cakung", "Rawa Terate", 2.0, Tinggi, -6.1880, 106.9200, Some("Penggilingan")),
        kelurahan("Cakung", "Jatinegara Kaum", 2.0, Sedang, -6.1980, 106.9100, None),

        // Kecamatan Jatinegara
        kelurahan("Jatinegara", "Kampung Melayu", 1.0, SangatTinggi, -6.2260, 106.8640, None),
        kelurahan("Jatinegara", "Bali Mester", 2.0, Sedang, -6.2200, 106.8680, Some("Kampung Melayu")),
        kelurahan("Jatinegara", "Bidara Cina", 1.5, Tinggi, -6.2350, 106.8660, Some("Kampung Melayu")),
        kelurahan("Jatinegara", "Cipinang Cempedak", 2.0, Sedang, -6.2300, 106.8750, None),
        kelurahan("Jatinegara", "Cipinang Besar Utara", 1.0, Tinggi, -6.2250, 106.8850, None),
        kelurahan("Jatinegara", "Cipinang Besar Selatan", 1.0, Tinggi, -6.2350, 106.8880, Some("Cipinang Besar Utara")),
        kelurahan("Jatinegara", "Cipinang Muara", 1.5, Tinggi, -6.2280, 106.8980, None),
        kelurahan("Jatinegara", "Rawa Bunga", 2.0, Sedang, -6.2180, 106.8720, None),
        kelurahan("Jatinegara", "Cipinang Melayu", 1.0, SangatTinggi, -6.2450, 106.9050, None),

        // Kecamatan Duren Sawit
        kelurahan("Duren Sawit", "Duren Sawit", 2.0, Sedang, -6.2300, 106.9100, None),
        kelurahan("Duren Sawit", "Pondok Bambu", 2.0, Sedang, -6.2350, 106.9050, None),
        kelurahan("Duren Sawit", "Klender", 1.5, Tinggi, -6.2200, 106.9000, None),
        kelurahan("Duren Sawit", "Pondok Kopi", 1.5, Tinggi, -6.2250, 106.9400, Some("Cipinang Melayu")),
        kelurahan("Duren Sawit", "Malaka Jaya", 2.5, Rendah, -6.2280, 106.9300, None),
        kelurahan("Duren Sawit", "Malaka Sari", 2.0, Sedang, -6.2320, 106.9250, None),
        kelurahan("Duren Sawit", "Pondok Kelapa", 2.0, Sedang, -6.2450, 106.9350, None),

        // Kecamatan Kramat Jati
        kelurahan("Kramat Jati", "Cawang", 1.0, SangatTinggi, -6.2480, 106.8650, None),
        kelurahan("Kramat Jati", "Cililitan", 1.0, SangatTinggi, -6.2620, 106.8650, None),
        kelurahan("Kramat Jati", "Balekambang", 1.5, Tinggi, -6.2750, 106.8550, Some("Cawang")),
        kelurahan("Kramat Jati", "Batu Ampar", 2.0, Sedang, -6.2780, 106.8620, None),
        kelurahan("Kramat Jati", "Tengah", 2.0, Sedang, -6.2850, 106.8700, None),
        kelurahan("Kramat Jati", "Dukuh", 2.0, Sedang, -6.2900, 106.8800, None),
        kelurahan("Kramat Jati", "Kampung Tengah", 1.5, Tinggi, -6.2820, 106.8650, None),

        // Kecamatan Pasar Rebo
        kelurahan("Pasar Rebo", "Cijantung", 2.0, Sedang, -6.3150, 106.8580, None),
        kelurahan("Pasar Rebo", "Baru", 2.0, Sedang, -6.3200, 106.8500, None),
        kelurahan("Pasar Rebo", "Gedong", 1.5, Tinggi, -6.2950, 106.8600, None),
        kelurahan("Pasar Rebo", "Kalisari", 1.5, Tinggi, -6.3300, 106.8600, Some("Gedong")),
        kelurahan("Pasar Rebo", "Pekayon", 2.0, Sedang, -6.3250, 106.8680, None),

        // Kecamatan Makasar
        kelurahan("Makasar", "Makasar", 2.0, Sedang, -6.2800, 106.8850, None),
        kelurahan("Makasar", "Halim Perdana Kusuma", 2.0, Sedang, -6.2650, 106.8850, None),
        kelurahan("Makasar", "Cipinang Melayu (Mks)", 1.0, SangatTinggi, -6.2500, 106.8900, None),
        kelurahan("Makasar", "Kebon Pala", 1.5, Tinggi, -6.2550, 106.8750, Some("Cipinang Melayu")),

        // Kecamatan Ciracas
        kelurahan("Ciracas", "Ciracas", 2.0, Sedang, -6.3350, 106.8750, None),
        kelurahan("Ciracas", "Cibubur", 2.5, Rendah, -6.3500, 106.8850, None),
        kelurahan("Ciracas", "Kelapa Dua Wetan", 2.0, Sedang, -6.3300, 106.8900, None),
        kelurahan("Ciracas", "Rambutan", 1.5, Tinggi, -6.3150, 106.8800, None),

        // Kecamatan Cipayung
        kelurahan("Cipayung", "Cipayung", 2.0, Sedang, -6.3050, 106.9050, None),
        kelurahan("Cipayung", "Bambu Apus", 2.0, Sedang, -6.3000, 106.9150, None),
        kelurahan("Cipayung", "Setu", 2.5, Rendah, -6.3150, 106.9150, None),
        kelurahan("Cipayung", "Lubang Buaya", 2.0, Sedang, -6.2900, 106.9100, None),
        kelurahan("Cipayung", "Munjul", 2.0, Sedang, -6.3500, 106.9000, None),
        kelurahan("Cipayung", "Pondok Ranggon", 2.0, Sedang, -6.3450, 106.9200, None),
        kelurahan("Cipayung", "Ceger", 2.0, Sedang, -6.3050, 106.8950, None),
        kelurahan("Cipayung", "Cilangkap", 2.5, Rendah, -6.3300, 106.9100, None),
        kelurahan("Cipayung", "Cipayung Jaya", 2.0, Sedang, -6.3350, 106.9250, None),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(name: &str, district: &str, threshold: f64, dependency: Option<&str>) -> Area {
        kelurahan(district, name, threshold, RiskLevel::Sedang, 0.0, 0.0, dependency)
    }

    #[test]
    fn test_builtin_dataset_is_valid() {
        let table = AreaTable::east_jakarta().unwrap();

        assert_eq!(table.len(), 65);
        assert_eq!(table.districts().len(), 10);
        assert_eq!(table.districts()[0], "Matraman");
    }

    #[test]
    fn test_builtin_dependencies_all_resolve() {
        let table = AreaTable::east_jakarta().unwrap();

        for (id, area) in table.iter() {
            if area.rule.dependency.is_some() {
                assert!(
                    matches!(table.dependency(id), Some(DependencyRef::Area(_))),
                    "{} has an unresolved dependency",
                    area.name
                );
            }
        }
    }

    #[test]
    fn test_lookup_and_dependency() {
        let table = AreaTable::new(vec![
            area("A", "D1", 2.0, None),
            area("B", "D1", 1.0, Some("A")),
            area("C", "D2", 1.0, Some("Nowhere")),
        ])
        .unwrap();

        let a = table.lookup("A").unwrap();
        let b = table.lookup("B").unwrap();
        let c = table.lookup("C").unwrap();

        assert_eq!(table.dependency(a), None);
        assert_eq!(table.dependency(b), Some(DependencyRef::Area(a)));
        assert_eq!(table.dependency(c), Some(DependencyRef::Unknown));
        assert!(table.lookup("Nowhere").is_none());
    }

    #[test]
    fn test_handle_from_other_table_is_not_found() {
        let large = AreaTable::new(vec![
            area("A", "D1", 2.0, None),
            area("B", "D1", 1.0, Some("A")),
            area("C", "D2", 1.0, Some("A")),
        ])
        .unwrap();
        let small = AreaTable::new(vec![area("A", "D1", 2.0, None)]).unwrap();

        let c = large.lookup("C").unwrap();

        assert_eq!(large.get(c).map(|a| a.name.as_str()), Some("C"));
        assert!(small.get(c).is_none());
        assert_eq!(small.dependency(c), None);
    }

    #[test]
    fn test_districts_in_first_seen_order() {
        let table = AreaTable::new(vec![
            area("A", "East", 2.0, None),
            area("B", "West", 2.0, None),
            area("C", "East", 2.0, None),
        ])
        .unwrap();

        assert_eq!(table.districts(), ["East".to_string(), "West".to_string()]);
        assert_eq!(table.district_representative("East").unwrap().name, "A");
        assert!(table.district_representative("North").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = AreaTable::new(vec![area("A", "D", 2.0, None), area("A", "E", 1.0, None)])
            .unwrap_err();

        assert!(matches!(err, DatasetError::DuplicateArea(name) if name == "A"));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let err = AreaTable::new(vec![area("A", "D", 0.0, None)]).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidThreshold { .. }));
    }

    #[test]
    fn test_empty_dataset_rejected() {
        assert!(matches!(AreaTable::new(vec![]), Err(DatasetError::Empty)));
    }

    #[test]
    fn test_dataset_json_shape() {
        let json = r#"[
            {
                "name": "Kampung Melayu",
                "district": "Jatinegara",
                "rule": { "duration_threshold": 1, "base_risk": "Sangat Tinggi" },
                "location": { "lat": -6.226, "lon": 106.864 }
            },
            {
                "name": "Bali Mester",
                "district": "Jatinegara",
                "rule": { "duration_threshold": 2, "dependency": "Kampung Melayu", "base_risk": "SEDANG" },
                "location": { "lat": -6.22, "lon": 106.868 }
            }
        ]"#;
        let areas: Vec<Area> = serde_json::from_str(json).unwrap();
        let table = AreaTable::new(areas).unwrap();

        let bali = table.lookup("Bali Mester").unwrap();
        assert_eq!(
            table.dependency(bali),
            Some(DependencyRef::Area(table.lookup("Kampung Melayu").unwrap()))
        );
    }
}
