//! Data models for Siaga.
//!
//! Static configuration ([`Area`], [`FloodRule`]), the per-district weather
//! input ([`HourlySeries`]), the per-area output ([`CalculatedFloodStatus`]) and
//! the request/response shapes of the HTTP API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_sources::open_meteo::CurrentWeather;

/// The flood status of an area for the current refresh cycle.
///
/// Levels are ordered by severity, `Aman` lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FloodStatus {
    /// Not raining, or rain has stopped.
    Aman,

    /// Raining, but not within one hour of the area's threshold, or a
    /// dependency gate is not met.
    Waspada,

    /// Raining, within one hour of the threshold.
    Siaga,

    /// Raining for at least the threshold duration.
    Banjir,
}

impl FloodStatus {
    /// All levels in display priority order, most severe first.
    pub const BY_PRIORITY: [FloodStatus; 4] = [
        FloodStatus::Banjir,
        FloodStatus::Siaga,
        FloodStatus::Waspada,
        FloodStatus::Aman,
    ];

    /// Get the upper-case label used in the API and in AI prompts.
    pub fn label(&self) -> &'static str {
        match self {
            FloodStatus::Aman => "AMAN",
            FloodStatus::Waspada => "WASPADA",
            FloodStatus::Siaga => "SIAGA",
            FloodStatus::Banjir => "BANJIR",
        }
    }

    /// Sort key for listings: 0 for BANJIR up to 3 for AMAN.
    pub fn priority(&self) -> u8 {
        match self {
            FloodStatus::Banjir => 0,
            FloodStatus::Siaga => 1,
            FloodStatus::Waspada => 2,
            FloodStatus::Aman => 3,
        }
    }

    /// Parse a label, ignoring case.
    pub fn parse(label: &str) -> Option<Self> {
        Self::BY_PRIORITY
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label))
    }
}

/// Qualitative baseline risk of an area. Descriptive only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Rendah", alias = "RENDAH")]
    Rendah,
    #[serde(rename = "Sedang", alias = "SEDANG")]
    Sedang,
    #[serde(rename = "Tinggi", alias = "TINGGI")]
    Tinggi,
    #[serde(rename = "Sangat Tinggi", alias = "SANGAT_TINGGI")]
    SangatTinggi,
}

impl RiskLevel {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Rendah => "Rendah",
            RiskLevel::Sedang => "Sedang",
            RiskLevel::Tinggi => "Tinggi",
            RiskLevel::SangatTinggi => "Sangat Tinggi",
        }
    }
}

/// Threshold configuration attached to an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodRule {
    /// Hours of continuous rain at or above which the area floods.
    pub duration_threshold: f64,

    /// Name of another area that must itself be at BANJIR before this one can be.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,

    /// Baseline risk label.
    pub base_risk: RiskLevel,
}

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// A monitored neighborhood (kelurahan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Unique name, used as the key of the status mapping.
    pub name: String,

    /// District (kecamatan). Areas in one district share a weather series.
    pub district: String,

    /// Flood rule for this area.
    pub rule: FloodRule,

    /// Coordinates; the first area of a district is where its weather is sampled.
    pub location: Location,
}

/// Hourly precipitation for one district, index-aligned.
///
/// Timestamps are local wall-clock hours in the configured timezone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlySeries {
    pub time: Vec<NaiveDateTime>,
    pub precipitation: Vec<f64>,
}

/// Result of status resolution for one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedFloodStatus {
    pub status: FloodStatus,

    /// Consecutive rainy hours ending at the current hour.
    pub current_rain_duration: u32,

    /// Whether the current hour has measurable rain.
    pub is_raining_now: bool,

    /// True when the area has no dependency or its dependency is at BANJIR.
    pub dependency_met: bool,
}

/// An unresolved area reads as safe with no rain.
impl Default for CalculatedFloodStatus {
    fn default() -> Self {
        Self {
            status: FloodStatus::Aman,
            current_rain_duration: 0,
            is_raining_now: false,
            dependency_met: true,
        }
    }
}

/// One hour of forecast for display and AI prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastHour {
    /// Hour label such as `14:00`.
    pub hour: String,
    pub temp: f64,
    pub precip: f64,
    pub code: i32,

    /// Weather description derived from `code`.
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
}

/// An area together with its current status, as listed by the API.
#[derive(Debug, Clone, Serialize)]
pub struct AreaStatusView {
    pub name: String,
    pub district: String,
    pub base_risk: RiskLevel,
    pub duration_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    pub location: Location,
    #[serde(flatten)]
    pub status: CalculatedFloodStatus,
}

/// Query parameters for GET /status.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Only areas in this district.
    pub district: Option<String>,

    /// Only areas at this status (AMAN, WASPADA, SIAGA, BANJIR).
    pub status: Option<String>,
}

/// Response for GET /status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusListResponse {
    /// When the statuses were computed; absent before the first cycle.
    pub computed_at: Option<DateTime<Utc>>,
    pub areas: Vec<AreaStatusView>,
}

/// Response for GET /areas/:name.
#[derive(Debug, Clone, Serialize)]
pub struct AreaDetailResponse {
    pub area: Area,
    pub status: CalculatedFloodStatus,
    pub forecast: Vec<ForecastHour>,
    pub computed_at: Option<DateTime<Utc>>,
}

/// A stored status of one area at one refresh cycle.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub computed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: CalculatedFloodStatus,
}

/// Response for GET /areas/:name/history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub area: String,
    pub entries: Vec<HistoryEntry>,
}

/// Query parameters for GET /areas/:name/history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of entries, newest first (default: 24).
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    24
}

/// Query parameters for GET /weather. Missing coordinates use the configured default.
#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Response for GET /weather.
#[derive(Debug, Clone, Serialize)]
pub struct PointWeatherResponse {
    pub location: Location,
    pub current: Option<CurrentWeather>,
    pub forecast: Vec<ForecastHour>,
}

/// Request body for POST /analyze.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub lat: Option<f64>,
    pub lon: Option<f64>,

    /// Label for the location in the prompt (default: "Lokasi Anda").
    #[serde(default = "default_location_name")]
    pub name: String,
}

fn default_location_name() -> String {
    "Lokasi Anda".to_string()
}

/// Request body for POST /chat.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response for the AI endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AiReply {
    pub reply: String,
}
