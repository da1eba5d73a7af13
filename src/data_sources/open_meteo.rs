//! Open-Meteo forecast client.
//!
//! Open-Meteo serves free hourly weather forecasts without an API key. Siaga
//! asks for one day of hourly precipitation, weather code, temperature,
//! humidity and apparent temperature in local time, plus the current
//! conditions.
//!
//! # API Reference
//!
//! See: <https://open-meteo.com/en/docs>

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;
use crate::model::{ForecastHour, HourlySeries, Location};

/// Base URL for the Open-Meteo API.
pub const OPEN_METEO_API_BASE: &str = "https://api.open-meteo.com/v1";

/// Timezone requested by default; hourly timestamps come back in this zone.
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

/// Hours shown in a forecast window.
pub const FORECAST_WINDOW_HOURS: usize = 5;

/// Format of hourly timestamps in responses, e.g. `2025-01-15T14:00`.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Hourly variables requested from the forecast endpoint.
const HOURLY_VARIABLES: &str =
    "precipitation,weathercode,temperature_2m,relativehumidity_2m,apparent_temperature";

/// Client for the Open-Meteo forecast API.
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
    timezone: String,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoClient {
    /// Create a new client against the public API in the Jakarta timezone.
    pub fn new() -> Self {
        Self::with_base_url(OPEN_METEO_API_BASE, DEFAULT_TIMEZONE)
    }

    /// Create a client with a custom base URL and timezone.
    pub fn with_base_url(base_url: &str, timezone: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timezone: timezone.to_string(),
        }
    }

    /// Build the forecast URL for a location.
    pub fn forecast_url(&self, location: Location) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&hourly={}&current_weather=true&timezone={}&forecast_days=1",
            self.base_url,
            location.lat,
            location.lon,
            HOURLY_VARIABLES,
            urlencoding::encode(&self.timezone)
        )
    }

    /// Fetch today's hourly forecast for a location.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = OpenMeteoClient::new();
    /// let forecast = client.get_forecast(Location { lat: -6.225, lon: 106.9 }).await?;
    /// let series = forecast.hourly.to_series()?;
    /// ```
    pub async fn get_forecast(&self, location: Location) -> Result<ForecastResponse, WeatherError> {
        let url = self.forecast_url(location);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status()));
        }

        let data = response.json::<ForecastResponse>().await?;
        Ok(data)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Response from the forecast endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    /// Hourly columns, index-aligned with `hourly.time`.
    pub hourly: HourlyWeather,

    /// Current conditions, when requested.
    #[serde(default)]
    pub current_weather: Option<CurrentWeather>,
}

/// Hourly forecast columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HourlyWeather {
    /// Local timestamps, one per hour, ascending.
    #[serde(default)]
    pub time: Vec<String>,

    /// Precipitation in millimeters.
    #[serde(default)]
    pub precipitation: Vec<f64>,

    /// WMO weather interpretation codes.
    #[serde(default)]
    pub weathercode: Vec<i32>,

    /// Air temperature at 2 m in °C.
    #[serde(default)]
    pub temperature_2m: Vec<f64>,

    /// Relative humidity at 2 m in percent.
    #[serde(default)]
    pub relativehumidity_2m: Vec<f64>,

    /// Apparent ("feels like") temperature in °C.
    #[serde(default)]
    pub apparent_temperature: Vec<f64>,
}

impl HourlyWeather {
    /// Parse timestamps and check the series is usable for rain-duration lookback.
    pub fn to_series(&self) -> Result<HourlySeries, WeatherError> {
        if self.time.is_empty() || self.precipitation.is_empty() {
            return Err(WeatherError::EmptySeries);
        }
        if self.time.len() != self.precipitation.len() {
            return Err(WeatherError::LengthMismatch {
                times: self.time.len(),
                values: self.precipitation.len(),
            });
        }

        let time = self
            .time
            .iter()
            .map(|t| parse_time(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HourlySeries {
            time,
            precipitation: self.precipitation.clone(),
        })
    }

    /// Up to `hours` entries starting at `start`, stopping at the end of the series.
    pub fn forecast_window(&self, start: usize, hours: usize) -> Vec<ForecastHour> {
        (start..start.saturating_add(hours))
            .map_while(|idx| {
                let time = self.time.get(idx)?;
                let hour = parse_time(time)
                    .map(|t| format!("{}:00", t.hour()))
                    .unwrap_or_else(|_| time.clone());
                let code = self.weathercode.get(idx).copied().unwrap_or_default();

                Some(ForecastHour {
                    hour,
                    temp: self.temperature_2m.get(idx).copied().unwrap_or_default(),
                    precip: self.precipitation.get(idx).copied().unwrap_or_default(),
                    code,
                    label: describe_weather_code(code).to_string(),
                    humidity: self.relativehumidity_2m.get(idx).copied(),
                    feels_like: self.apparent_temperature.get(idx).copied(),
                })
            })
            .collect()
    }
}

fn parse_time(raw: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|_| WeatherError::InvalidTimestamp(raw.to_string()))
}

/// Current conditions block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub temperature: f64,

    #[serde(default)]
    pub weathercode: i32,

    /// Wind speed in km/h.
    #[serde(default)]
    pub windspeed: f64,

    #[serde(default)]
    pub time: String,
}

/// Describe a WMO weather interpretation code in Indonesian.
pub fn describe_weather_code(code: i32) -> &'static str {
    match code {
        0 => "Cerah",
        1..=3 => "Berawan",
        45..=48 => "Kabut",
        51..=55 => "Gerimis",
        61..=65 => "Hujan",
        80..=82 => "Hujan Lebat",
        c if c >= 95 => "Badai Petir",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "latitude": -6.2,
        "longitude": 106.875,
        "hourly": {
            "time": ["2025-01-15T00:00", "2025-01-15T01:00", "2025-01-15T02:00"],
            "precipitation": [0.0, 1.2, 3.4],
            "weathercode": [3, 61, 81],
            "temperature_2m": [26.1, 25.4, 24.9],
            "relativehumidity_2m": [88, 92, 95],
            "apparent_temperature": [29.0, 28.2, 27.7]
        },
        "current_weather": {
            "temperature": 25.4,
            "weathercode": 61,
            "windspeed": 7.2,
            "time": "2025-01-15T01:00"
        }
    }"#;

    #[test]
    fn test_parse_forecast_response() {
        let forecast: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();

        assert_eq!(forecast.hourly.time.len(), 3);
        assert_eq!(forecast.current_weather.unwrap().weathercode, 61);
    }

    #[test]
    fn test_to_series() {
        let forecast: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let series = forecast.hourly.to_series().unwrap();

        assert_eq!(series.time.len(), 3);
        assert_eq!(series.time[2].hour(), 2);
        assert_eq!(series.precipitation, vec![0.0, 1.2, 3.4]);
    }

    #[test]
    fn test_to_series_rejects_empty() {
        let hourly = HourlyWeather::default();
        assert!(matches!(hourly.to_series(), Err(WeatherError::EmptySeries)));
    }

    #[test]
    fn test_to_series_rejects_misaligned() {
        let hourly = HourlyWeather {
            time: vec!["2025-01-15T00:00".to_string()],
            precipitation: vec![0.0, 1.0],
            ..Default::default()
        };
        assert!(matches!(
            hourly.to_series(),
            Err(WeatherError::LengthMismatch { times: 1, values: 2 })
        ));
    }

    #[test]
    fn test_to_series_rejects_bad_timestamp() {
        let hourly = HourlyWeather {
            time: vec!["yesterday".to_string()],
            precipitation: vec![0.0],
            ..Default::default()
        };
        assert!(matches!(
            hourly.to_series(),
            Err(WeatherError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_forecast_window_stops_at_series_end() {
        let forecast: ForecastResponse = serde_json::from_str(SAMPLE).unwrap();
        let window = forecast.hourly.forecast_window(1, FORECAST_WINDOW_HOURS);

        assert_eq!(window.len(), 2);
        assert_eq!(window[0].hour, "1:00");
        assert_eq!(window[0].label, "Hujan");
        assert_eq!(window[1].label, "Hujan Lebat");
        assert_eq!(window[1].humidity, Some(95.0));
    }

    #[test]
    fn test_describe_weather_code() {
        assert_eq!(describe_weather_code(0), "Cerah");
        assert_eq!(describe_weather_code(2), "Berawan");
        assert_eq!(describe_weather_code(53), "Gerimis");
        assert_eq!(describe_weather_code(99), "Badai Petir");
        assert_eq!(describe_weather_code(71), "Unknown");
    }

    #[test]
    fn test_forecast_url() {
        let client = OpenMeteoClient::with_base_url("http://localhost:9000/v1/", "Asia/Jakarta");
        let url = client.forecast_url(Location { lat: -6.225, lon: 106.9 });

        assert!(url.starts_with("http://localhost:9000/v1/forecast?latitude=-6.225&longitude=106.9"));
        assert!(url.contains("timezone=Asia%2FJakarta"));
        assert!(url.contains("forecast_days=1"));
    }
}
