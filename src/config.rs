//! Runtime configuration, read once from the environment at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::data_sources::gemini::{DEFAULT_MODEL, GEMINI_API_BASE};
use crate::data_sources::open_meteo::{DEFAULT_TIMEZONE, OPEN_METEO_API_BASE};
use crate::model::Location;
use crate::storage::DEFAULT_HISTORY_SNAPSHOTS;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:siaga.db?mode=rwc";

/// Default interval between refresh cycles.
pub const DEFAULT_REFRESH_SECS: u64 = 600;

/// Jakarta is UTC+7 all year.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Used for point weather and analysis when no coordinates are given.
pub const DEFAULT_LOCATION: Location = Location {
    lat: -6.225,
    lon: 106.900,
};

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub refresh_interval: Duration,

    /// Number of stored snapshots kept for history.
    pub history_snapshots: u32,

    /// Offset of the weather provider's local time from UTC.
    pub utc_offset: FixedOffset,

    /// IANA timezone name sent to the weather provider.
    pub timezone: String,

    pub weather_base_url: String,

    /// JSON area dataset; the built-in East Jakarta dataset when unset.
    pub areas_path: Option<PathBuf>,

    pub default_location: Location,

    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DB_PATH.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            history_snapshots: DEFAULT_HISTORY_SNAPSHOTS,
            utc_offset: jakarta_offset(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            weather_base_url: OPEN_METEO_API_BASE.to_string(),
            areas_path: None,
            default_location: DEFAULT_LOCATION,
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: GEMINI_API_BASE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Unparseable values are ignored in favor of the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let utc_offset = parsed::<i32>("SIAGA_UTC_OFFSET_HOURS")
            .and_then(|h| h.checked_mul(3600))
            .and_then(FixedOffset::east_opt)
            .unwrap_or(defaults.utc_offset);

        let default_location = Location {
            lat: parsed("SIAGA_DEFAULT_LAT").unwrap_or(defaults.default_location.lat),
            lon: parsed("SIAGA_DEFAULT_LON").unwrap_or(defaults.default_location.lon),
        };

        Self {
            port: parsed("SIAGA_PORT").unwrap_or(defaults.port),
            database_url: env::var("SIAGA_DATABASE_URL").unwrap_or(defaults.database_url),
            refresh_interval: parsed::<u64>("SIAGA_REFRESH_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            history_snapshots: parsed::<u32>("SIAGA_HISTORY_SNAPSHOTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.history_snapshots),
            utc_offset,
            timezone: env::var("SIAGA_TIMEZONE").unwrap_or(defaults.timezone),
            weather_base_url: env::var("SIAGA_WEATHER_BASE_URL")
                .unwrap_or(defaults.weather_base_url),
            areas_path: env::var_os("SIAGA_AREAS_PATH").map(PathBuf::from),
            default_location,
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("SIAGA_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: env::var("SIAGA_GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn jakarta_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.refresh_interval, Duration::from_secs(600));
        assert_eq!(config.history_snapshots, 1008);
        assert_eq!(config.utc_offset.local_minus_utc(), 7 * 3600);
        assert_eq!(config.timezone, "Asia/Jakarta");
        assert!(config.gemini_api_key.is_none());
        assert!(config.areas_path.is_none());
    }
}
