//! The refresh cycle and the published status snapshot.
//!
//! A cycle fetches one forecast per district concurrently, waits for all of
//! them, and resolves every area's status once on that complete set. If any
//! district fails, the whole cycle is discarded and the previous snapshot stays
//! published.
//!
//! # Usage
//!
//! ```ignore
//! let dashboard = Dashboard::new(config, AreaTable::east_jakarta()?);
//! tokio::spawn(run_refresh_loop(dashboard.clone(), storage));
//! let snapshot = dashboard.snapshot().await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::aggregation::{StatusCounts, status_context, status_of};
use crate::areas::AreaTable;
use crate::config::Config;
use crate::data_sources::open_meteo::{FORECAST_WINDOW_HOURS, ForecastResponse};
use crate::data_sources::{GeminiClient, OpenMeteoClient};
use crate::error::{RefreshError, WeatherError};
use crate::flood::{current_hour_index, resolve_all};
use crate::model::{
    Area, CalculatedFloodStatus, FloodRule, ForecastHour, HourlySeries, Location,
    PointWeatherResponse, RiskLevel,
};
use crate::storage::Storage;

/// District label used when analyzing an arbitrary point.
const POINT_DISTRICT: &str = "Jakarta Timur";

/// Rule assumed for an arbitrary point.
const POINT_THRESHOLD_HOURS: f64 = 2.0;

/// Statuses and forecasts from one completed refresh cycle.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// When the cycle completed.
    pub computed_at: DateTime<Utc>,

    /// Area name to resolved status.
    pub statuses: HashMap<String, CalculatedFloodStatus>,

    /// District name to its upcoming hours, starting at the current hour.
    pub forecasts: HashMap<String, Vec<ForecastHour>>,
}

impl StatusSnapshot {
    /// Resolve every area from a complete set of district forecasts.
    ///
    /// `local_now` is wall-clock time in the forecasts' timezone.
    pub fn from_forecasts(
        table: &AreaTable,
        forecasts: &HashMap<String, ForecastResponse>,
        computed_at: DateTime<Utc>,
        local_now: NaiveDateTime,
    ) -> Result<Self, RefreshError> {
        let mut series: HashMap<String, HourlySeries> = HashMap::with_capacity(forecasts.len());
        let mut windows = HashMap::with_capacity(forecasts.len());

        for (district, forecast) in forecasts {
            let hourly = forecast
                .hourly
                .to_series()
                .map_err(|source| RefreshError::Weather {
                    district: district.clone(),
                    source,
                })?;
            let start = current_hour_index(&hourly.time, local_now);

            windows.insert(
                district.clone(),
                forecast.hourly.forecast_window(start, FORECAST_WINDOW_HOURS),
            );
            series.insert(district.clone(), hourly);
        }

        Ok(Self {
            computed_at,
            statuses: resolve_all(table, &series, local_now),
            forecasts: windows,
        })
    }

    /// Status of one area, safe by default when unresolved.
    pub fn status_of(&self, name: &str) -> CalculatedFloodStatus {
        status_of(&self.statuses, name)
    }

    /// Forecast window of a district, empty when unknown.
    pub fn forecast_for(&self, district: &str) -> &[ForecastHour] {
        self.forecasts.get(district).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Dashboard state shared by the refresh loop and the HTTP handlers.
#[derive(Clone)]
pub struct Dashboard {
    config: Arc<Config>,
    areas: Arc<AreaTable>,
    weather: OpenMeteoClient,
    gemini: GeminiClient,
    published: Arc<RwLock<Option<Arc<StatusSnapshot>>>>,
}

impl Dashboard {
    /// Create a dashboard with nothing published yet.
    pub fn new(config: Config, areas: AreaTable) -> Self {
        Self {
            weather: OpenMeteoClient::with_base_url(&config.weather_base_url, &config.timezone),
            gemini: GeminiClient::with_base_url(
                &config.gemini_base_url,
                config.gemini_api_key.clone(),
                &config.gemini_model,
            ),
            areas: Arc::new(areas),
            config: Arc::new(config),
            published: Arc::new(RwLock::new(None)),
        }
    }

    pub fn areas(&self) -> &AreaTable {
        &self.areas
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current wall-clock time in the weather provider's timezone.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now()
            .with_timezone(&self.config.utc_offset)
            .naive_local()
    }

    /// The currently published snapshot, if any cycle has completed.
    pub async fn snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.published.read().await.clone()
    }

    /// Replace the published snapshot.
    pub async fn publish(&self, snapshot: Arc<StatusSnapshot>) {
        *self.published.write().await = Some(snapshot);
    }

    /// Fetch every district concurrently and resolve a new snapshot.
    pub async fn fetch_snapshot(&self) -> Result<StatusSnapshot, RefreshError> {
        let mut tasks = JoinSet::new();

        for district in self.areas.districts() {
            let Some(representative) = self.areas.district_representative(district) else {
                continue;
            };
            let client = self.weather.clone();
            let district = district.clone();
            let location = representative.location;

            tasks.spawn(async move { (district, client.get_forecast(location).await) });
        }

        // Returning early drops the set, which aborts the remaining fetches.
        let mut forecasts = HashMap::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (district, result) = joined?;
            let forecast = result.map_err(|source| RefreshError::Weather {
                district: district.clone(),
                source,
            })?;
            forecasts.insert(district, forecast);
        }

        let computed_at = Utc::now();
        let local_now = computed_at
            .with_timezone(&self.config.utc_offset)
            .naive_local();

        StatusSnapshot::from_forecasts(&self.areas, &forecasts, computed_at, local_now)
    }

    /// Run one refresh cycle.
    ///
    /// Returns the snapshot that should be published: the new one on success,
    /// `previous` unchanged on failure.
    pub async fn refresh(
        &self,
        previous: Option<Arc<StatusSnapshot>>,
    ) -> Option<Arc<StatusSnapshot>> {
        let started = Instant::now();

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                let counts = StatusCounts::from_statuses(&snapshot.statuses);
                info!(
                    areas = snapshot.statuses.len(),
                    banjir = counts.banjir,
                    siaga = counts.siaga,
                    waspada = counts.waspada,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Flood statuses refreshed"
                );
                Some(Arc::new(snapshot))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    has_previous = previous.is_some(),
                    "Refresh cycle failed, keeping previous statuses"
                );
                previous
            }
        }
    }

    /// Refresh, then record and publish the result if it is new.
    ///
    /// Returns whether a new snapshot was published.
    pub async fn run_cycle(&self, storage: &Storage) -> bool {
        let previous = self.snapshot().await;

        match self.refresh(previous.clone()).await {
            Some(next) if !previous.as_ref().is_some_and(|p| Arc::ptr_eq(p, &next)) => {
                if let Err(e) = storage.record_snapshot(&next).await {
                    warn!(error = %e, "Failed to record status snapshot");
                }
                self.publish(next).await;
                true
            }
            _ => false,
        }
    }

    /// Current weather and the upcoming hours at a point.
    pub async fn point_weather(
        &self,
        location: Location,
    ) -> Result<PointWeatherResponse, WeatherError> {
        let forecast = self.weather.get_forecast(location).await?;
        let series = forecast.hourly.to_series()?;
        let start = current_hour_index(&series.time, self.local_now());

        Ok(PointWeatherResponse {
            location,
            current: forecast.current_weather.clone(),
            forecast: forecast.hourly.forecast_window(start, FORECAST_WINDOW_HOURS),
        })
    }

    /// AI flood analysis for a point, using a generic two-hour rule.
    pub async fn analyze(&self, location: Location, name: &str) -> Result<String, WeatherError> {
        let weather = self.point_weather(location).await?;

        let area = Area {
            name: name.to_string(),
            district: POINT_DISTRICT.to_string(),
            rule: FloodRule {
                duration_threshold: POINT_THRESHOLD_HOURS,
                dependency: None,
                base_risk: RiskLevel::Sedang,
            },
            location,
        };

        Ok(self.gemini.analyze_flood_risk(&area, &weather.forecast).await)
    }

    /// AI chat answer with the published statuses as context.
    pub async fn chat(&self, message: &str) -> String {
        let context = match self.snapshot().await {
            Some(snapshot) => status_context(&self.areas, &snapshot.statuses),
            None => status_context(&self.areas, &HashMap::new()),
        };
        self.gemini.chat(message, &context).await
    }
}

/// Refresh forever at the configured interval.
///
/// Cycles run one at a time; ticks missed while a slow cycle is running are
/// skipped rather than queued.
pub async fn run_refresh_loop(dashboard: Dashboard, storage: Storage) {
    let mut ticker = tokio::time::interval(dashboard.config().refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        dashboard.run_cycle(&storage).await;
    }
}
