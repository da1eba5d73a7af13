//! Typed errors for the dataset, weather and refresh boundaries.

use thiserror::Error;

/// The area dataset failed validation at startup.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The dataset has no areas at all.
    #[error("area dataset is empty")]
    Empty,

    /// Two areas share a name; names are used as lookup keys.
    #[error("duplicate area name: {0}")]
    DuplicateArea(String),

    /// A duration threshold must be a positive number of hours.
    #[error("area '{name}' has invalid duration threshold {threshold}")]
    InvalidThreshold { name: String, threshold: f64 },

    /// The dataset file could not be read.
    #[error("failed to read area dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset file is not valid JSON of the expected shape.
    #[error("failed to parse area dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A weather provider call failed or returned an unusable series.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("weather provider returned status {0}")]
    Status(reqwest::StatusCode),

    /// The hourly series has no entries.
    #[error("hourly series is empty")]
    EmptySeries,

    /// `time` and `precipitation` are not index-aligned.
    #[error("hourly series length mismatch (time: {times}, precipitation: {values})")]
    LengthMismatch { times: usize, values: usize },

    /// A timestamp in the series could not be parsed.
    #[error("invalid hourly timestamp: {0}")]
    InvalidTimestamp(String),
}

/// A refresh cycle aborted; the previously published snapshot stays in place.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// One district's weather could not be fetched or was unusable.
    #[error("weather unavailable for district '{district}': {source}")]
    Weather {
        district: String,
        #[source]
        source: WeatherError,
    },

    /// A fetch task panicked or was cancelled.
    #[error("weather fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
