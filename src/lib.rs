//! Siaga - near-real-time flood status for East Jakarta neighborhoods.
//!
//! # Overview
//!
//! Siaga fetches an hourly rain forecast for each district (kecamatan),
//! measures how many consecutive hours it has been raining, and classifies
//! every neighborhood (kelurahan) into one of four levels:
//!
//! - **AMAN**: not raining right now
//! - **WASPADA**: raining, but far from the area's threshold, or held back by
//!   an upstream area that is not flooded
//! - **SIAGA**: one hour short of the threshold
//! - **BANJIR**: at or past the threshold
//!
//! An area may depend on one other area: it can only reach BANJIR while that
//! area is at BANJIR too. Dependencies are resolved one hop deep, from
//! provisional statuses computed in a first pass.
//!
//! # Modules
//!
//! - [`model`]: Area, rule and status types, request and response shapes
//! - [`areas`]: The interned area dataset
//! - [`flood`]: Rain duration and the status classification
//! - [`aggregation`]: Counts, listings and the situation sentence
//! - [`dashboard`]: The refresh cycle and the published snapshot
//! - [`data_sources`]: Open-Meteo and Gemini clients
//! - [`storage`]: SQLite status history
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration
//! - [`error`]: Typed errors

pub mod aggregation;
pub mod api;
pub mod areas;
pub mod config;
pub mod dashboard;
pub mod data_sources;
pub mod error;
pub mod flood;
pub mod model;
pub mod storage;
