//! External collaborators reached over HTTP.
//!
//! # Data Sources
//!
//! - [`open_meteo`]: hourly weather forecasts, one request per district per refresh
//! - [`gemini`]: text generation for the analysis and chat features

pub mod gemini;
pub mod open_meteo;

pub use gemini::GeminiClient;
pub use open_meteo::OpenMeteoClient;
