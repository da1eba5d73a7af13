//! Gemini text-generation client for the flood analysis and chat features.
//!
//! The AI layer is a convenience: every failure mode degrades to a fixed,
//! friendly reply instead of an error, and a missing API key disables calls
//! entirely.
//!
//! # API Reference
//!
//! See: <https://ai.google.dev/api/generate-content>

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Area, ForecastHour};

/// Base URL for the Gemini API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const ANALYSIS_NO_KEY: &str = "API Key not found for AI analysis.";
const ANALYSIS_EMPTY: &str = "Gagal menganalisa.";
const ANALYSIS_OFFLINE: &str = "AI sedang offline bestie, tapi tetap waspada ya!";

const CHAT_NO_KEY: &str = "Maaf, sistem AI belum dikonfigurasi.";
const CHAT_EMPTY: &str = "Maaf, saya kurang mengerti.";
const CHAT_OFFLINE: &str = "Sinyal sedang buruk, utamakan keselamatan diri dulu ya!";

/// Client for Gemini's `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a new client. Without an API key every call answers with a notice.
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        Self::with_base_url(GEMINI_API_BASE, api_key, model)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, api_key: Option<String>, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Short flood-risk analysis for a location and its upcoming hours.
    pub async fn analyze_flood_risk(&self, area: &Area, forecast: &[ForecastHour]) -> String {
        let Some(api_key) = &self.api_key else {
            return ANALYSIS_NO_KEY.to_string();
        };

        let prompt = analysis_prompt(area, forecast);
        match self.generate(api_key, &prompt, None).await {
            Ok(Some(text)) => text,
            Ok(None) => ANALYSIS_EMPTY.to_string(),
            Err(e) => {
                warn!(area = %area.name, error = %e, "Gemini analysis failed");
                ANALYSIS_OFFLINE.to_string()
            }
        }
    }

    /// Answer a user message with the current flood situation as context.
    pub async fn chat(&self, message: &str, status_context: &str) -> String {
        let Some(api_key) = &self.api_key else {
            return CHAT_NO_KEY.to_string();
        };

        let instruction = chat_instruction(status_context);
        match self.generate(api_key, message, Some(&instruction)).await {
            Ok(Some(text)) => text,
            Ok(None) => CHAT_EMPTY.to_string(),
            Err(e) => {
                warn!(error = %e, "Gemini chat failed");
                CHAT_OFFLINE.to_string()
            }
        }
    }

    /// Call `generateContent`.
    ///
    /// The key travels in a header; returned errors carry no URL.
    async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> anyhow::Result<Option<String>> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(&self.model)
        );

        let body = GenerateRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: system_instruction.map(Content::text),
        };

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(reqwest::Error::without_url)?;
        let data = response
            .json::<GenerateResponse>()
            .await
            .map_err(reqwest::Error::without_url)?;
        Ok(data.text())
    }
}

/// Prompt for the per-location analysis.
pub fn analysis_prompt(area: &Area, forecast: &[ForecastHour]) -> String {
    let weather_summary = forecast
        .iter()
        .map(|f| format!("Jam {}: {}mm hujan ({}°C)", f.hour, f.precip, f.temp))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analisa risiko banjir untuk Kelurahan {name}, Kecamatan {district}.\n\n\
         Data Cuaca {hours} Jam Kedepan:\n{weather_summary}\n\n\
         Aturan Banjir Lokal:\n\
         \"Banjir jika hujan >= {threshold} jam. Base Risk: {risk}. Dependency: {dependency}.\"\n\n\
         Tugas:\n\
         Berikan analisa singkat, padat, dan gaya bahasa Gen-Z (santai tapi informatif) apakah akan banjir atau aman.\n\
         Jangan terlalu formal. Gunakan emoji. Maksimal 3 kalimat.",
        name = area.name,
        district = area.district,
        hours = forecast.len(),
        threshold = area.rule.duration_threshold,
        risk = area.rule.base_risk.label(),
        dependency = area.rule.dependency.as_deref().unwrap_or("None"),
    )
}

/// System instruction for the chat assistant.
pub fn chat_instruction(status_context: &str) -> String {
    format!(
        "Kamu adalah SiagaBot, asisten kesiapsiagaan bencana banjir untuk Jakarta Timur.\n\
         Gaya bicaramu: Membantu, Tenang, Informatif, tapi tetap santai (Gen-Z friendly).\n\n\
         Konteks Situasi Saat Ini:\n{status_context}\n\n\
         Tugasmu:\n\
         1. Menjawab pertanyaan user seputar persiapan banjir, evakuasi, dan pertolongan pertama.\n\
         2. Jika situasi AMAN, ingatkan untuk tetap menjaga kebersihan saluran air.\n\
         3. Jika situasi BANJIR/SIAGA, berikan instruksi keselamatan yang jelas (matikan listrik, amankan dokumen, evakuasi).\n\
         4. Jawablah dengan ringkas (maksimal 3-4 kalimat)."
    )
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, `None` when empty.
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
