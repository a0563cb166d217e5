use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::segments::{SegmentId, TextId};
use crate::session::Session;

const SUGGEST_TRANSLATION_PATH: &str = "/api/tutor/suggest-translation";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorRequest {
    pub text_id: TextId,
    pub segment_id: SegmentId,
    pub selection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_draft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorSuggestion {
    pub translation: String,
    #[serde(default)]
    pub literal_gloss: Option<String>,
    pub rationale: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

impl TutorSuggestion {
    fn validated(self) -> Result<Self, TutorError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(TutorError::Malformed(format!(
                "confidence {} outside 0..=1",
                self.confidence
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TutorError {
    /// The service answered with a non-success status; `detail` is shown to
    /// the user as is.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    #[error("Tutor request failed: {0}")]
    Transport(String),

    #[error("Malformed tutor response: {0}")]
    Malformed(String),
}

pub trait TutorGateway: Send {
    fn suggest_translation(&self, request: &TutorRequest) -> Result<TutorSuggestion, TutorError>;
}

pub struct HttpTutorGateway {
    client: Client,
    session: Arc<Session>,
}

impl HttpTutorGateway {
    pub fn new(session: Arc<Session>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, session })
    }
}

impl TutorGateway for HttpTutorGateway {
    fn suggest_translation(&self, request: &TutorRequest) -> Result<TutorSuggestion, TutorError> {
        let url = self.session.endpoint(SUGGEST_TRANSLATION_PATH);
        log::debug!(
            "POST {url} (text {}, segment {}, {} chars)",
            request.text_id,
            request.segment_id,
            request.selection.chars().count()
        );

        let response = self
            .session
            .authorize(self.client.post(&url).json(request))
            .send()
            .map_err(|e| TutorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = error_detail(&body, status.as_u16(), status.canonical_reason());
            log::warn!("Tutor request rejected with {status}: {detail}");
            return Err(TutorError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<TutorSuggestion>()
            .map_err(|e| TutorError::Malformed(e.to_string()))?
            .validated()
    }
}

/// Human-readable detail for a failed response. The backend reports errors as
/// `{"detail": ...}`; anything else falls back to the raw body, then the
/// status line.
pub fn error_detail(body: &str, status: u16, reason: Option<&str>) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    match reason {
        Some(reason) => format!("{status} {reason}"),
        None => format!("HTTP {status}"),
    }
}
