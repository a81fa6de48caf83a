//! Synthesis client for a VOICEVOX-compatible engine
//!
//! Each utterance takes two calls: `audio_query` turns text into a synthesis
//! descriptor, `synthesis` renders that descriptor into WAV bytes.

use crate::{RelayError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Upper bound for the startup version check. Utterance calls have none.
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Intermediate descriptor returned by the query step.
///
/// The relay never looks inside; it is handed back to the engine unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisQuery(Value);

impl SynthesisQuery {
    /// Wrap a descriptor. Only JSON objects are accepted.
    pub fn from_json(value: Value) -> Result<Self> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(RelayError::InvalidResponse(format!(
                "expected a JSON object descriptor, got {}",
                json_kind(&value)
            )))
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Remote speech synthesis.
///
/// Both calls are blocking and are never retried.
pub trait SpeechSynthesizer {
    fn build_query(&mut self, text: &str, speaker_id: u32) -> Result<SynthesisQuery>;

    fn render(&mut self, query: &SynthesisQuery, speaker_id: u32) -> Result<Vec<u8>>;
}

/// HTTP client for the VOICEVOX engine API
///
/// Owns a current-thread tokio runtime so the speech worker thread can drive
/// async `reqwest` calls to completion.
pub struct VoicevoxClient {
    base_url: String,
    http: reqwest::Client,
    runtime: Runtime,
}

impl VoicevoxClient {
    /// Create a client for the engine at `engine_url`
    ///
    /// Must not be called from inside an async context.
    pub fn new(engine_url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RelayError::IOError(format!("Failed to create tokio runtime: {}", e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RelayError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: engine_url.trim_end_matches('/').to_string(),
            http,
            runtime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the engine for its version string
    ///
    /// Gives up after `VERSION_CHECK_TIMEOUT` so a stalled engine cannot hold
    /// up startup.
    pub fn engine_version(&self) -> Result<String> {
        let request = self
            .http
            .get(format!("{}/version", self.base_url))
            .timeout(VERSION_CHECK_TIMEOUT);

        self.runtime.block_on(async move {
            let response = request.send().await.map_err(|e| unavailable("version", e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| unavailable("version", e))?;
            if !status.is_success() {
                return Err(status_error("version", status, &body));
            }
            // The engine answers with a JSON string
            Ok(serde_json::from_slice::<String>(&body)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string()))
        })
    }
}

impl SpeechSynthesizer for VoicevoxClient {
    fn build_query(&mut self, text: &str, speaker_id: u32) -> Result<SynthesisQuery> {
        let speaker = speaker_id.to_string();
        let request = self
            .http
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .header(ACCEPT, "application/json");

        debug!("audio_query: speaker={} chars={}", speaker_id, text.chars().count());

        self.runtime.block_on(async move {
            let response = request.send().await.map_err(|e| unavailable("audio_query", e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| unavailable("audio_query", e))?;
            interpret_query_response(status, &body)
        })
    }

    fn render(&mut self, query: &SynthesisQuery, speaker_id: u32) -> Result<Vec<u8>> {
        let request = self
            .http
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", speaker_id)])
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "audio/wav")
            .body(query.as_json().to_string());

        self.runtime.block_on(async move {
            let response = request.send().await.map_err(|e| unavailable("synthesis", e))?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| unavailable("synthesis", e))?;
            interpret_synthesis_response(status, body.to_vec())
        })
    }
}

/// Turn an `audio_query` response into a descriptor
pub fn interpret_query_response(status: StatusCode, body: &[u8]) -> Result<SynthesisQuery> {
    if !status.is_success() {
        return Err(status_error("audio_query", status, body));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::InvalidResponse(format!("audio_query returned invalid JSON: {}", e)))?;

    SynthesisQuery::from_json(value)
}

/// Turn a `synthesis` response into audio bytes
pub fn interpret_synthesis_response(status: StatusCode, body: Vec<u8>) -> Result<Vec<u8>> {
    if !status.is_success() {
        return Err(status_error("synthesis", status, &body));
    }

    if body.is_empty() {
        return Err(RelayError::InvalidResponse("synthesis returned an empty body".into()));
    }

    Ok(body)
}

fn unavailable(call: &str, err: reqwest::Error) -> RelayError {
    RelayError::SynthesisUnavailable(format!("{} request failed: {}", call, err))
}

fn status_error(call: &str, status: StatusCode, body: &[u8]) -> RelayError {
    let detail = String::from_utf8_lossy(body);
    let detail: String = detail.chars().take(200).collect();
    RelayError::SynthesisUnavailable(format!("{} returned {}: {}", call, status, detail.trim()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
