//! One-shot text generation against the hosted generative-language API.
//!
//! Sends a single `generateContent` request with a system instruction, one
//! user prompt and fixed generation parameters, and returns the text of the
//! first candidate.

use crate::config::GeminiConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const OFFICIAL_HOST: &str = "generativelanguage.googleapis.com";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("No API key: set GEMINI_API_KEY or [gemini].api_key in the config file")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Response contained no candidate text")]
    EmptyResponse,
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Where the API key may be sent for a given base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyDestination {
    Official,
    Local,
    Other,
}

fn classify_base_url(base: &Url) -> Result<KeyDestination, GeminiError> {
    let host = base.host_str().unwrap_or_default();
    let is_local = host == "localhost" || host == "127.0.0.1";
    match base.scheme() {
        "https" if host == OFFICIAL_HOST => Ok(KeyDestination::Official),
        "https" | "http" if is_local => Ok(KeyDestination::Local),
        "https" => Ok(KeyDestination::Other),
        _ => Err(GeminiError::InsecureBaseUrl),
    }
}

/// Resolves the API key: the `GEMINI_API_KEY` env var wins over the config value.
pub fn resolve_api_key(config: &GeminiConfig) -> Option<SecretString> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| config.api_key.clone())
        .map(SecretString::from)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Sends `prompt` (with the configured system instruction and generation
/// parameters) and returns the first candidate's text.
///
/// # Errors
///
/// - [`GeminiError::InsecureBaseUrl`] - base URL is not HTTPS (localhost excepted)
/// - [`GeminiError::InvalidBaseUrl`] - base URL does not parse
/// - [`GeminiError::Network`] - transport failure or undecodable body
/// - [`GeminiError::HttpStatus`] - non-2xx response, with the body for diagnostics
/// - [`GeminiError::EmptyResponse`] - no candidate carried any text
pub async fn generate(
    client: &reqwest::Client,
    config: &GeminiConfig,
    api_key: &SecretString,
    prompt: &str,
) -> Result<String, GeminiError> {
    let base = config.base_url.trim_end_matches('/');
    let destination = classify_base_url(&Url::parse(base)?).inspect_err(|_| {
        tracing::error!(base_url = %base, "Rejecting non-HTTPS generation base URL");
    })?;

    let endpoint = format!("{}/v1beta/models/{}:generateContent", base, config.model);
    let body = GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &config.system_instruction,
            }],
        },
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        },
    };

    let mut request = client.post(&endpoint).json(&body);

    // Only send the key to the official host or a local test server
    if destination != KeyDestination::Other {
        request = request.header("x-goog-api-key", api_key.expose_secret());
    } else {
        tracing::warn!(base_url = %base, "Not sending API key to non-official host");
    }

    tracing::debug!(model = %config.model, prompt_len = prompt.len(), "Sending generation request");
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GeminiError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: GenerateResponse = response.json().await?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GeminiError::EmptyResponse);
    }
    Ok(text)
}
