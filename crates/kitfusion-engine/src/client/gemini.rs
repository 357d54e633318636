use std::time::Duration;

use anyhow::{bail, Context, Result};
use kitfusion_contracts::errors::GenerationFailure;
use kitfusion_contracts::response::{extract_result, GenerationResponse};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use super::{FusionRequest, FusionResponse, GenerationClient};
use crate::{error_chain_text, map_object, non_empty_env, truncate_text};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 90.0;
const MIN_TIMEOUT_SECONDS: f64 = 15.0;
const MAX_TIMEOUT_SECONDS: f64 = 300.0;

pub const ROLE_PREAMBLE: &str = "Context: The first image is the 'Target Player'. The second image is the 'Reference Jersey'. Task: ";

const MISSING_KEY_MESSAGE: &str = "GEMINI_API_KEY or GOOGLE_API_KEY or API_KEY not set";

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_s: f64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_s: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: non_empty_env("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            api_key: non_empty_env("GEMINI_API_KEY")
                .or_else(|| non_empty_env("GOOGLE_API_KEY"))
                .or_else(|| non_empty_env("API_KEY")),
            model: non_empty_env("KITFUSION_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            timeout_s: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model.map(str::trim).filter(|value| !value.is_empty()) {
            self.model = model.to_string();
        }
        self
    }

    pub fn with_timeout(mut self, timeout_s: Option<f64>) -> Self {
        if let Some(timeout_s) = timeout_s {
            self.timeout_s = clamp_timeout_seconds(timeout_s);
        }
        self
    }
}

pub fn clamp_timeout_seconds(value: f64) -> f64 {
    if !value.is_finite() {
        return DEFAULT_TIMEOUT_SECONDS;
    }
    value.clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS)
}

pub struct GeminiClient {
    config: GeminiConfig,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let trimmed = self.config.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn build_parts(request: &FusionRequest) -> Vec<Value> {
        vec![
            json!({ "text": format!("{ROLE_PREAMBLE}{}", request.instruction) }),
            json!({
                "inlineData": {
                    "mimeType": request.person.mime(),
                    "data": request.person.data(),
                }
            }),
            json!({
                "inlineData": {
                    "mimeType": request.garment.mime(),
                    "data": request.garment.data(),
                }
            }),
        ]
    }

    fn build_payload(request: &FusionRequest) -> Map<String, Value> {
        map_object(json!({
            "contents": [{
                "role": "user",
                "parts": Self::build_parts(request),
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"],
            },
        }))
    }

    fn post(&self, endpoint: &str, api_key: &str, payload: &Value) -> Result<HttpResponse> {
        self.http
            .post(endpoint)
            .query(&[("key", api_key)])
            .timeout(Duration::from_secs_f64(self.config.timeout_s))
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))
    }
}

impl GenerationClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }

    fn fuse(&self, request: &FusionRequest) -> Result<FusionResponse, GenerationFailure> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(GenerationFailure::transport(MISSING_KEY_MESSAGE));
        };
        let endpoint = self.endpoint();
        let payload = Self::build_payload(request);
        log::info!(
            "sending fusion request to {} (timeout {}s, person {}, garment {})",
            self.config.model,
            self.config.timeout_s,
            request.person.mime(),
            request.garment.mime()
        );

        let response_payload = self
            .post(&endpoint, api_key, &Value::Object(payload.clone()))
            .and_then(|response| response_json_or_error("Gemini", response))
            .map_err(|err| {
                log::warn!("fusion transport failure: {}", error_chain_text(&err, 400));
                GenerationFailure::transport(error_chain_text(&err, 800))
            })?;

        let parsed = GenerationResponse::from_value(&response_payload);
        log::debug!(
            "parsed fusion response: {} candidates, {} parts",
            parsed.candidates.len(),
            parsed.part_count()
        );
        let image = extract_result(&parsed)?;

        Ok(FusionResponse {
            image,
            provider_request: map_object(json!({
                "endpoint": endpoint,
                "payload": payload,
            })),
            provider_response: map_object(json!({
                "candidates": parsed.candidates.len(),
                "parts": parsed.part_count(),
                "usage_metadata": response_payload
                    .get("usageMetadata")
                    .cloned()
                    .unwrap_or(Value::Null),
                "prompt_feedback": response_payload
                    .get("promptFeedback")
                    .cloned()
                    .unwrap_or(Value::Null),
            })),
        })
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    parse_response_body(provider, code, status.is_success(), &body)
}

fn parse_response_body(provider: &str, code: u16, success: bool, body: &str) -> Result<Value> {
    if !success {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(body, 512)
        );
    }
    serde_json::from_str(body).with_context(|| format!("{provider} returned invalid JSON payload"))
}
