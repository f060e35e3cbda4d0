use serde::{Deserialize, Serialize};

use super::prompt::{build_scoring_prompt, SCORING_SYSTEM_PROMPT};
use super::types::{OracleRequest, ReasoningOracle};
use super::OracleError;
use crate::config::OracleConfig;

/// Reasoning oracle backed by a local Ollama instance (`/api/generate`).
pub struct OllamaOracle {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl ReasoningOracle for OllamaOracle {
    async fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = build_scoring_prompt(request);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: SCORING_SYSTEM_PROMPT,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };

        tracing::debug!(
            principle_id = %request.principle.id,
            evidence = request.evidence.len(),
            corrective = request.correction.is_some(),
            "Invoking oracle"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => OracleError::RateLimited,
                s if status.is_server_error() => OracleError::Server { status: s, body },
                s => OracleError::Rejected { status: s, body },
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout_secs)
                } else {
                    OracleError::InvalidResponse(e.to_string())
                }
            })?;

        Ok(parsed.response)
    }
}

impl OllamaOracle {
    fn map_transport_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_connect() {
            OracleError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            OracleError::Timeout(self.timeout_secs)
        } else {
            OracleError::HttpClient(e.to_string())
        }
    }
}
