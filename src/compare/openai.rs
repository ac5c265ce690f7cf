use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::ComparisonError;

use super::{ComparisonRequest, ComparisonService};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// OpenAI-compatible chat completions endpoint. One POST per comparison, no
/// conversation state, no retries.
pub struct OpenAiService {
    http: Client,
    config: ServiceConfig,
}

impl OpenAiService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { http, config })
    }

    /// Lists the models visible to the configured key; used to check that
    /// the key is valid before a run.
    pub fn list_models(&self) -> Result<Vec<String>, ComparisonError> {
        let response = self
            .http
            .get(format!("{}/models", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .send()?;
        let response = check_status(response)?;

        let models: ModelList = response.json()?;
        Ok(models.data.into_iter().map(|model| model.id).collect())
    }
}

impl ComparisonService for OpenAiService {
    fn compare(&self, request: &ComparisonRequest) -> Result<String, ComparisonError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()?;
        let response = check_status(response)?;

        let parsed: ChatResponse = response.json()?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ComparisonError::InvalidResponse("no choices in response".to_string()))?;

        debug!(chars = content.len(), "received comparison response");
        Ok(content.trim().to_string())
    }
}

fn check_status(response: Response) -> Result<Response, ComparisonError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or(body);

    Err(ComparisonError::Api {
        status: status.as_u16(),
        message,
    })
}
