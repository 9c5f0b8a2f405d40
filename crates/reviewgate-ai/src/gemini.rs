//! HTTP backend for Google's Gemini `generateContent` endpoint.

use async_trait::async_trait;
use reviewgate_core::ClassifierConfig;
use serde_json::{Value, json};
use tracing::info;

use crate::{ClassifierError, LlmBackend, Prompt};

/// Gemini REST client.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client from the classifier configuration.
    ///
    /// The endpoint should be like `https://generativelanguage.googleapis.com`;
    /// a trailing slash is tolerated.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl LlmBackend for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ClassifierError> {
        let url = self.url();
        info!(model = %self.model, "calling classifier");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClassifierError::Provider {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        extract_text(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn request_body(prompt: &Prompt) -> Value {
    let mut generation_config = json!({ "temperature": 0.0 });
    if let Some(schema) = &prompt.response_schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.clone();
    }
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt.text }]
        }],
        "generationConfig": generation_config
    })
}

/// Pull a readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Extract generated text from a successful response body.
///
/// An `error` object is a provider error. Anything else that lacks text
/// yields an empty string, which the parser turns into a fallback.
fn extract_text(body: &str) -> Result<String, ClassifierError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(body.to_string());
    };

    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        return Err(ClassifierError::Api {
            code: err["code"].as_i64().unwrap_or_default(),
            message: err["message"]
                .as_str()
                .unwrap_or("unspecified provider error")
                .to_string(),
        });
    }

    let text = value["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}
