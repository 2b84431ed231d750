use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use url::Url;

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, InferenceError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// `Some(0)` disables model-side thinking for faster plain prose.
    pub thinking_budget: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            thinking_budget: None,
        }
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

/// A hosted text-completion endpoint. Returns the response text, which may
/// be empty.
pub trait Completion: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_>;
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("inference API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: Url,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self, InferenceError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(&base)?,
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<Url, InferenceError> {
        let mut url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn generate(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(self.endpoint()?)
            .json(&request_body(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| InferenceError::Malformed(format!("invalid JSON: {e}")))?;
        Ok(parse_response_text(&value)?.unwrap_or_default())
    }
}

impl Completion for GeminiClient {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(self.generate(request))
    }
}

pub fn request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }]
        }]
    });
    if let Some(budget) = request.thinking_budget {
        body["generationConfig"] = json!({
            "thinkingConfig": { "thinkingBudget": budget }
        });
    }
    body
}

/// First text part of the first candidate, if any.
pub fn parse_response_text(value: &Value) -> Result<Option<String>, InferenceError> {
    if let Some(error) = value.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(InferenceError::Api {
            status: error["code"].as_u64().unwrap_or(0) as u16,
            message: message.to_string(),
        });
    }

    Ok(value["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()))
        .map(str::to_string))
}
