//! Gemini `generateContent` client.

use std::fmt;

use toolcat_core::{
    DispatchRequest, FunctionSpec,
    config::{ConfigError, ModelConfig},
};
use tracing::{debug, instrument, warn};

use crate::{
    prompt::TextQaPrompt,
    wire::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Tool},
};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GeminiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Gemini request failed ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The model answered in text instead of choosing a function.
    #[error("model did not call a function; it replied: {0}")]
    NoFunctionCall(String),

    #[error("model returned no candidates")]
    EmptyResponse,

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),
}

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`GeminiError::InvalidEndpoint`] if `endpoint` is not an
    /// absolute URL.
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        let base_url = reqwest::Url::parse(endpoint.trim().trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GeminiError::InvalidEndpoint(endpoint.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// # Errors
    ///
    /// Returns [`GeminiError::Config`] if the settings are invalid or the API
    /// key cannot be resolved.
    pub fn from_config(config: &ModelConfig) -> Result<Self, GeminiError> {
        config.validate()?;
        Self::new(reqwest::Client::new(), &config.endpoint, config.api_key()?)
    }

    /// Asks `model` to pick one of `functions` for `prompt`.
    ///
    /// Returns the first function call in the first candidate. Only one call
    /// is taken even if the model proposes several.
    #[instrument(skip(self, prompt, functions), fields(functions = functions.len()))]
    pub async fn choose_function(
        &self,
        model: &str,
        prompt: &str,
        functions: &[&FunctionSpec],
        temperature: f32,
    ) -> Result<DispatchRequest, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            tools: vec![Tool {
                function_declarations: functions,
            }],
            generation_config: Some(GenerationConfig { temperature }),
        };

        let parts = self
            .generate(model, &request)
            .await?
            .into_first_parts()
            .ok_or(GeminiError::EmptyResponse)?;

        let mut text = String::new();
        for part in parts {
            if let Some(call) = part.function_call {
                debug!(function = %call.name, "Model chose function");
                return Ok(DispatchRequest::new(call.name, call.args));
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }
        Err(GeminiError::NoFunctionCall(text))
    }

    /// Plain text completion of `prompt`.
    #[instrument(skip(self, prompt))]
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            tools: Vec::new(),
            generation_config: None,
        };
        self.generate_text(model, &request).await
    }

    /// Answers a question-answering prompt, sending its rules as the system
    /// instruction.
    #[instrument(skip(self, prompt))]
    pub async fn answer(&self, model: &str, prompt: &TextQaPrompt) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(&prompt.user)],
            system_instruction: Some(Content::system(&prompt.system)),
            tools: Vec::new(),
            generation_config: None,
        };
        self.generate_text(model, &request).await
    }

    async fn generate_text(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<String, GeminiError> {
        let parts = self
            .generate(model, request)
            .await?
            .into_first_parts()
            .ok_or(GeminiError::EmptyResponse)?;
        Ok(parts.into_iter().filter_map(|p| p.text).collect())
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GeminiError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .push("models")
            .push(&format!("{model}:generateContent"));

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(%status, error = %e, "Failed to read Gemini error body");
                format!("<unreadable body: {e}>")
            });
            Err(GeminiError::Api { status, body })
        }
    }
}
