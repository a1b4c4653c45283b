//! GeminiImageBackend - Direct REST API implementation of the image backend.
//!
//! Calls `generateContent` on a Gemini image model with the reference images
//! sent inline as base64 parts. The API key is loaded through the
//! [`SecretService`]; the model and request timeout come from `config.toml`.

use crate::prompts;
use async_trait::async_trait;
use makeover_core::backend::ImageBackend;
use makeover_core::config::RootConfig;
use makeover_core::error::{MakeoverError, Result};
use makeover_core::image::{Artifact, ImageRef};
use makeover_core::secret::SecretService;
use makeover_core::slot::GenerationInputs;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Image backend that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiImageBackend {
    client: Client,
    api_key: String,
    model: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for GeminiImageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiImageBackend")
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiImageBackend {
    /// Creates a new backend with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            request_timeout: Duration::from_secs(
                makeover_core::config::DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
        }
    }

    /// Builds the backend from the loaded secrets and configuration.
    ///
    /// A `model_name` in `secret.json` overrides `[backend] model`.
    pub async fn try_from_services(
        secrets: &dyn SecretService,
        config: &RootConfig,
    ) -> Result<Self> {
        let secret_config = secrets.load_secrets().await?;
        let gemini = secret_config.gemini.ok_or_else(|| {
            MakeoverError::config(
                "Gemini API key not found: set GEMINI_API_KEY or add it to secret.json",
            )
        })?;

        let mut backend = Self::new(gemini.api_key, config.backend.model.clone())
            .with_request_timeout(Duration::from_secs(config.backend.request_timeout_secs));
        if let Some(model) = gemini.model_name.filter(|name| !name.trim().is_empty()) {
            backend = backend.with_model(model);
        }
        Ok(backend)
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one request, bounded by the configured timeout.
    async fn generate(&self, parts: Vec<Part>) -> Result<Artifact> {
        let request = GenerateContentRequest::new(parts);
        tracing::debug!(model = %self.model, parts = request.contents[0].parts.len(), "Sending Gemini request");

        match tokio::time::timeout(self.request_timeout, self.send_request(&request)).await {
            Ok(result) => result,
            Err(_) => Err(MakeoverError::backend(format!(
                "Gemini API request timed out after {} seconds",
                self.request_timeout.as_secs()
            ))),
        }
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<Artifact> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            BASE_URL,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            // without_url keeps the key out of the message
            .map_err(|err| {
                MakeoverError::backend(format!("Gemini API request failed: {}", err.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after).into_backend_error());
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            MakeoverError::backend(format!("Failed to parse Gemini response: {}", err.without_url()))
        })?;

        extract_image_response(parsed)
    }
}

#[async_trait]
impl ImageBackend for GeminiImageBackend {
    async fn generate_composite(&self, inputs: &GenerationInputs) -> Result<Artifact> {
        tracing::info!(
            model = %self.model,
            images = inputs.image_count(),
            "Requesting makeover composite"
        );
        self.generate(composite_parts(inputs)).await
    }

    async fn generate_adjustment(&self, source: &ImageRef, instruction: &str) -> Result<Artifact> {
        tracing::info!(model = %self.model, source = source.name(), "Requesting adjustment");
        self.generate(adjustment_parts(source, instruction)).await
    }
}

/// Captioned image parts followed by the closing instruction.
fn composite_parts(inputs: &GenerationInputs) -> Vec<Part> {
    let mut parts = Vec::with_capacity(inputs.image_count() * 2 + 1);

    parts.push(Part::text(prompts::PORTRAIT_CAPTION));
    parts.push(Part::image(&inputs.portrait));

    for (position, element) in inputs.elements.iter().enumerate() {
        parts.push(Part::text(prompts::element_caption(position + 1)));
        parts.push(Part::image(element));
    }

    if let Some(vibe) = &inputs.vibe {
        parts.push(Part::text(prompts::VIBE_CAPTION));
        parts.push(Part::image(vibe));
    }

    parts.push(Part::text(prompts::makeover_prompt(
        inputs.elements.len(),
        inputs.vibe.is_some(),
    )));
    parts
}

fn adjustment_parts(source: &ImageRef, instruction: &str) -> Vec<Part> {
    vec![
        Part::image(source),
        Part::text(prompts::adjustment_prompt(instruction)),
    ]
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn new(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    fn image(image: &ImageRef) -> Self {
        Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: image.mime_type().to_string(),
                data: image.to_base64(),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    text: Option<String>,
    inline_data: Option<InlineDataPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

/// Takes the first inline image of the first candidate.
///
/// Without an image, any text the model returned (typically a refusal) is
/// carried in the error.
fn extract_image_response(response: GenerateContentResponse) -> Result<Artifact> {
    let block_reason = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason);

    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next());

    let Some(candidate) = candidate else {
        return Err(MakeoverError::backend(match block_reason {
            Some(reason) => format!("Gemini API blocked the request ({reason})"),
            None => "Gemini API returned no candidates".to_string(),
        }));
    };

    let finish_reason = candidate.finish_reason;
    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    let mut texts = Vec::new();
    for part in parts {
        if let Some(inline) = part.inline_data {
            return Artifact::from_base64(inline.mime_type, &inline.data).map_err(|err| {
                MakeoverError::backend(format!("Gemini API returned an undecodable image: {err}"))
            });
        }
        if let Some(text) = part.text.filter(|text| !text.trim().is_empty()) {
            texts.push(text);
        }
    }

    let mut message = "The model did not return an image".to_string();
    if let Some(reason) = finish_reason.filter(|reason| reason != "STOP") {
        message.push_str(&format!(" ({reason})"));
    }
    if !texts.is_empty() {
        message.push_str(": ");
        message.push_str(texts.join(" ").trim());
    }
    Err(MakeoverError::backend(message))
}

/// Classified HTTP failure. Retryability is logged only; requests are never
/// retried automatically.
#[derive(Debug)]
struct HttpFailure {
    status: StatusCode,
    message: String,
    is_retryable: bool,
    retry_after: Option<Duration>,
}

impl HttpFailure {
    fn into_backend_error(self) -> MakeoverError {
        tracing::warn!(
            status = self.status.as_u16(),
            retryable = self.is_retryable,
            retry_after_secs = self.retry_after.map(|delay| delay.as_secs()),
            "Gemini API returned an error status"
        );
        MakeoverError::backend(format!(
            "Gemini API error {}: {}",
            self.status.as_u16(),
            self.message
        ))
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> HttpFailure {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    HttpFailure {
        status,
        message,
        is_retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // HTTP-date values are ignored
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
