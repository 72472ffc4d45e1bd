//! HTTP adapter for the completion gateway port.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::from_status;
use super::streaming::SseStream;
use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::domain::errors::GatewayError;
use crate::domain::models::GatewayConfig;
use crate::domain::ports::{
    Completion, CompletionGateway, CompletionRequest, FragmentStream, GatewayResult, ModelTier,
    Structured,
};

/// Completion gateway over the generateContent HTTP API.
///
/// One pooled reqwest client serves all in-flight calls; no retry and no
/// rate limiting (failures surface once and the engine never re-issues a
/// call).
pub struct HttpGateway {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    fast_model: String,
    capable_model: String,
}

impl HttpGateway {
    /// Build from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).with_context(|| {
            format!("API key environment variable {} not set", config.api_key_env)
        })?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fast_model: config.fast_model.clone(),
            capable_model: config.capable_model.clone(),
        })
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Capable => &self.capable_model,
        }
    }

    fn wire_request(request: &CompletionRequest) -> GenerateContentRequest {
        let mut wire = GenerateContentRequest::from_prompt(&request.prompt);
        if let Some(system) = &request.system {
            wire = wire.with_system(system);
        }
        if let Some(shape) = &request.output_shape {
            wire = wire.with_response_schema(shape.schema.clone());
        }
        wire
    }

    async fn post(
        &self,
        url: String,
        wire: &GenerateContentRequest,
    ) -> GatewayResult<reqwest::Response> {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(wire)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error response".to_string());
            return Err(from_status(status, body));
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionGateway for HttpGateway {
    #[instrument(skip_all, fields(tier = ?request.tier, shape = request.output_shape.as_ref().map(|s| s.name)))]
    async fn complete(&self, request: CompletionRequest) -> GatewayResult<Completion> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model(request.tier)
        );
        let wire = Self::wire_request(&request);
        let response = self.post(url, &wire).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?;
        let text = body.text();
        debug!(chars = text.len(), "completion received");

        if request.output_shape.is_none() {
            return Ok(Completion::Text(text));
        }

        // Structured call: parse the JSON payload; the caller decides what
        // a parse failure means.
        let structured = match serde_json::from_str(&text) {
            Ok(value) => Structured::Parsed(value),
            Err(err) => Structured::ParseFailure {
                raw: text,
                reason: err.to_string(),
            },
        };
        Ok(Completion::Structured(structured))
    }

    #[instrument(skip_all, fields(tier = ?request.tier))]
    async fn complete_streaming(
        &self,
        request: CompletionRequest,
    ) -> GatewayResult<FragmentStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            self.model(request.tier)
        );
        let wire = Self::wire_request(&request);
        let response = self.post(url, &wire).await?;

        let bytes = response.bytes_stream().map_err(GatewayError::from);
        let fragments = SseStream::new(bytes)
            .map(|payload| payload.and_then(|p| chunk_text(&p)))
            .filter_map(|result| async move {
                match result {
                    Ok(None) => None,
                    Ok(Some(fragment)) => Some(Ok(fragment)),
                    Err(err) => Some(Err(err)),
                }
            });
        Ok(Box::pin(fragments))
    }
}

/// Extract the text fragment from one streamed chunk; chunks without text
/// (metadata-only) yield None.
fn chunk_text(payload: &str) -> GatewayResult<Option<String>> {
    let chunk: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|err| GatewayError::MalformedResponse(format!("bad stream chunk: {err}")))?;
    let text = chunk.text();
    Ok((!text.is_empty()).then_some(text))
}
