//! Language-model oracles for the descent classifier.
//!
//! Defines the concrete [`Oracle`] implementations:
//! - **[`DisabledOracle`]**: returns errors; used when no model is configured.
//! - **[`OpenAIOracle`]**: calls the OpenAI chat completions API.
//! - **[`OllamaOracle`]**: calls a local Ollama instance's `/api/generate` endpoint.
//!
//! All providers send the same prompt ([`render_prompt`]) with the
//! configured temperature (0 by default, so repeated questions tend to get
//! the same answer) and reduce the model's reply to a single token with
//! [`extract_token`].
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::classify::{JudgeRequest, Oracle, STOP_TOKEN};
use crate::config::OracleConfig;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Render the question put to the language model.
///
/// ```text
/// Which does the query belong to? Reply JUST the number or "parent" to stop at 600 Technology.
/// Query: "dog breeding"
/// Breadcrumb: Technology
/// Options: 610 Medicine, 620 Engineering, 630 Agriculture
/// ```
pub fn render_prompt(request: &JudgeRequest<'_>) -> String {
    let mut prompt = String::from("Which does the query belong to? Reply JUST the number");
    if let Some(parent) = request.parent {
        prompt.push_str(&format!(" or \"{}\" to stop at {}.", STOP_TOKEN, parent));
    }
    prompt.push_str(&format!("\nQuery: \"{}\"", request.query));
    if !request.breadcrumb.is_empty() {
        prompt.push_str(&format!("\nBreadcrumb: {}", request.breadcrumb));
    }
    prompt.push_str(&format!("\nOptions: {}\n", request.options.join(", ")));
    prompt
}

/// Reduce a model reply to its answer token: the first word, without
/// surrounding quotes or trailing punctuation.
pub fn extract_token(reply: &str) -> Option<String> {
    let word = reply.split_whitespace().next()?;
    let token = word
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*'))
        .trim_end_matches(|c| matches!(c, '.' | ',' | ':' | ';'));
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

// ============ Disabled Oracle ============

/// An oracle that always fails.
///
/// Used when `oracle.provider = "disabled"` in the configuration.
pub struct DisabledOracle;

#[async_trait]
impl Oracle for DisabledOracle {
    async fn judge(&self, _request: &JudgeRequest<'_>) -> Result<String> {
        bail!("Oracle provider is disabled")
    }
}

// ============ OpenAI Oracle ============

/// Oracle backed by the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAIOracle {
    /// Create a new OpenAI oracle from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            client: build_client(config)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Oracle for OpenAIOracle {
    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<String> {
        let prompt = render_prompt(request);
        debug!(%prompt, "asking OpenAI");

        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let json = send_with_retry("OpenAI", self.max_retries, || {
            self.client
                .post(OPENAI_CHAT_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
        })
        .await?;

        let reply = parse_openai_response(&json)?;
        extract_token(&reply).ok_or_else(|| anyhow::anyhow!("OpenAI returned an empty reply"))
    }
}

/// Extract `choices[0].message.content` from a chat completion.
fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

// ============ Ollama Oracle ============

/// Oracle backed by a local Ollama instance.
///
/// Calls `POST /api/generate` on the configured URL (default:
/// `http://localhost:11434`).
pub struct OllamaOracle {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client: build_client(config)?,
            url: url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<String> {
        let prompt = render_prompt(request);
        debug!(%prompt, "asking Ollama");

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        let endpoint = format!("{}/api/generate", self.url);
        let json = send_with_retry("Ollama", self.max_retries, || {
            self.client.post(&endpoint).json(&body)
        })
        .await
        .with_context(|| format!("Ollama request failed (is Ollama running at {}?)", self.url))?;

        let reply = json
            .get("response")
            .and_then(|r| r.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response"))?;
        extract_token(reply).ok_or_else(|| anyhow::anyhow!("Ollama returned an empty reply"))
    }
}

// ============ Shared HTTP plumbing ============

fn build_client(config: &OracleConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create HTTP client")
}

/// Send a JSON request, retrying rate limits, server errors and network
/// errors with exponential backoff.
async fn send_with_retry<F>(label: &str, max_retries: u32, request: F) -> Result<serde_json::Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        match request().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("{} API error {}: {}", label, status, body_text));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", label)))
}

/// Create the [`Oracle`] selected by the configuration.
///
/// | Config Value | Oracle |
/// |-------------|--------|
/// | `"disabled"` | [`DisabledOracle`] |
/// | `"openai"` | [`OpenAIOracle`] |
/// | `"ollama"` | [`OllamaOracle`] |
pub fn create_oracle(config: &OracleConfig) -> Result<Arc<dyn Oracle>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledOracle)),
        "openai" => Ok(Arc::new(OpenAIOracle::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaOracle::new(config)?)),
        other => bail!("Unknown oracle provider: {}", other),
    }
}
