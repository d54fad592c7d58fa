use super::{Generation, GenerationParams, Generator, Message};
use crate::config::BackendConfig;
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// OpenAI-compatible chat-completions backend.
///
/// Works against api.openai.com as well as self-hosted servers exposing the
/// same `/chat/completions` route.
pub struct OpenAIClient {
    pub model: String,
    pub api_key: Option<String>,
    endpoint: String,
    max_retries: u32,
    retry_base: Duration,
    client: reqwest::Client,
}

/// Whether a failed attempt is worth repeating.
enum Attempt {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

impl OpenAIClient {
    pub fn new(config: &BackendConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_retries: config.max_retries,
            retry_base: Duration::from_millis(config.retry_base_ms.max(1)),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, messages: &[Message], params: &GenerationParams) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), json!(self.model));
        body.insert("messages".to_string(), json!(messages));
        if let Some(temperature) = params.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = params.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }
        for (key, value) in &params.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }

    fn backoff(&self, retry: u32) -> Duration {
        let base = self
            .retry_base
            .saturating_mul(1 << retry.saturating_sub(1).min(16))
            .min(MAX_BACKOFF);
        let jittered_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64);
        Duration::from_millis(jittered_ms.max(1))
    }

    async fn send_once(&self, body: &Value) -> Result<Value, Attempt> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| {
            let err = anyhow::anyhow!("chat API request failed: {}", e);
            if e.is_builder() {
                Attempt::Fatal(err)
            } else {
                Attempt::Retryable(err)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let err = anyhow::anyhow!("chat API error (status {}): {}", status, error_text);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Attempt::Retryable(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        resp.json().await.map_err(|e| {
            Attempt::Fatal(anyhow::anyhow!("chat API returned invalid JSON: {}", e))
        })
    }
}

#[async_trait]
impl Generator for OpenAIClient {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> anyhow::Result<Generation> {
        let body = self.request_body(messages, params);

        let mut retries = 0;
        let json = loop {
            match self.send_once(&body).await {
                Ok(json) => break json,
                Err(Attempt::Retryable(e)) if retries < self.max_retries => {
                    retries += 1;
                    let backoff = self.backoff(retries);
                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying generation request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(Attempt::Retryable(e)) | Err(Attempt::Fatal(e)) => return Err(e),
            }
        };

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("chat API response missing content"))?
            .to_string();

        let model = json
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(self.model.as_str())
            .to_string();

        let mut meta = json!({ "retries": retries });
        if let Some(usage) = json.get("usage") {
            meta["usage"] = json!({
                "input_tokens": usage.get("prompt_tokens").cloned().unwrap_or(Value::Null),
                "output_tokens": usage.get("completion_tokens").cloned().unwrap_or(Value::Null),
            });
        }
        debug!(model = %model, retries, "generation complete");

        Ok(Generation {
            text,
            provider: "openai".to_string(),
            model,
            meta,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
