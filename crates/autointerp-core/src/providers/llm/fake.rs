use super::{Generation, GenerationParams, Generator, Message};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Responder = dyn Fn(&[Message]) -> anyhow::Result<String> + Send + Sync;

/// Offline backend with scripted output, for tests and dry runs.
pub struct FakeGenerator {
    model: String,
    responder: Arc<Responder>,
    latency_ms: Option<(u64, u64)>,
    calls: AtomicUsize,
}

impl FakeGenerator {
    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_fn(move |_| Ok(text.clone()))
    }

    /// Answer by calling `f` with the request messages.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Message]) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            model: "fake".to_string(),
            responder: Arc::new(f),
            latency_ms: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_| Err(anyhow::anyhow!("{}", message)))
    }

    /// Sleep a random duration in `[min_ms, max_ms]` before answering.
    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.latency_ms = Some((min_ms.min(max_ms), max_ms.max(min_ms)));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(
        &self,
        messages: &[Message],
        _params: &GenerationParams,
    ) -> anyhow::Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((min, max)) = self.latency_ms {
            let delay = rand::thread_rng().gen_range(min..=max);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let text = (self.responder)(messages)?;
        Ok(Generation {
            text,
            provider: "fake".to_string(),
            model: self.model.clone(),
            meta: serde_json::Value::Null,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
