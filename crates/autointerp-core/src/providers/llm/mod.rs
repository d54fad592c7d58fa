//! Text-generation backends.
//!
//! The explainer only depends on [`Generator`]; any backend that can turn an
//! ordered list of role-tagged messages into text can be plugged in.

pub mod fake;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation options. `extra` is passed through to the backend untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub provider: String,
    pub model: String,
    /// Backend-specific details such as token usage.
    #[serde(default)]
    pub meta: Value,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> anyhow::Result<Generation>;

    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(Message::system("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "hi"}));
    }

    #[test]
    fn params_flatten_extra_options() {
        let params: GenerationParams = serde_json::from_value(serde_json::json!({
            "temperature": 0.0,
            "max_tokens": 100,
            "stop": ["\n\n"]
        }))
        .unwrap();
        assert_eq!(params.temperature, Some(0.0));
        assert_eq!(params.max_tokens, Some(100));
        assert_eq!(params.extra.len(), 1);

        let back = serde_json::to_value(&params).unwrap();
        assert_eq!(back["stop"], serde_json::json!(["\n\n"]));
    }
}
