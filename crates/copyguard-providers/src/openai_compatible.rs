//! Unified OpenAI-compatible provider.
//!
//! A single struct that speaks chat completions and embeddings for every
//! OpenAI-compatible API. Providers differ only by endpoint URL, auth style,
//! API key and model.

use std::time::Duration;

use async_trait::async_trait;
use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::{CompletionRequest, Completer, Embedder};
use serde_json::{Value, json};

use crate::provider_registry::{AuthStyle, ProviderConfig};

/// Connection settings for one service, lifted out of a config section.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub provider: String,
    pub model: String,
    /// Already resolved against the shared top-level key.
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

/// A unified provider that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    /// Provider name (e.g., "openai", "siliconflow").
    name: String,
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    chat_path: String,
    embeddings_path: String,
    auth_style: AuthStyle,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a known provider config.
    ///
    /// Resolution order:
    /// - API key: `settings.api_key` > registry env vars > empty
    /// - Base URL: `settings.endpoint` > env override > registry default
    /// - Model: `settings.model` > registry default (chat or embedding)
    pub fn from_registry(
        registry: &ProviderConfig,
        settings: &ServiceSettings,
        embedding: bool,
    ) -> Result<Self> {
        let api_key = if !settings.api_key.is_empty() {
            settings.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !settings.endpoint.is_empty() {
            settings.endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // OLLAMA_HOST / LLAMACPP_HOST usually omit the /v1 suffix
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        let model = if !settings.model.is_empty() {
            settings.model.clone()
        } else if embedding {
            registry.default_embedding_model.to_string()
        } else {
            registry.default_chat_model.to_string()
        };
        if model.is_empty() {
            return Err(CopyGuardError::Config(format!(
                "no {} model configured for provider '{}'",
                if embedding { "embedding" } else { "chat" },
                registry.name
            )));
        }

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            embeddings_path: registry.embeddings_path.to_string(),
            auth_style: registry.auth_style,
            model,
            client: build_client(settings.timeout)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, settings: &ServiceSettings) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();
        if base_url.is_empty() {
            return Err(CopyGuardError::Config("custom provider has no URL".into()));
        }
        if settings.model.is_empty() {
            return Err(CopyGuardError::Config(
                "custom provider requires an explicit model".into(),
            ));
        }

        let api_key = if !settings.api_key.is_empty() {
            settings.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: "/chat/completions".to_string(),
            embeddings_path: "/embeddings".to_string(),
            auth_style,
            model: settings.model.clone(),
            client: build_client(settings.timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    fn ensure_key(&self) -> Result<()> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(CopyGuardError::ApiKeyMissing(self.name.clone()));
        }
        Ok(())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        self.apply_auth(req).send().await.map_err(|e| {
            CopyGuardError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })
    }

    /// Send a chat request with arbitrary `messages` and return the first
    /// choice's text content.
    ///
    /// With `json_mode`, asks for `response_format = json_object` and retries
    /// once without it if the backend rejects the field.
    pub async fn chat(
        &self,
        messages: Value,
        temperature: f32,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String> {
        self.ensure_key()?;

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let resp = self.post(&self.chat_path, &body).await?;
        let resp = if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();

            if status.as_u16() == 400 && json_mode && text.contains("response_format") {
                tracing::warn!(
                    "Model '{}' rejected response_format, retrying without it",
                    self.model
                );
                body.as_object_mut().map(|m| m.remove("response_format"));
                let retry = self.post(&self.chat_path, &body).await?;
                if !retry.status().is_success() {
                    let rs = retry.status();
                    let rt = retry.text().await.unwrap_or_default();
                    return Err(CopyGuardError::Provider(format!(
                        "{} API error {} (retry without response_format): {}",
                        self.name, rs, rt
                    )));
                }
                retry
            } else {
                return Err(CopyGuardError::Provider(format!(
                    "{} API error {}: {}",
                    self.name, status, text
                )));
            }
        } else {
            resp
        };

        let json: Value = resp
            .json()
            .await
            .map_err(|e| CopyGuardError::Http(e.to_string()))?;
        extract_message_content(&json)
            .ok_or_else(|| CopyGuardError::Provider(format!("{}: no choices in response", self.name)))
    }

    async fn embeddings(&self, input: Value) -> Result<Vec<Vec<f32>>> {
        self.ensure_key()?;

        let body = json!({
            "model": self.model,
            "input": input,
        });
        let resp = self.post(&self.embeddings_path, &body).await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CopyGuardError::Provider(format!(
                "{} embeddings error {}: {}",
                self.name, status, text
            )));
        }
        let json: Value = resp
            .json()
            .await
            .map_err(|e| CopyGuardError::Http(e.to_string()))?;
        parse_embeddings(&json).ok_or_else(|| {
            CopyGuardError::Provider(format!("{}: malformed embeddings response", self.name))
        })
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CopyGuardError::Http(format!("failed to build HTTP client: {e}")))
}

/// `choices[0].message.content` of a chat completion response.
fn extract_message_content(json: &Value) -> Option<String> {
    json["choices"]
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(String::from)
}

/// Vectors of an embeddings response, ordered by their `index` field.
fn parse_embeddings(json: &Value) -> Option<Vec<Vec<f32>>> {
    let data = json["data"].as_array()?;
    let mut rows: Vec<(u64, Vec<f32>)> = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item["index"].as_u64().unwrap_or(pos as u64);
        let vector = item["embedding"]
            .as_array()?
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()?;
        rows.push((index, vector));
    }
    rows.sort_by_key(|(index, _)| *index);
    Some(rows.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl Completer for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let messages = json!([{ "role": "user", "content": request.prompt }]);
        self.chat(
            messages,
            request.temperature,
            request.max_tokens,
            request.schema.is_some(),
        )
        .await
    }
}

#[async_trait]
impl Embedder for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embeddings(json!(text)).await?;
        if vectors.len() != 1 {
            return Err(CopyGuardError::Provider(format!(
                "{}: expected 1 embedding, got {}",
                self.name,
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let vectors = self.embeddings(json!(texts)).await?;
        if vectors.len() != texts.len() {
            return Err(CopyGuardError::Provider(format!(
                "{}: expected {} embeddings, got {}",
                self.name,
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}
