//! OpenAI-compatible embeddings and chat completions client.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Embedder, Generator};
use crawliq_core::{AppConfig, Error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Checked when a request is made, not at construction.
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            generation_model: "gpt-5".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&AppConfig> for OpenAiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().filter(|key| !key.is_empty()),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI API client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::ProviderFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderFailed("missing API key: set CRAWLIQ_OPENAI_API_KEY".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .map_err(|_| Error::ProviderFailed("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn post<Req: Serialize + Sync, Resp: for<'de> Deserialize<'de>>(
        &self, path: &str, request: &Req,
    ) -> Result<Resp, Error> {
        let url = format!("{}/{path}", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::ProviderFailed(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::ProviderFailed(format!("OpenAI API error ({status}): {error_text}")));
        }

        response
            .json()
            .await
            .map_err(|e| Error::ProviderFailed(format!("invalid OpenAI response: {e}")))
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(model = %self.config.embedding_model, inputs = texts.len(), "OpenAI embedding request");

        let request = EmbeddingRequest { model: &self.config.embedding_model, input: texts };
        let mut response: EmbeddingResponse = self.post("embeddings", &request).await?;

        response.data.sort_by_key(|entry| entry.index);
        if response.data.len() != texts.len() {
            return Err(Error::ProviderFailed(format!(
                "OpenAI returned {} embeddings for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }

        Ok(response.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl Generator for OpenAiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, Error> {
        tracing::debug!(model = %self.config.generation_model, "OpenAI chat request");

        let request = ChatRequest {
            model: &self.config.generation_model,
            messages: [ChatMessage { role: "system", content: system }, ChatMessage { role: "user", content: user }],
        };
        let response: ChatResponse = self.post("chat/completions", &request).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            openai_api_key: Some("sk-test".into()),
            openai_base_url: "http://localhost:8080/v1/".into(),
            ..Default::default()
        };
        let config = OpenAiConfig::from(&app);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.generation_model, "gpt-5");
    }

    #[test]
    fn test_headers_require_key() {
        let client = OpenAiClient::new(OpenAiConfig::default()).unwrap();
        assert!(matches!(client.headers(), Err(Error::ProviderFailed(_))));

        let client = OpenAiClient::new(OpenAiConfig { api_key: Some("sk-test".into()), ..Default::default() }).unwrap();
        let headers = client.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = OpenAiClient::new(OpenAiConfig::default()).unwrap();
        let result = client.generate("system", "user").await;
        assert!(matches!(result, Err(Error::ProviderFailed(msg)) if msg.contains("missing API key")));
    }

    #[tokio::test]
    async fn test_embed_empty_input() {
        let client = OpenAiClient::new(OpenAiConfig::default()).unwrap();
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_embedding_response_order() {
        let json = r#"{"data": [{"index": 1, "embedding": [0.0, 1.0]}, {"index": 0, "embedding": [1.0, 0.0]}]}"#;
        let mut response: EmbeddingResponse = serde_json::from_str(json).unwrap();
        response.data.sort_by_key(|entry| entry.index);
        assert_eq!(response.data[0].embedding, vec![1.0, 0.0]);
    }
}
