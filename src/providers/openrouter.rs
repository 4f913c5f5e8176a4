use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::TaskError;
use crate::prompt::PromptSpec;
use crate::providers::{Completion, CompletionProvider};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const MAX_TOKENS: u32 = 1500;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// OpenRouter chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub(crate) fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn send(&self, api_key: &str, spec: &PromptSpec) -> Result<Completion, TaskError> {
        let request = ChatRequest {
            model: spec.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &spec.prompt_text,
            }],
            max_tokens: MAX_TOKENS,
            temperature: spec.temperature,
        };
        debug!(
            "POST {} model={} temperature={}",
            self.endpoint(),
            spec.model,
            spec.temperature
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            warn!("OpenRouter returned HTTP {}", status.as_u16());
            return Err(TaskError::Http {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Raw OpenRouter response: {}", body);

        let json: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .unwrap_or("no message");
            return Err(TaskError::Provider(message.to_string()));
        }

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                TaskError::Transport("response contained no completion text".to_string())
            })?;
        let total_tokens = json["usage"]["total_tokens"]
            .as_u64()
            .map(|tokens| tokens as usize);

        Ok(Completion {
            text: content.trim().to_string(),
            total_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn spec(prompt: &str, temperature: f32) -> PromptSpec {
        PromptSpec {
            prompt_text: prompt.to_string(),
            temperature,
            model: crate::prompt::MODEL,
        }
    }

    #[tokio::test]
    async fn test_sends_expected_request_and_trims_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "model": "openai/gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Say hi"}],
                "max_tokens": 1500,
                "temperature": 0.5
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"  hi  "}}],"usage":{"total_tokens":12}}"#,
            )
            .create_async()
            .await;

        let provider = OpenRouterProvider::new(server.url()).unwrap();
        let completion = provider.send("test-key", &spec("Say hi", 0.5)).await.unwrap();

        assert_eq!(completion.text, "hi");
        assert_eq!(completion.total_tokens, Some(12));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_status_keeps_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let provider = OpenRouterProvider::new(server.url()).unwrap();
        let err = provider.send("bad-key", &spec("x", 0.2)).await.unwrap_err();

        assert_eq!(
            err,
            TaskError::Http {
                status: 401,
                body: "unauthorized".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_error_object_in_successful_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"error":{"message":"rate limited","code":429}}"#)
            .create_async()
            .await;

        let provider = OpenRouterProvider::new(server.url()).unwrap();
        let err = provider.send("key", &spec("x", 0.2)).await.unwrap_err();

        assert_eq!(err, TaskError::Provider("rate limited".to_string()));
    }

    #[tokio::test]
    async fn test_error_object_without_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"error":{"code":500}}"#)
            .create_async()
            .await;

        let provider = OpenRouterProvider::new(format!("{}/", server.url())).unwrap();
        let err = provider.send("key", &spec("x", 0.2)).await.unwrap_err();

        assert_eq!(err, TaskError::Provider("no message".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let provider = OpenRouterProvider::new(server.url()).unwrap();
        let err = provider.send("key", &spec("x", 0.2)).await.unwrap_err();

        assert!(matches!(err, TaskError::Transport(_)));
    }

    #[tokio::test]
    async fn test_missing_choices_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let provider = OpenRouterProvider::new(server.url()).unwrap();
        let err = provider.send("key", &spec("x", 0.2)).await.unwrap_err();

        assert_eq!(
            err,
            TaskError::Transport("response contained no completion text".to_string())
        );
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let provider =
            OpenRouterProvider::with_timeout(format!("http://{}", addr), Duration::from_millis(200))
                .unwrap();
        let err = provider.send("key", &spec("x", 0.2)).await.unwrap_err();

        match err {
            TaskError::Transport(message) => assert!(message.starts_with("request timed out")),
            other => panic!("expected a timeout, got {:?}", other),
        }
        server.abort();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let provider = OpenRouterProvider::new("http://127.0.0.1:1").unwrap();
        let err = provider.send("key", &spec("x", 0.2)).await.unwrap_err();

        assert!(matches!(err, TaskError::Transport(_)));
    }
}
