//! OpenAI-compatible chat-completion client.
//!
//! Talks to `POST /v1/chat/completions` with bearer authentication. Any server
//! speaking the same dialect (a local proxy, Ollama's compatibility layer) can
//! be targeted through the configured endpoint.

use super::{build_request, CompletionBackend, CompletionError};
use crate::config::CompletionConfig;
use crate::protocol::{ChatResponse, ErrorBody};
use crate::style::StyleState;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for an OpenAI-style chat-completion endpoint.
pub struct OpenAIClient {
    config: CompletionConfig,
    client: Client,
}

impl OpenAIClient {
    /// Create a new client from configuration.
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CompletionError::Transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a client around an already configured HTTP client.
    pub fn with_client(config: CompletionConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Check that requests can be authorised.
    pub fn health_check(&self) -> Result<(), CompletionError> {
        self.api_key().map(|_| ())
    }

    /// Get the API key from config or environment.
    fn api_key(&self) -> Result<String, CompletionError> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or(CompletionError::MissingApiKey)
    }
}

#[async_trait]
impl CompletionBackend for OpenAIClient {
    async fn complete(
        &self,
        current: &StyleState,
        command: &str,
    ) -> Result<String, CompletionError> {
        let api_key = self.api_key()?;
        let request = build_request(&self.config, current, command);

        debug!(model = %request.model, endpoint = %self.config.endpoint, "sending style command");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body: Result<ErrorBody, _> = response.json().await;
            let message = body
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(CompletionError::Transport)?;
        debug!(response = %body, "completion response");

        let envelope: ChatResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Envelope(e.to_string()))?;

        envelope
            .into_first_content()
            .ok_or(CompletionError::EmptyChoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });
        (format!("http://{}/v1/chat/completions", addr), handle)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client_for(endpoint: String) -> OpenAIClient {
        let config = CompletionConfig {
            endpoint,
            api_key: Some("test-key".to_string()),
            ..CompletionConfig::default()
        };
        let http = Client::builder().no_proxy().build().unwrap();
        OpenAIClient::with_client(config, http)
    }

    fn envelope(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-test",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_verbatim() {
        let content = r#"{"button":{"backgroundColor":"red"}}"#;
        let (endpoint, server) = serve_once("200 OK", envelope(content)).await;
        let client = client_for(endpoint);

        let text = client
            .complete(&StyleState::default(), "make it red")
            .await
            .unwrap();
        assert_eq!(text, content);

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(lower.contains("authorization: bearer test-key"));
        assert!(lower.contains("content-type: application/json"));

        let body_start = request.find("\r\n\r\n").unwrap() + 4;
        let body: serde_json::Value = serde_json::from_str(&request[body_start..]).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][1]["content"],
            format!("Current styles: {}. Command: make it red", StyleState::default())
        );
    }

    #[tokio::test]
    async fn test_complete_does_not_interpret_content() {
        let (endpoint, _server) = serve_once("200 OK", envelope("not json")).await;
        let client = client_for(endpoint);

        let text = client.complete(&StyleState::default(), "x").await.unwrap();
        assert_eq!(text, "not json");
    }

    #[tokio::test]
    async fn test_error_status() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#.to_string();
        let (endpoint, _server) = serve_once("401 Unauthorized", body).await;
        let client = client_for(endpoint);

        let err = client.complete(&StyleState::default(), "x").await.unwrap_err();
        match err {
            CompletionError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_body() {
        let (endpoint, _server) = serve_once("502 Bad Gateway", "upstream down".to_string()).await;
        let client = client_for(endpoint);

        let err = client.complete(&StyleState::default(), "x").await.unwrap_err();
        assert!(matches!(
            err,
            CompletionError::Status { status: 502, ref message } if message == "Unknown error"
        ));
    }

    #[tokio::test]
    async fn test_malformed_envelope() {
        let (endpoint, _server) = serve_once("200 OK", "<html>oops</html>".to_string()).await;
        let client = client_for(endpoint);

        let err = client.complete(&StyleState::default(), "x").await.unwrap_err();
        assert!(matches!(err, CompletionError::Envelope(_)));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let (endpoint, _server) = serve_once("200 OK", r#"{"choices":[]}"#.to_string()).await;
        let client = client_for(endpoint);

        let err = client.complete(&StyleState::default(), "x").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyChoices));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}/v1/chat/completions", addr));
        let err = client.complete(&StyleState::default(), "x").await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
