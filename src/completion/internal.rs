//! Internal HTTP client implementation for OpenAI-compatible chat completions

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::CompletionClient;
use crate::config::Config;

pub const ROLE_USER: &str = "user";

/// Chat completion client
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    http: HttpClient,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &Config) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest::single_user_message(&self.model, prompt);
        log::debug!(
            "POST {} model={} prompt_bytes={}",
            self.endpoint(),
            self.model,
            prompt.len()
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .with_context(|| format!("Failed to send completion request to {}", self.base_url))?;

        let status = response.status();
        log::debug!("completion status: {}", status);
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Completion request failed ({}): {}", status, body);
        }

        let parsed = response
            .json::<ChatResponse>()
            .context("Failed to parse completion response")?;
        parsed.into_content()
    }
}

/// Request body for `POST /chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn single_user_message(model: &str, content: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: ROLE_USER.to_string(),
                content: content.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Response body; only the fields this tool reads
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice
    pub fn into_content(self) -> Result<String> {
        let Some(choice) = self.choices.into_iter().next() else {
            bail!("Completion response contained no choices");
        };
        match choice.message.content {
            Some(content) => Ok(content),
            None => bail!("Completion response choice has no content"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;

    /// Serve one HTTP exchange on loopback; the raw request comes back on the channel.
    fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            tx.send(String::from_utf8_lossy(&request).into_owned()).unwrap();
        });

        (format!("http://{}/v1", addr), rx)
    }

    fn client_for(base_url: String) -> OpenAiClient {
        let config = Config {
            base_url,
            timeout_secs: 5,
            ..Config::default()
        };
        OpenAiClient::new("sk-test".to_string(), &config).unwrap()
    }

    #[test]
    fn test_complete_returns_first_choice() {
        let (base_url, requests) = serve_once(
            "200 OK",
            r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "func TestX(t *testing.T) {}"}}]}"#,
        );

        let reply = client_for(base_url).complete("write a test").unwrap();
        assert_eq!(reply, "func TestX(t *testing.T) {}");

        let request = requests.recv().unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("\"content\":\"write a test\""));
    }

    #[test]
    fn test_complete_error_status_carries_body() {
        let (base_url, _requests) = serve_once(
            "500 Internal Server Error",
            r#"{"error": {"message": "quota exceeded"}}"#,
        );

        let err = client_for(base_url).complete("write a test").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("500"), "unexpected error: {}", message);
        assert!(message.contains("quota exceeded"), "unexpected error: {}", message);
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest::single_user_message("gpt-3.5-turbo", "write a test");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "write a test"}]
            })
        );
    }

    #[test]
    fn test_response_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_content().unwrap(), "first");
    }

    #[test]
    fn test_response_without_choices_is_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.into_content().is_err());

        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_content().is_err());
    }

    #[test]
    fn test_response_null_content_is_error() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
                .unwrap();
        assert!(response.into_content().is_err());
    }

    #[test]
    fn test_client_endpoint_normalization() {
        let config = Config {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Config::default()
        };
        let client = OpenAiClient::new("sk-test".to_string(), &config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model, "gpt-3.5-turbo");
    }
}
