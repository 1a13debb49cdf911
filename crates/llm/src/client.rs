//! Chat-completion client.

use log::debug;
use serde_json::{json, Value};
use slidegen_core::{Error, LlmConfig, Result};

/// A chat-completion service that answers a single user prompt.
pub trait ChatClient {
    /// Send one prompt and return the assistant's text.
    fn complete(&self, api_key: &str, prompt: &str) -> Result<String>;
}

impl<T: ChatClient + ?Sized> ChatClient for &T {
    fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        (**self).complete(api_key, prompt)
    }
}

impl<T: ChatClient + ?Sized> ChatClient for Box<T> {
    fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        (**self).complete(api_key, prompt)
    }
}

/// Blocking client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    /// Create a client for the configured endpoint and model.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            config,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        })
    }
}

impl ChatClient for OpenAiClient {
    fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        debug!(
            "POST {} (model {}, {} prompt chars)",
            self.config.endpoint,
            self.config.model,
            prompt.len()
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(Error::llm)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Llm(format!("HTTP {}: {}", status, body.trim())));
        }

        let value: Value = response.json().map_err(Error::llm)?;
        message_content(&value)
            .ok_or_else(|| Error::Llm("response contained no message content".to_string()))
    }
}

/// Pull `choices[0].message.content` out of a chat-completion response.
fn message_content(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    /// Answer a single request on a local port with a canned response.
    /// The handle yields the raw request as received.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!(
            "http://{}/v1/chat/completions",
            listener.local_addr().unwrap()
        );
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream.write_all(response.as_bytes()).unwrap();
            request
        });
        (url, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn client_for(endpoint: &str) -> OpenAiClient {
        OpenAiClient::new(LlmConfig {
            endpoint: endpoint.to_string(),
            model: "test-model".to_string(),
        })
    }

    #[test]
    fn test_complete_returns_content() {
        let reply = json!({
            "choices": [{ "message": { "role": "assistant", "content": "[{\"title\":\"A\"}]" } }]
        })
        .to_string();
        let (url, server) = serve_once("200 OK", &reply);

        let content = client_for(&url).complete("sk-test", "hello").unwrap();
        assert_eq!(content, r#"[{"title":"A"}]"#);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains(r#""model":"test-model""#));
        assert!(request.contains(r#""content":"hello""#));
    }

    #[test]
    fn test_complete_http_error() {
        let (url, server) = serve_once("429 Too Many Requests", r#"{"error":"rate limited"}"#);

        let err = client_for(&url).complete("sk-test", "hello").unwrap_err();
        server.join().unwrap();
        match err {
            Error::Llm(message) => {
                assert_eq!(message, r#"HTTP 429 Too Many Requests: {"error":"rate limited"}"#)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_complete_without_content() {
        let (url, server) = serve_once("200 OK", r#"{"choices":[]}"#);

        let err = client_for(&url).complete("sk-test", "hello").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_complete_connection_refused() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/v1/chat/completions", port);

        let err = client_for(&url).complete("sk-test", "hello").unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[test]
    fn test_message_content() {
        let value = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "[{\"title\":\"A\"}]" } }
            ]
        });
        assert_eq!(message_content(&value).as_deref(), Some("[{\"title\":\"A\"}]"));
    }

    #[test]
    fn test_message_content_missing() {
        assert_eq!(message_content(&json!({"choices": []})), None);
        assert_eq!(message_content(&json!({"error": {"message": "nope"}})), None);
        assert_eq!(
            message_content(&json!({"choices": [{"message": {"content": null}}]})),
            None
        );
    }

    #[test]
    fn test_request_body() {
        let client = OpenAiClient::new(LlmConfig {
            endpoint: "http://localhost:9/v1/chat/completions".to_string(),
            model: "test-model".to_string(),
        });
        let body = client.request_body("hello");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }
}
