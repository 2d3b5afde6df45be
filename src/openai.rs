use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::ChatMessage;

pub const OPENAI_API_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// The endpoint answered with a non-success status before any
    /// fragment was produced (bad key, rate limit, model not found...).
    #[error("chat API error {status}: {body}")]
    Api { status: u16, body: String },
    /// Network-level failure, before or during the stream.
    #[error("chat request failed: {0}")]
    Transport(String),
}

/// Incremental output of one streamed completion, delivered in arrival
/// order. `Done` follows the last fragment of a successful stream; after
/// an `Error` nothing the stream produced may be persisted.
#[derive(Debug)]
pub enum ChatEvent {
    Fragment(String),
    Done,
    Error(ChatError),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Extracts the content delta from one SSE `data:` payload. Chunks that
/// carry no content (role announcements, finish markers) yield None, as
/// do chunks that fail to parse.
fn parse_data_chunk(data: &str) -> Option<String> {
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty()),
        Err(e) => {
            warn!("skipping unparseable stream chunk: {e}");
            None
        }
    }
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Streams a chat completion, sending each text fragment over `tx` as
    /// it arrives. The SSE body is framed as `data: {json}` blocks and
    /// terminated by `data: [DONE]`. Exactly one `Done` or `Error` event
    /// ends every call.
    pub async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tx: mpsc::UnboundedSender<ChatEvent>,
    ) -> Result<(), ChatError> {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let err = ChatError::Transport(e.to_string());
                let _ = tx.send(ChatEvent::Error(err.clone()));
                err
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ChatError::Api {
                status: status.as_u16(),
                body,
            };
            let _ = tx.send(ChatEvent::Error(err.clone()));
            return Err(err);
        }

        debug!("streaming completion from {model}");
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let err = ChatError::Transport(e.to_string());
                    let _ = tx.send(ChatEvent::Error(err.clone()));
                    return Err(err);
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            // Frames are separated by a blank line: "data: {json}\n\n"
            while let Some(frame_end) = buffer.find("\n\n") {
                let frame = buffer[..frame_end].to_string();
                buffer.drain(..frame_end + 2);

                for line in frame.lines() {
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data.trim() == "[DONE]" {
                        let _ = tx.send(ChatEvent::Done);
                        return Ok(());
                    }
                    if let Some(content) = parse_data_chunk(data) {
                        let _ = tx.send(ChatEvent::Fragment(content));
                    }
                }
            }
        }

        // Body ended without the [DONE] marker; treat what we got as the
        // whole reply.
        let _ = tx.send(ChatEvent::Done);
        Ok(())
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4-turbo".to_string(),
            "gpt-3.5-turbo".to_string(),
        ]
    }
}
