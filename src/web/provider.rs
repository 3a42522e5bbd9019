// Inference provider: forwards a conversation to the Generative Language API
// and streams token chunks back over channels.

use std::future::Future;
use std::io::{BufRead, BufReader};

use serde_json::json;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::spawn_blocking;

use super::models::{Message, Role, GENERIC_ERROR_MESSAGE};
use super::sse;
use crate::{log_debug, log_error};

/// Everything the provider needs for one streaming exchange.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

/// Token and error channels for one open stream. Closure of both channels
/// signals normal completion.
pub struct TokenStream {
    pub tokens: mpsc::UnboundedReceiver<String>,
    pub errors: mpsc::UnboundedReceiver<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-2xx status. The message is the
    /// provider-reported one when structurally available.
    #[error("{message}")]
    Upstream { status: u16, message: String },
    /// The provider could not be reached at all.
    #[error("Failed to reach inference provider: {0}")]
    Connect(String),
}

/// External inference collaborator. Retry, backoff, and rate limiting are the
/// provider's own business.
pub trait InferenceProvider: Send + Sync + 'static {
    fn open_stream(
        &self,
        request: InferenceRequest,
    ) -> impl Future<Output = Result<TokenStream, ProviderError>> + Send;
}

/// Google Generative Language API client (`:streamGenerateContent?alt=sse`).
#[derive(Clone)]
pub struct GeminiProvider {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, self.api_key
        )
    }
}

impl InferenceProvider for GeminiProvider {
    async fn open_stream(&self, request: InferenceRequest) -> Result<TokenStream, ProviderError> {
        let url = self.stream_url(&request.model);
        let body = build_generate_request(&request.system_prompt, &request.messages).to_string();
        let agent = self.agent.clone();

        let (token_tx, token_rx) = mpsc::unbounded_channel::<String>();
        let (err_tx, err_rx) = mpsc::unbounded_channel::<String>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), ProviderError>>();

        // ureq is blocking, so the whole exchange runs on a blocking thread
        // and feeds the async side through the channels.
        spawn_blocking(move || {
            let response = match agent
                .post(&url)
                .set("content-type", "application/json")
                .send_string(&body)
            {
                Ok(response) => response,
                Err(ureq::Error::Status(status, response)) => {
                    let message = response
                        .into_string()
                        .ok()
                        .and_then(|body| extract_error_message(&body))
                        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
                    let _ = ready_tx.send(Err(ProviderError::Upstream { status, message }));
                    return;
                }
                Err(ureq::Error::Transport(transport)) => {
                    let _ = ready_tx.send(Err(ProviderError::Connect(transport.to_string())));
                    return;
                }
            };

            let _ = ready_tx.send(Ok(()));

            let reader = BufReader::new(response.into_reader());
            let mut chunks = 0u32;
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log_error!("[PROVIDER] Stream read failed: {}", e);
                        let _ = err_tx.send(e.to_string());
                        return;
                    }
                };
                let Some(payload) = sse::data_payload(&line) else {
                    continue;
                };
                match serde_json::from_str::<serde_json::Value>(payload) {
                    Ok(value) => {
                        if let Some(text) = extract_chunk_text(&value) {
                            chunks += 1;
                            if token_tx.send(text).is_err() {
                                // Receiver gone: client disconnected.
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        log_error!("[PROVIDER] Malformed stream payload: {}", e);
                        let _ = err_tx.send(GENERIC_ERROR_MESSAGE.to_string());
                        return;
                    }
                }
            }
            log_debug!("[PROVIDER] Stream complete after {} chunks", chunks);
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(TokenStream {
                tokens: token_rx,
                errors: err_rx,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Connect(
                "provider task ended before the request was sent".to_string(),
            )),
        }
    }
}

/// Build the `generateContent` request body. System-role history entries are
/// folded into the system instruction since the contents array only accepts
/// user and model turns.
fn build_generate_request(system_prompt: &str, messages: &[Message]) -> serde_json::Value {
    let mut instruction = system_prompt.to_string();
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                instruction.push_str("\n\n");
                instruction.push_str(&message.content);
            }
            Role::User | Role::Assistant => {
                let role = if message.role == Role::User {
                    "user"
                } else {
                    "model"
                };
                contents.push(json!({
                    "role": role,
                    "parts": [{ "text": message.content }],
                }));
            }
        }
    }

    json!({
        "system_instruction": { "parts": [{ "text": instruction }] },
        "contents": contents,
    })
}

/// Pull the text out of one streamed `generateContent` chunk.
fn extract_chunk_text(value: &serde_json::Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let mut text = String::new();
    for part in parts {
        if let Some(piece) = part.get("text").and_then(|t| t.as_str()) {
            text.push_str(piece);
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Dig the provider-reported message out of an error body. The API returns
/// either `{"error": {"message": ...}}` or, on streaming endpoints, an array
/// of such objects.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = if value.is_array() { value.get(0)? } else { &value };
    object
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}
