// Client-side transport: opens one streaming exchange against /api/chat.

use std::future::Future;
use std::io::{BufRead, BufReader};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::spawn_blocking;

use super::models::{ChatRequest, Message, GENERIC_ERROR_MESSAGE};
use super::sse::{SseParser, SseRecord};
use crate::log_error;

/// One discrete update delivered while a stream is open. Channel closure
/// without a `Failed` marker is normal completion; the upstream connection
/// closing is what ends the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Chunk(String),
    Failed(String),
}

pub type UpdateReceiver = mpsc::UnboundedReceiver<StreamUpdate>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The server rejected the exchange; the message comes from its
    /// `{"error": ...}` body when present.
    #[error("{0}")]
    Server(String),
    #[error("Failed to send message: {0}")]
    Network(String),
}

/// Seam between the session controller and the streaming endpoint. Tests
/// substitute a scripted implementation.
pub trait ChatTransport: Send + Sync {
    fn stream_chat(
        &self,
        history: &[Message],
    ) -> impl Future<Output = Result<UpdateReceiver, TransportError>> + Send;
}

/// Production transport speaking the `/api/chat` SSE wire format.
#[derive(Clone)]
pub struct HttpChatTransport {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpChatTransport {
    /// `endpoint` is the full URL of the chat route, e.g.
    /// `http://localhost:8000/api/chat`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            endpoint: endpoint.into(),
        }
    }
}

impl ChatTransport for HttpChatTransport {
    async fn stream_chat(&self, history: &[Message]) -> Result<UpdateReceiver, TransportError> {
        let body = serde_json::to_string(&ChatRequest {
            messages: history.to_vec(),
        })
        .map_err(|e| TransportError::Network(e.to_string()))?;

        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let (update_tx, update_rx) = mpsc::unbounded_channel::<StreamUpdate>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), TransportError>>();

        spawn_blocking(move || {
            let response = match agent
                .post(&endpoint)
                .set("content-type", "application/json")
                .send_string(&body)
            {
                Ok(response) => response,
                Err(ureq::Error::Status(status, response)) => {
                    let message = response
                        .into_string()
                        .ok()
                        .and_then(|body| server_error_message(&body))
                        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
                    log_error!("[TRANSPORT] Server rejected exchange ({}): {}", status, message);
                    let _ = ready_tx.send(Err(TransportError::Server(message)));
                    return;
                }
                Err(ureq::Error::Transport(transport)) => {
                    let _ = ready_tx.send(Err(TransportError::Network(transport.to_string())));
                    return;
                }
            };

            let _ = ready_tx.send(Ok(()));

            let reader = BufReader::new(response.into_reader());
            let mut parser = SseParser::new();
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = update_tx.send(StreamUpdate::Failed(e.to_string()));
                        return;
                    }
                };
                match parser.feed_line(&line) {
                    Some(SseRecord::Token(token)) => {
                        if update_tx.send(StreamUpdate::Chunk(token)).is_err() {
                            return;
                        }
                    }
                    Some(SseRecord::Error(message)) => {
                        let _ = update_tx.send(StreamUpdate::Failed(message));
                        return;
                    }
                    Some(SseRecord::Done) => return,
                    None => {}
                }
            }
            // Connection closed without a DONE marker: treat as completion,
            // the stream is terminated by the upstream close either way.
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(update_rx),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TransportError::Network(
                "request task ended before connecting".to_string(),
            )),
        }
    }
}

fn server_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(String::from)
}
