// Chat session controller: owns the conversation, submits it over the
// transport, and applies streamed chunks to the open assistant message.

use super::models::{Message, GENERIC_ERROR_MESSAGE};
use super::transport::{ChatTransport, StreamUpdate};
use crate::{log_debug, log_info, log_warn};

/// One discrete event of a streaming exchange, in the order the controller
/// applies them: `Started`, zero or more `Chunk`s, then `Completed` or
/// `Failed`. A rendering layer may observe session state after each event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started,
    Chunk(String),
    Completed,
    Failed(String),
}

/// Conversation state for one browser-session-lifetime chat. Messages are
/// only ever appended; at most one assistant message is open at a time.
pub struct ChatSession<T: ChatTransport> {
    transport: T,
    messages: Vec<Message>,
    pending_input: String,
    streaming: bool,
    last_error: Option<String>,
    /// Chunks applied to the open assistant message, `None` when no
    /// placeholder is open.
    open_chunks: Option<u32>,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            messages: Vec::new(),
            pending_input: String::new(),
            streaming: false,
            last_error: None,
            open_chunks: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the pending input. No other effect.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    /// Clear the error notification. No other effect.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Submit the pending input and drive one full streaming exchange.
    /// A whitespace-only input or an exchange already in flight makes this
    /// a silent no-op.
    pub async fn submit(&mut self) {
        let Some(history) = self.begin_submit() else {
            return;
        };

        let opened = self.transport.stream_chat(&history).await;
        match opened {
            Ok(mut updates) => {
                self.apply(StreamEvent::Started);
                loop {
                    match updates.recv().await {
                        Some(StreamUpdate::Chunk(text)) => self.apply(StreamEvent::Chunk(text)),
                        Some(StreamUpdate::Failed(message)) => {
                            self.apply(StreamEvent::Failed(message));
                            break;
                        }
                        None => {
                            self.apply(StreamEvent::Completed);
                            break;
                        }
                    }
                }
            }
            Err(e) => self.apply(StreamEvent::Failed(e.to_string())),
        }
    }

    /// Validate and record the submission: append the user message, clear the
    /// input and any stale error, and mark the stream in flight. Returns the
    /// full updated history to send, or `None` when the submit is rejected.
    pub fn begin_submit(&mut self) -> Option<Vec<Message>> {
        let text = self.pending_input.trim();
        if text.is_empty() {
            return None;
        }
        if self.streaming {
            log_debug!("[SESSION] Submit rejected: exchange already in flight");
            return None;
        }

        self.messages.push(Message::user(text));
        self.pending_input.clear();
        self.last_error = None;
        self.streaming = true;
        log_info!("[SESSION] Submitting {} messages", self.messages.len());
        Some(self.messages.clone())
    }

    /// Apply one stream event to the session state.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Started => {
                // Placeholder for the open message, before any chunk lands.
                self.messages.push(Message::assistant(""));
                self.open_chunks = Some(0);
            }
            StreamEvent::Chunk(text) => {
                if let Some(count) = self.open_chunks {
                    if let Some(open) = self.messages.last_mut() {
                        open.content.push_str(&text);
                    }
                    self.open_chunks = Some(count + 1);
                }
            }
            StreamEvent::Completed => {
                // The open message is sealed from here on.
                self.open_chunks = None;
                self.streaming = false;
            }
            StreamEvent::Failed(message) => {
                // A placeholder that never received a chunk is dropped;
                // partial content is kept as-is.
                if self.open_chunks == Some(0) {
                    self.messages.pop();
                }
                self.open_chunks = None;
                self.streaming = false;
                let message = if message.trim().is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
                log_warn!("[SESSION] Exchange failed: {}", message);
                self.last_error = Some(message);
            }
        }
    }
}
