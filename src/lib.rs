// Gemini Chat Web: a minimal chat client library plus the streaming web server.

pub mod web;

// Re-export the pieces frontends need
pub use web::format::{format_content, DisplaySegment};
pub use web::models::{Message, Role};
pub use web::session::{ChatSession, StreamEvent};
pub use web::transport::{ChatTransport, HttpChatTransport, StreamUpdate, TransportError};
