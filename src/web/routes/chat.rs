// Chat route handler: forwards the conversation to the inference provider
// and relays its token stream as server-sent events.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::body::Bytes;
use hyper::{Body, Request, Response, StatusCode};

use crate::web::{
    config::{ServerConfig, SYSTEM_PROMPT},
    models::{ChatRequest, TokenData},
    provider::{InferenceProvider, InferenceRequest},
    request_parsing::parse_json_body,
    response_helpers::json_error,
    sse,
};

// Import logging macros
use crate::{log_error, log_info};

pub async fn handle_post_chat<P: InferenceProvider>(
    req: Request<Body>,
    provider: Arc<P>,
    config: Arc<ServerConfig>,
) -> Result<Response<Body>, Infallible> {
    // Parse request body using helper
    let chat_request: ChatRequest = match parse_json_body(req.into_body()).await {
        Ok(req) => req,
        Err(error_response) => return Ok(error_response),
    };

    let exchange_id = uuid::Uuid::new_v4();
    log_info!(
        "[CHAT] ({}) Forwarding {} messages to {}",
        exchange_id,
        chat_request.messages.len(),
        config.model
    );

    let inference_request = InferenceRequest {
        model: config.model.clone(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        messages: chat_request.messages,
    };

    let stream = match provider.open_stream(inference_request).await {
        Ok(stream) => stream,
        Err(e) => {
            log_error!("[CHAT] ({}) Provider refused stream: {}", exchange_id, e);
            return Ok(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
            ));
        }
    };
    let (mut tokens, mut errors) = (stream.tokens, stream.errors);

    // Use Body::channel for direct control over chunk sending
    let (mut sender, body) = Body::channel();

    tokio::spawn(async move {
        let mut error_sent = false;
        loop {
            tokio::select! {
                // Drain pending tokens before reporting a failure so partial
                // content reaches the client.
                biased;
                Some(token) = tokens.recv() => {
                    let event = sse::token_event(&TokenData { token });
                    // Send each chunk immediately, no buffering
                    if sender.send_data(Bytes::from(event)).await.is_err() {
                        // Client disconnected
                        break;
                    }
                }
                Some(message) = errors.recv() => {
                    log_error!("[CHAT] ({}) Stream failed: {}", exchange_id, message);
                    let _ = sender.send_data(Bytes::from(sse::error_event(&message))).await;
                    error_sent = true;
                    break;
                }
                else => {
                    // Both channels closed, stream complete
                    break;
                }
            }
        }
        if !error_sent {
            let _ = sender.send_data(Bytes::from(sse::done_event())).await;
        }
    });

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .header("cache-control", "no-cache")
        .header("access-control-allow-origin", "*")
        .header("connection", "keep-alive")
        .header("x-accel-buffering", "no") // Disable nginx buffering
        .body(body)
        .unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::provider::{ProviderError, TokenStream};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Provider whose single scripted exchange either streams the given
    /// chunks (then optionally an error) or refuses to open at all.
    struct FakeProvider {
        chunks: Vec<&'static str>,
        mid_stream_error: Option<&'static str>,
        refuse: Option<ProviderError>,
        seen: Mutex<Vec<InferenceRequest>>,
    }

    impl FakeProvider {
        fn streaming(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                mid_stream_error: None,
                refuse: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn refusing(error: ProviderError) -> Self {
            Self {
                chunks: Vec::new(),
                mid_stream_error: None,
                refuse: Some(error),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl InferenceProvider for FakeProvider {
        async fn open_stream(
            &self,
            request: InferenceRequest,
        ) -> Result<TokenStream, ProviderError> {
            self.seen.lock().unwrap().push(request);
            if let Some(ProviderError::Upstream { status, message }) = &self.refuse {
                return Err(ProviderError::Upstream {
                    status: *status,
                    message: message.clone(),
                });
            }
            let (token_tx, tokens) = mpsc::unbounded_channel();
            let (err_tx, errors) = mpsc::unbounded_channel();
            for chunk in &self.chunks {
                token_tx.send(chunk.to_string()).unwrap();
            }
            if let Some(message) = self.mid_stream_error {
                err_tx.send(message.to_string()).unwrap();
            }
            Ok(TokenStream { tokens, errors })
        }
    }

    fn chat_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn streams_chunks_as_sse_with_done_marker() {
        let provider = Arc::new(FakeProvider::streaming(vec!["Hel", "lo"]));
        let config = Arc::new(ServerConfig::default());

        let response = handle_post_chat(
            chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#),
            provider.clone(),
            config,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");

        let text = body_text(response).await;
        assert!(text.contains(r#"data: {"token":"Hel"}"#));
        assert!(text.contains(r#"data: {"token":"lo"}"#));
        assert!(text.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn forwards_system_prompt_and_full_history() {
        let provider = Arc::new(FakeProvider::streaming(vec!["ok"]));
        let config = Arc::new(ServerConfig::default());

        let response = handle_post_chat(
            chat_request(
                r#"{"messages":[{"role":"user","content":"a"},{"role":"assistant","content":"b"},{"role":"user","content":"c"}]}"#,
            ),
            provider.clone(),
            config.clone(),
        )
        .await
        .unwrap();
        body_text(response).await;

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system_prompt, SYSTEM_PROMPT);
        assert_eq!(seen[0].model, config.model);
        assert_eq!(seen[0].messages.len(), 3);
    }

    #[tokio::test]
    async fn provider_refusal_returns_500_with_error_body() {
        let provider = Arc::new(FakeProvider::refusing(ProviderError::Upstream {
            status: 429,
            message: "quota exceeded".to_string(),
        }));
        let config = Arc::new(ServerConfig::default());

        let response = handle_post_chat(
            chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#),
            provider,
            config,
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["error"], "quota exceeded");
    }

    #[tokio::test]
    async fn mid_stream_failure_emits_error_event_instead_of_done() {
        let provider = Arc::new(FakeProvider {
            chunks: vec!["par"],
            mid_stream_error: Some("connection reset"),
            refuse: None,
            seen: Mutex::new(Vec::new()),
        });
        let config = Arc::new(ServerConfig::default());

        let response = handle_post_chat(
            chat_request(r#"{"messages":[{"role":"user","content":"hi"}]}"#),
            provider,
            config,
        )
        .await
        .unwrap();

        let text = body_text(response).await;
        assert!(text.contains(r#"data: {"token":"par"}"#));
        assert!(text.contains("event: error"));
        assert!(text.contains("connection reset"));
        assert!(!text.contains("[DONE]"));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_with_400() {
        let provider = Arc::new(FakeProvider::streaming(vec![]));
        let config = Arc::new(ServerConfig::default());

        let response = handle_post_chat(chat_request("{oops"), provider.clone(), config)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(provider.seen.lock().unwrap().is_empty());
    }
}
