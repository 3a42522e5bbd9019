// Web server binary: serves the chat UI and the streaming forwarding endpoint.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};

use gemini_chat_web::web::config::{load_config, ServerConfig};
use gemini_chat_web::web::provider::{GeminiProvider, InferenceProvider};
use gemini_chat_web::web::routes;
use gemini_chat_web::{log_info, log_warn};

async fn handle_request<P: InferenceProvider>(
    req: Request<Body>,
    provider: Arc<P>,
    config: Arc<ServerConfig>,
) -> Result<Response<Body>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::OPTIONS, _) => routes::static_files::handle_options().await,
        (&Method::GET, "/") | (&Method::GET, "/index.html") => {
            routes::static_files::handle_index().await
        }
        (&Method::GET, "/health") => routes::health::handle().await,
        (&Method::POST, "/api/chat") => routes::chat::handle_post_chat(req, provider, config).await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("Not Found"))
            .unwrap()),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Arc::new(load_config());

    let api_key = config.api_key().unwrap_or_else(|| {
        log_warn!(
            "[MAIN] {} is not set, provider requests will be rejected upstream",
            config.api_key_env
        );
        String::new()
    });
    let provider = Arc::new(GeminiProvider::new(&config.provider_base_url, api_key));

    let make_svc = make_service_fn({
        let provider = provider.clone();
        let config = config.clone();
        move |_conn| {
            let provider = provider.clone();
            let config = config.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    handle_request(req, provider.clone(), config.clone())
                }))
            }
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let server = Server::bind(&addr).serve(make_svc);

    log_info!("[MAIN] Chat web server starting on http://{}", addr);
    println!("Gemini Chat Web Server starting on http://{addr}");
    println!("Available endpoints:");
    println!("  GET  /health     - Health check");
    println!("  POST /api/chat   - Streaming chat endpoint");
    println!("  GET  /           - Web interface");

    server
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    Ok(())
}
