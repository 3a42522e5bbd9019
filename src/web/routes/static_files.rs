// Static file serving route handlers

use hyper::{Body, Response};
use std::convert::Infallible;

use crate::web::response_helpers::{cors_preflight, html_response};

// The chat UI ships embedded in the binary, no dist directory needed.
const INDEX_HTML: &str = include_str!("../../../assets/index.html");

pub async fn handle_index() -> Result<Response<Body>, Infallible> {
    Ok(html_response(INDEX_HTML))
}

pub async fn handle_options() -> Result<Response<Body>, Infallible> {
    Ok(cors_preflight())
}
