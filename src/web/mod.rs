// Web chat modules

pub mod config;
pub mod format;
pub mod logger;
pub mod models;
pub mod provider;
pub mod request_parsing;
pub mod response_helpers;
pub mod routes;
pub mod session;
pub mod sse;
pub mod transport;
