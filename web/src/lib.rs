#![deny(missing_docs)]

//! # Dialysis Web Library
//!
//! HTTP layer of the dialysis clinic API: configuration, logging setup,
//! routing and the request handlers.

use actix_web::{get, HttpResponse, Responder};

/// Command-line and environment settings.
pub mod config;

/// JSON error responses.
pub mod error;

/// Generic CRUD handlers.
pub mod handlers;

/// Patient history upload and download.
pub mod history;

/// Endpoint registration and CORS.
pub mod routes;

/// Subscriber setup.
pub mod telemetry;

/// A simple health check handler.
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
