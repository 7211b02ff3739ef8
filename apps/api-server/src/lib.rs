//! # Quill API Server
//!
//! HTTP surface of the blogging backend. The binary in `main.rs` wires
//! configuration and telemetry around [`configure_app`].

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod state;
pub mod telemetry;

use actix_web::web;

use middleware::error::extractor_error;
use state::AppState;

/// Register shared state, extractor error handling and all routes.
pub fn configure_app(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(extractor_error))
            .app_data(web::QueryConfig::default().error_handler(extractor_error))
            .app_data(web::PathConfig::default().error_handler(extractor_error))
            .configure(handlers::configure_routes);
    }
}
