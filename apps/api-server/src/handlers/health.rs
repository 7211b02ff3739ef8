//! Health check endpoint.

use std::time::Duration;

use actix_web::{HttpResponse, web};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    /// Whether the list cache completed a write, read and delete.
    pub cache: bool,
}

/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let key = format!("health:check:{}", Uuid::new_v4());
    let cache = state
        .cache
        .set(&key, "ok", Some(Duration::from_secs(30)))
        .await
        .is_ok()
        && state.cache.exists(&key).await
        && state.cache.delete(&key).await.is_ok();

    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        cache,
    })
}
