use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use super::AppState;
use crate::models::CacheBackend;

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub success: bool,
    pub status: &'static str,
    pub cache_backend: CacheBackend,
    pub cache_ttl_seconds: u64,
    pub timestamp: String,
    pub version: &'static str,
}

/// 健康检查端点
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let cache = state.service.cache();

    Json(HealthStatus {
        success: true,
        status: "healthy",
        cache_backend: cache.backend(),
        cache_ttl_seconds: cache.ttl_seconds(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// API 索引
pub async fn api_index() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Book cover image URL extraction service",
        "data": {
            "name": "Book Image API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "/api/book-image": "GET ?book_url=<product page url>&debug=<bool>&profile=<bool>",
                "/api/health": "GET service and cache status",
            }
        }
    }))
}
