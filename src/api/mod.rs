pub mod book_image;
pub mod error;
pub mod health;

use axum::{response::Redirect, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::BookImageService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookImageService>,
}

impl AppState {
    pub fn new(service: BookImageService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// 创建路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::permanent("/api") }))
        .route("/api", get(health::api_index))
        .route("/api/health", get(health::health_check))
        .route("/api/book-image", get(book_image::get_book_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
