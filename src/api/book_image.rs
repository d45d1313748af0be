use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::time::Instant;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::api_error;
use crate::services::{BookImageResponse, RequestOptions};

/// 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct BookImageQuery {
    pub book_url: Option<String>,
    /// `book_url` 的别名
    pub url: Option<String>,
    pub debug: Option<String>,
    pub profile: Option<String>,
}

impl BookImageQuery {
    /// 目标地址，`book_url` 优先，空值视为缺失
    pub fn target(&self) -> Option<&str> {
        [self.book_url.as_deref(), self.url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            debug: parse_flag(self.debug.as_deref()),
            profile: parse_flag(self.profile.as_deref()),
        }
    }
}

/// 解析布尔开关：`true` / `1` / `yes` / `on`（不区分大小写）
fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes" | "on")
    )
}

/// 获取封面图片地址
pub async fn get_book_image(
    State(state): State<AppState>,
    query: Result<Query<BookImageQuery>, QueryRejection>,
) -> ApiResult<Json<BookImageResponse>> {
    let started = Instant::now();
    let Query(query) = query.map_err(|e| api_error!(BadRequest, e.body_text()))?;

    let target = query
        .target()
        .ok_or_else(|| api_error!(MissingParameter, "book_url parameter is required"))?;

    let response = state
        .service
        .handle_with_options(target, query.options())
        .await
        .map_err(|e| ApiError::from(e).with_context(target, started.elapsed().as_secs_f64()))?;

    Ok(Json(response))
}
