use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

use crate::services::{FailureReason, RequestError};

/// 统一的API错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 缺少必需的查询参数
    MissingParameter(String),
    /// 请求参数错误
    BadRequest(String),
    /// 目标 URL 不合法
    InvalidUrl(String),
    /// 抓取或解析失败，`FailureReason::Internal` 表示内部错误
    ExtractionFailed {
        reason: FailureReason,
        message: String,
        upstream_status: Option<u16>,
    },
    /// 附带目标地址和耗时的错误
    WithContext {
        error: Box<ApiError>,
        book_url: String,
        processing_time_seconds: f64,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingParameter(msg) => write!(f, "Missing parameter: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            ApiError::ExtractionFailed {
                reason: FailureReason::Internal,
                message,
                ..
            } => write!(f, "Internal error: {}", message),
            ApiError::ExtractionFailed { reason, message, .. } => {
                write!(f, "Extraction failed ({}): {}", reason.as_str(), message)
            }
            ApiError::WithContext {
                error, book_url, ..
            } => write!(f, "{} ({})", error, book_url),
        }
    }
}

impl std::error::Error for ApiError {}

/// 从RequestError转换
impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::InvalidUrl(e) => ApiError::InvalidUrl(e.to_string()),
            RequestError::ExtractionFailed {
                reason,
                message,
                upstream_status,
            } => ApiError::ExtractionFailed {
                reason,
                message,
                upstream_status,
            },
        }
    }
}

impl ApiError {
    /// 附加请求上下文，失败响应中会带上 `book_url` 和 `processing_time_seconds`
    ///
    /// # 参数
    /// - `book_url`: 请求的目标地址
    /// - `processing_time_seconds`: 请求开始到失败的耗时
    pub fn with_context(self, book_url: impl Into<String>, processing_time_seconds: f64) -> Self {
        let error = match self {
            ApiError::WithContext { error, .. } => error,
            other => Box::new(other),
        };
        ApiError::WithContext {
            error,
            book_url: book_url.into(),
            processing_time_seconds,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::BadRequest(_) | ApiError::InvalidUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ExtractionFailed {
                reason,
                upstream_status,
                ..
            } => match reason {
                FailureReason::UpstreamStatus if matches!(upstream_status, Some(404) | Some(410)) => {
                    StatusCode::NOT_FOUND
                }
                FailureReason::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
                FailureReason::UnsupportedContentType | FailureReason::MalformedContent => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                FailureReason::UpstreamStatus | FailureReason::UpstreamUnreachable => {
                    StatusCode::BAD_GATEWAY
                }
                FailureReason::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::WithContext { error, .. } => error.status_code(),
        }
    }

    /// 响应体 JSON
    fn into_body(self) -> Value {
        match self {
            ApiError::MissingParameter(msg) => json!({
                "success": false,
                "error": "missing_parameter",
                "message": msg,
            }),
            ApiError::BadRequest(msg) => json!({
                "success": false,
                "error": "bad_request",
                "message": msg,
            }),
            ApiError::InvalidUrl(msg) => json!({
                "success": false,
                "error": "invalid_url",
                "message": msg,
            }),
            ApiError::ExtractionFailed {
                reason: FailureReason::Internal,
                message,
                ..
            } => {
                tracing::error!("Internal error: {}", message);
                json!({
                    "success": false,
                    "error": "internal_error",
                    "message": "An internal server error occurred",
                })
            }
            ApiError::ExtractionFailed {
                reason, message, ..
            } => {
                tracing::warn!("Extraction failed ({}): {}", reason.as_str(), message);
                json!({
                    "success": false,
                    "error": "extraction_failed",
                    "reason": reason,
                    "message": message,
                })
            }
            ApiError::WithContext {
                error,
                book_url,
                processing_time_seconds,
            } => {
                let mut body = (*error).into_body();
                if let Value::Object(map) = &mut body {
                    map.insert("book_url".to_string(), json!(book_url));
                    map.insert(
                        "processing_time_seconds".to_string(),
                        json!(processing_time_seconds),
                    );
                }
                body
            }
        }
    }
}

/// 实现IntoResponse，将错误转换为HTTP响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self.into_body())).into_response()
    }
}

/// Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 辅助宏：快速创建错误
#[macro_export]
macro_rules! api_error {
    (MissingParameter, $msg:expr) => {
        $crate::api::error::ApiError::MissingParameter($msg.to_string())
    };
    (BadRequest, $msg:expr) => {
        $crate::api::error::ApiError::BadRequest($msg.to_string())
    };
}
