//! 对外错误响应
//!
//! 所有接口错误统一序列化为 `{"error": {"code", "message", "detail"}}`。
//! 校验类错误返回 422 并携带详情；系统级错误只返回通用提示，详细信息仅记录日志。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

const VALIDATION_MESSAGE: &str = "Validation error";
const QUERY_SYNTAX_MESSAGE: &str = "Invalid query builder syntax";

/// 接口错误
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}: {detail}")]
pub struct ApiError {
    status: StatusCode,
    /// 固定文案，不包含可变内容，便于翻译
    message: String,
    /// 可变的调试详情
    detail: String,
}

/// 错误体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub detail: String,
}

/// 错误响应外层
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// 请求参数校验失败（422）
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, VALIDATION_MESSAGE, detail)
    }

    /// 过滤/排序规则无法编译（422）
    pub fn invalid_query(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, QUERY_SYNTAX_MESSAGE, detail)
    }

    /// 服务内部错误（500）
    pub fn internal(detail: impl Into<String>) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self::new(status, phrase(status), detail)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// 错误码，取 HTTP 状态短语
    pub fn code(&self) -> &'static str {
        phrase(self.status)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// 构造响应体
    ///
    /// 5xx 错误的详情不对外暴露。
    pub fn to_response_body(&self) -> ErrorResponse {
        let detail = if self.is_server_error() {
            phrase(self.status).to_string()
        } else {
            self.detail.clone()
        };

        ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.message.clone(),
                detail,
            },
        }
    }
}

fn phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "请求处理失败");
        } else {
            tracing::debug!(status = %self.status, detail = %self.detail, "请求参数被拒绝");
        }

        (self.status, axum::Json(self.to_response_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_validation_error() {
        let err = ApiError::validation("未知的查询字段: age");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "Unprocessable Entity");
        assert_eq!(err.message(), "Validation error");
        assert_eq!(err.detail(), "未知的查询字段: age");
    }

    #[test]
    fn test_invalid_query_error() {
        let err = ApiError::invalid_query("未知的查询字段: age");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message(), "Invalid query builder syntax");
        assert_eq!(err.to_response_body().error.detail, "未知的查询字段: age");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = ApiError::internal("registry misconfigured: duplicate field id");
        let body = err.to_response_body();
        assert_eq!(body.error.code, "Internal Server Error");
        assert!(!body.error.detail.contains("duplicate"));
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = ApiError::validation("未知的操作符: between").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.message, "Validation error");
        assert_eq!(body.error.detail, "未知的操作符: between");
    }
}
