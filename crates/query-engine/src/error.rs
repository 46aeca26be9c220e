//! 查询引擎错误类型
//!
//! 除 `Internal` 外，所有错误都由客户端输入引起，可恢复，对外映射为 422。

use axum::response::{IntoResponse, Response};
use query_shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("未知的查询字段: {0}")]
    UnknownField(String),

    #[error("未知的操作符: {0}")]
    UnknownOperator(String),

    #[error("未知的逻辑条件: {0}")]
    UnknownCondition(String),

    #[error("未知的排序方向: {0}")]
    UnknownDirection(String),

    #[error("规则格式错误: {0}")]
    Malformed(String),

    #[error("规则结构错误: {0}")]
    Structural(String),

    #[error("{target} 的值无效: 期望 {expected}, 实际 {actual}")]
    InvalidValue {
        target: String,
        expected: String,
        actual: String,
    },

    #[error("规则过于复杂: {0}")]
    TooComplex(String),

    #[error("分页参数无效: {0}")]
    InvalidPagination(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownField(_) => "UNKNOWN_FIELD",
            Self::UnknownOperator(_) => "UNKNOWN_OPERATOR",
            Self::UnknownCondition(_) => "UNKNOWN_CONDITION",
            Self::UnknownDirection(_) => "UNKNOWN_DIRECTION",
            Self::Malformed(_) => "MALFORMED_RULE",
            Self::Structural(_) => "STRUCTURAL_VIOLATION",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::TooComplex(_) => "RULE_TOO_COMPLEX",
            Self::InvalidPagination(_) => "INVALID_PAGINATION",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为客户端输入导致的校验错误
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// 请求格式本身合法、但规则无法按字段注册表编译
    ///
    /// 其余校验错误来自参数解码阶段。
    pub fn is_query_syntax(&self) -> bool {
        matches!(
            self,
            Self::UnknownField(_)
                | Self::Structural(_)
                | Self::InvalidValue { .. }
                | Self::TooComplex(_)
        )
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(format!("JSON 解析失败: {}", err))
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        if err.is_query_syntax() {
            ApiError::invalid_query(err.to_string())
        } else if err.is_validation() {
            ApiError::validation(err.to_string())
        } else {
            ApiError::internal(err.to_string())
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_error_code() {
        let err = QueryError::UnknownField("does_not_exist".to_string());
        assert_eq!(err.code(), "UNKNOWN_FIELD");
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn test_validation_maps_to_422() {
        let api: ApiError = QueryError::UnknownOperator("between".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.detail().contains("between"));
    }

    #[test]
    fn test_compile_errors_use_query_syntax_message() {
        let api: ApiError = QueryError::UnknownField("does_not_exist".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.message(), "Invalid query builder syntax");

        let api: ApiError = QueryError::Structural("and 至少需要一条子规则".to_string()).into();
        assert_eq!(api.message(), "Invalid query builder syntax");

        let api: ApiError = QueryError::Malformed("JSON 解析失败".to_string()).into();
        assert_eq!(api.message(), "Validation error");

        let api: ApiError = QueryError::InvalidPagination("limit 至少为 1".to_string()).into();
        assert_eq!(api.message(), "Validation error");
    }

    #[test]
    fn test_internal_maps_to_500() {
        let err = QueryError::Internal("参数 email_3 未绑定".to_string());
        assert!(!err.is_validation());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
