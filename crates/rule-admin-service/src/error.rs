//! 规则管理服务错误类型定义
//!
//! 规则引擎错误原样透出错误码，请求格式问题统一为 INVALID_REQUEST。

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rule_engine::RuleError;
use serde_json::json;

use crate::dto::ValidationIssue;

/// 规则管理服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    // 请求体格式或参数校验失败
    #[error("请求参数无效: {0}")]
    InvalidRequest(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rule(RuleError::RuleNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Rule(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rule(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Rule(e) if e.is_client_error() => e.code(),
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Rule(_) => "INTERNAL_ERROR",
        }
    }

    /// 错误附带的数据：结构校验失败时返回逐条错误
    fn data(&self) -> serde_json::Value {
        match self {
            Self::Rule(RuleError::Validation(errors)) => {
                let issues: Vec<ValidationIssue> = errors.iter().map(ValidationIssue::from).collect();
                json!(issues)
            }
            _ => serde_json::Value::Null,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "内部错误");
            "服务内部错误，请稍后重试".to_string()
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "请求处理失败");
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": self.data()
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidRequest(errors.to_string())
    }
}

/// 请求体无法解析为 JSON 或字段类型不符
impl From<JsonRejection> for AdminError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rule_engine::{ValidationError, ValidationErrorKind};

    #[test]
    fn test_status_codes() {
        let not_found = AdminError::from(RuleError::RuleNotFound("r1".to_string()));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.error_code(), "RULE_NOT_FOUND");

        let lex = AdminError::from(RuleError::Lex {
            character: '&',
            offset: 3,
        });
        assert_eq!(lex.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(lex.error_code(), "LEX_ERROR");

        let invalid = AdminError::InvalidRequest("bad".to_string());
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.error_code(), "INVALID_REQUEST");

        let internal = AdminError::from(RuleError::JsonError(
            serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        ));
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_validation_error_data() {
        let err = AdminError::from(RuleError::Validation(vec![ValidationError::new(
            "root.left",
            ValidationErrorKind::MissingValue,
        )]));

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(
            err.data(),
            json!([{ "path": "root.left", "message": "节点缺少值" }])
        );
    }

    #[test]
    fn test_message_names_error_detail() {
        let err = AdminError::from(RuleError::MissingAttribute("age".to_string()));
        assert!(err.to_string().contains("age"));
    }
}
