//! 规则引擎错误类型

use crate::validator::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("词法错误: 位置 {offset} 处无法识别的字符 '{character}'")]
    Lex { character: char, offset: usize },

    #[error("语法错误: 位置 {offset} 处期望 {expected}, 实际为 {found}")]
    Syntax {
        found: String,
        expected: String,
        offset: usize,
    },

    #[error("无效的参数: {0}")]
    InvalidArgument(String),

    #[error("规则结构校验失败: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("字段不存在: {0}")]
    MissingAttribute(String),

    #[error("类型不匹配: 操作符 {comparator} 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        comparator: String,
        expected: String,
        actual: String,
    },

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lex { .. } => "LEX_ERROR",
            Self::Syntax { .. } => "SYNTAX_ERROR",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingAttribute(_) => "MISSING_ATTRIBUTE",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::JsonError(_) => "JSON_ERROR",
        }
    }

    /// 是否由调用方输入引起（可通过修正输入恢复）
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::JsonError(_))
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, RuleError>;
