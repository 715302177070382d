//! 规则管理服务响应 DTO 定义
//!
//! 所有 REST API 的响应体结构

use chrono::{DateTime, Utc};
use rule_engine::{AstNode, EvaluationResult, Rule, ValidationError};
use serde::Serialize;

/// 统一 API 响应
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: Some(data),
        }
    }
}

/// 规则响应 DTO：规则元信息与外部表示的规则树平铺在一起
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub ast: AstNode,
}

impl From<&Rule> for RuleDto {
    fn from(rule: &Rule) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            created_at: rule.created_at,
            ast: AstNode::from(&rule.root),
        }
    }
}

/// 评估结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<EvaluationResult>,
}

/// 单条结构校验问题
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl From<&ValidationError> for ValidationIssue {
    fn from(error: &ValidationError) -> Self {
        Self {
            path: error.path.clone(),
            message: error.kind.to_string(),
        }
    }
}

/// 结构校验结果
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidateResponse {
    pub fn from_errors(errors: &[ValidationError]) -> Self {
        Self {
            valid: errors.is_empty(),
            errors: errors.iter().map(ValidationIssue::from).collect(),
        }
    }
}

/// 删除成功响应
#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

impl DeletedResponse {
    pub fn success() -> Self {
        Self { deleted: true }
    }
}

/// 存活探针响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub rules_stored: usize,
}
