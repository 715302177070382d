//! 规则管理服务请求 DTO 定义
//!
//! 所有 REST API 的请求体结构

use rule_engine::{AstNode, Record};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// 从规则文本创建规则
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, message = "规则文本不能为空"))]
    pub rule: String,
    #[validate(length(min = 1, max = 100, message = "规则名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
}

/// 组合多条规则文本
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CombineRulesRequest {
    pub rules: Vec<String>,
    /// 组合使用的逻辑操作符，缺省为 AND
    #[validate(length(min = 1, message = "逻辑操作符不能为空"))]
    pub operator: Option<String>,
}

/// 评估规则：直接提交规则树，或引用已保存规则的 ID
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_evaluate_target"))]
pub struct EvaluateRuleRequest {
    pub ast: Option<AstNode>,
    pub rule_id: Option<String>,
    pub data: Record,
    /// 是否返回求值追踪，缺省取服务配置
    pub trace: Option<bool>,
}

fn validate_evaluate_target(req: &EvaluateRuleRequest) -> Result<(), ValidationError> {
    match (&req.ast, &req.rule_id) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(ValidationError::new("target")
            .with_message("ast 与 ruleId 必须且只能提供一个".into())),
    }
}

/// 校验规则树结构
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRuleRequest {
    pub ast: AstNode,
}
