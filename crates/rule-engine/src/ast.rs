//! 规则树的外部表示
//!
//! 对外接口与存储使用的嵌套结构：`{ type: "operator"|"operand", value, left?, right? }`。
//! 操作符节点的 value 为 `AND`/`OR`，条件节点的 value 为条件文本（如 `age > 30`）。
//! 与内存中的 [`RuleNode`] 解耦，来自外部的树在转换前会先做结构校验。

use crate::error::{Result, RuleError};
use crate::models::{Condition, RuleNode};
use crate::operators::LogicalOperator;
use crate::parser::parse_rule;
use crate::validator::validate;
use serde::{Deserialize, Serialize};

pub const NODE_TYPE_OPERATOR: &str = "operator";
pub const NODE_TYPE_OPERAND: &str = "operand";

/// 外部表示的规则树节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<AstNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<AstNode>>,
}

impl AstNode {
    pub fn operand(text: impl Into<String>) -> Self {
        Self {
            node_type: NODE_TYPE_OPERAND.to_string(),
            value: Some(text.into()),
            left: None,
            right: None,
        }
    }

    pub fn operator(operator: impl Into<String>, left: AstNode, right: AstNode) -> Self {
        Self {
            node_type: NODE_TYPE_OPERATOR.to_string(),
            value: Some(operator.into()),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// 从 JSON 字符串读取
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 校验并转换为内存中的规则树
    pub fn to_rule_node(&self) -> Result<RuleNode> {
        let errors = validate(self);
        if !errors.is_empty() {
            return Err(RuleError::Validation(errors));
        }
        decode(self)
    }
}

impl From<&RuleNode> for AstNode {
    fn from(node: &RuleNode) -> Self {
        match node {
            RuleNode::Operator {
                operator,
                left,
                right,
            } => AstNode::operator(
                operator.to_string(),
                AstNode::from(left.as_ref()),
                AstNode::from(right.as_ref()),
            ),
            RuleNode::Operand(cond) => AstNode::operand(cond.to_string()),
        }
    }
}

impl TryFrom<&AstNode> for RuleNode {
    type Error = RuleError;

    fn try_from(node: &AstNode) -> Result<Self> {
        node.to_rule_node()
    }
}

/// 已通过结构校验的节点转换，出错说明校验与解析不一致
pub(crate) fn decode(node: &AstNode) -> Result<RuleNode> {
    let value = node.value.as_deref().unwrap_or_default();

    match node.node_type.as_str() {
        NODE_TYPE_OPERATOR => {
            let operator: LogicalOperator = value.parse().map_err(RuleError::InvalidArgument)?;
            let left = child(&node.left)?;
            let right = child(&node.right)?;
            Ok(RuleNode::operator(operator, decode(left)?, decode(right)?))
        }
        _ => Ok(RuleNode::Operand(decode_condition(value)?)),
    }
}

fn child(node: &Option<Box<AstNode>>) -> Result<&AstNode> {
    node.as_deref()
        .ok_or_else(|| RuleError::InvalidArgument("操作符节点缺少子节点".to_string()))
}

fn decode_condition(text: &str) -> Result<Condition> {
    match parse_rule(text)? {
        RuleNode::Operand(cond) => Ok(cond),
        RuleNode::Operator { .. } => Err(RuleError::InvalidArgument(format!(
            "条件 '{}' 中不能包含逻辑操作符",
            text
        ))),
    }
}
