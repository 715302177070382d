//! 规则树结构校验
//!
//! 不依赖输入数据，只检查树本身是否良构。来自存储或外部请求的树在评估前应先校验；
//! 解析器产出的树总能通过校验。

use crate::ast::{AstNode, NODE_TYPE_OPERAND, NODE_TYPE_OPERATOR, decode};
use crate::lexer::{TokenKind, tokenize};
use crate::models::{RuleNode, Value};
use crate::operators::LogicalOperator;
use crate::parser::{MAX_NESTING_DEPTH, parse_rule};
use thiserror::Error;

/// 单条校验错误，带出错节点的路径（如 `root.left.right`）
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{path}: {kind}")]
pub struct ValidationError {
    pub path: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationErrorKind {
    #[error("未知的节点类型 '{0}'")]
    UnknownNodeType(String),

    #[error("未知的逻辑操作符 '{0}'")]
    UnknownOperator(String),

    #[error("操作符节点缺少{0}子节点")]
    MissingChild(&'static str),

    #[error("条件节点不能有子节点")]
    UnexpectedChildren,

    #[error("节点缺少值")]
    MissingValue,

    #[error("条件的属性名不能为空")]
    EmptyAttribute,

    #[error("属性名 '{0}' 不是合法的标识符")]
    InvalidAttribute(String),

    #[error("未知的比较操作符 '{0}'")]
    UnknownComparator(String),

    #[error("数值字面量必须是有限数")]
    NonFiniteNumber,

    #[error("条件格式错误: {0}")]
    MalformedOperand(String),

    #[error("输出为文本后括号嵌套 {0} 层，超过上限 {max}", max = MAX_NESTING_DEPTH)]
    NestingTooDeep(usize),
}

/// 校验外部表示的规则树，返回全部错误（为空表示合法）
pub fn validate(node: &AstNode) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_ast(node, "root", &mut errors);

    // 结构合法后再检查整棵树写回文本时的括号深度
    if errors.is_empty() {
        if let Ok(tree) = decode(node) {
            check_paren_depth(&tree, &mut errors);
        }
    }
    errors
}

/// 校验内存中的规则树
pub fn validate_node(node: &RuleNode) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_rule_node(node, "root", &mut errors);
    check_paren_depth(node, &mut errors);
    errors
}

/// 超过解析器嵌套上限的树无法写回文本后再解析
fn check_paren_depth(node: &RuleNode, errors: &mut Vec<ValidationError>) {
    let depth = node.paren_depth();
    if depth > MAX_NESTING_DEPTH {
        errors.push(ValidationError::new(
            "root",
            ValidationErrorKind::NestingTooDeep(depth),
        ));
    }
}

fn validate_ast(node: &AstNode, path: &str, errors: &mut Vec<ValidationError>) {
    match node.node_type.as_str() {
        NODE_TYPE_OPERATOR => {
            match node.value.as_deref() {
                None => errors.push(ValidationError::new(path, ValidationErrorKind::MissingValue)),
                Some(op) if op.parse::<LogicalOperator>().is_err() => errors.push(
                    ValidationError::new(path, ValidationErrorKind::UnknownOperator(op.to_string())),
                ),
                Some(_) => {}
            }

            for (side, label, child) in [
                ("left", "左", &node.left),
                ("right", "右", &node.right),
            ] {
                match child {
                    Some(child) => validate_ast(child, &format!("{}.{}", path, side), errors),
                    None => errors.push(ValidationError::new(
                        path,
                        ValidationErrorKind::MissingChild(label),
                    )),
                }
            }
        }
        NODE_TYPE_OPERAND => {
            if node.left.is_some() || node.right.is_some() {
                errors.push(ValidationError::new(
                    path,
                    ValidationErrorKind::UnexpectedChildren,
                ));
            }

            match node.value.as_deref() {
                None => errors.push(ValidationError::new(path, ValidationErrorKind::MissingValue)),
                Some(text) => {
                    if let Some(kind) = check_operand_text(text) {
                        errors.push(ValidationError::new(path, kind));
                    }
                }
            }
        }
        other => errors.push(ValidationError::new(
            path,
            ValidationErrorKind::UnknownNodeType(other.to_string()),
        )),
    }
}

/// 检查条件文本能否解析为 属性 比较符 字面量
fn check_operand_text(text: &str) -> Option<ValidationErrorKind> {
    let tokens = match tokenize(text) {
        Ok(tokens) => tokens,
        Err(e) => return Some(ValidationErrorKind::MalformedOperand(e.to_string())),
    };

    match tokens.as_slice() {
        [] => return Some(ValidationErrorKind::MissingValue),
        [first, ..] if first.kind == TokenKind::Comparator => {
            return Some(ValidationErrorKind::EmptyAttribute);
        }
        [_, second, ..] if second.kind != TokenKind::Comparator => {
            return Some(ValidationErrorKind::UnknownComparator(second.text.clone()));
        }
        [_, _] => return Some(ValidationErrorKind::MissingValue),
        _ => {}
    }

    match parse_rule(text) {
        Ok(RuleNode::Operand(_)) => None,
        Ok(RuleNode::Operator { .. }) => Some(ValidationErrorKind::MalformedOperand(
            "条件中不能包含逻辑操作符".to_string(),
        )),
        Err(e) => Some(ValidationErrorKind::MalformedOperand(e.to_string())),
    }
}

fn validate_rule_node(node: &RuleNode, path: &str, errors: &mut Vec<ValidationError>) {
    match node {
        RuleNode::Operator { left, right, .. } => {
            validate_rule_node(left, &format!("{}.left", path), errors);
            validate_rule_node(right, &format!("{}.right", path), errors);
        }
        RuleNode::Operand(cond) => {
            if cond.attribute.trim().is_empty() {
                errors.push(ValidationError::new(path, ValidationErrorKind::EmptyAttribute));
            } else if !is_identifier(&cond.attribute) {
                errors.push(ValidationError::new(
                    path,
                    ValidationErrorKind::InvalidAttribute(cond.attribute.clone()),
                ));
            }

            if let Value::Number(n) = cond.value {
                if !n.is_finite() {
                    errors.push(ValidationError::new(
                        path,
                        ValidationErrorKind::NonFiniteNumber,
                    ));
                }
            }
        }
    }
}

/// 属性名必须恰好是一个标识符词法单元，才能写回文本后被重新解析
fn is_identifier(attribute: &str) -> bool {
    matches!(
        tokenize(attribute).as_deref(),
        Ok([token]) if token.kind == TokenKind::Identifier && token.text == attribute
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::Comparator;

    fn operand(text: &str) -> AstNode {
        AstNode::operand(text)
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorKind> {
        errors.iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn test_parser_output_is_always_valid() {
        for input in [
            "age > 30",
            "age > 30 AND department = Sales",
            "(a = 1 OR b != \"x\") AND c <= 2.5 OR flag = false",
        ] {
            let tree = parse_rule(input).unwrap();
            assert!(validate_node(&tree).is_empty(), "{}", input);
            assert!(validate(&AstNode::from(&tree)).is_empty(), "{}", input);
        }
    }

    #[test]
    fn test_missing_child_is_rejected() {
        let node = AstNode {
            node_type: "operator".to_string(),
            value: Some("AND".to_string()),
            left: Some(Box::new(operand("age > 30"))),
            right: None,
        };

        let errors = validate(&node);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "root");
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingChild("右"));
    }

    #[test]
    fn test_errors_collected_from_all_branches() {
        let node = AstNode::operator(
            "OR",
            AstNode::operand("> 30"),
            AstNode::operator("XOR", operand("a = 1"), operand("b gt 2")),
        );

        let errors = validate(&node);
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["root.left", "root.right", "root.right.right"]);
        assert_eq!(
            kinds(&errors),
            vec![
                ValidationErrorKind::EmptyAttribute,
                ValidationErrorKind::UnknownOperator("XOR".to_string()),
                ValidationErrorKind::UnknownComparator("gt".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_node_type() {
        let node = AstNode {
            node_type: "group".to_string(),
            value: None,
            left: None,
            right: None,
        };
        assert_eq!(
            kinds(&validate(&node)),
            vec![ValidationErrorKind::UnknownNodeType("group".to_string())]
        );
    }

    #[test]
    fn test_operand_defects() {
        let missing_value = AstNode {
            node_type: "operand".to_string(),
            value: None,
            left: None,
            right: None,
        };
        assert_eq!(
            kinds(&validate(&missing_value)),
            vec![ValidationErrorKind::MissingValue]
        );

        assert_eq!(
            kinds(&validate(&operand("age >"))),
            vec![ValidationErrorKind::MissingValue]
        );
        assert_eq!(
            kinds(&validate(&operand(""))),
            vec![ValidationErrorKind::MissingValue]
        );
        assert!(matches!(
            kinds(&validate(&operand("a = 1 AND b = 2"))).as_slice(),
            [ValidationErrorKind::MalformedOperand(_)]
        ));
        assert!(matches!(
            kinds(&validate(&operand("a = 1 & 2"))).as_slice(),
            [ValidationErrorKind::MalformedOperand(_)]
        ));
    }

    #[test]
    fn test_operand_with_children() {
        let mut node = operand("a = 1");
        node.left = Some(Box::new(operand("b = 2")));
        assert_eq!(
            kinds(&validate(&node)),
            vec![ValidationErrorKind::UnexpectedChildren]
        );
    }

    #[test]
    fn test_typed_tree_defects() {
        let tree = RuleNode::and(
            RuleNode::condition("", Comparator::Eq, 1),
            RuleNode::or(
                RuleNode::condition("my attr", Comparator::Eq, 1),
                RuleNode::condition("score", Comparator::Gt, f64::NAN),
            ),
        );

        let errors = validate_node(&tree);
        assert_eq!(
            kinds(&errors),
            vec![
                ValidationErrorKind::EmptyAttribute,
                ValidationErrorKind::InvalidAttribute("my attr".to_string()),
                ValidationErrorKind::NonFiniteNumber,
            ]
        );
        assert_eq!(errors[2].path, "root.right.right");
    }

    /// `aN = 1 AND (...)` 逐层包裹，得到括号深度恰好为 `levels` 的树
    fn right_nested(levels: usize) -> RuleNode {
        let mut tree = RuleNode::and(
            RuleNode::condition("y", Comparator::Eq, 0),
            RuleNode::condition("z", Comparator::Eq, 0),
        );
        for i in 0..levels {
            tree = RuleNode::and(RuleNode::condition(format!("a{}", i), Comparator::Eq, 1), tree);
        }
        tree
    }

    #[test]
    fn test_tree_at_nesting_limit_is_valid() {
        let tree = parse_rule(&right_nested(MAX_NESTING_DEPTH).to_string()).unwrap();
        assert_eq!(tree.paren_depth(), MAX_NESTING_DEPTH);
        assert!(validate_node(&tree).is_empty());
        assert!(validate(&AstNode::from(&tree)).is_empty());
    }

    #[test]
    fn test_tree_past_nesting_limit_is_rejected() {
        let tree = RuleNode::and(
            RuleNode::condition("w", Comparator::Eq, 1),
            right_nested(MAX_NESTING_DEPTH),
        );

        let expected = vec![ValidationErrorKind::NestingTooDeep(MAX_NESTING_DEPTH + 1)];
        assert_eq!(kinds(&validate_node(&tree)), expected);
        assert_eq!(kinds(&validate(&AstNode::from(&tree))), expected);
        assert!(parse_rule(&tree.to_string()).is_err());
    }
}
