//! 规则引擎领域模型

use crate::operators::{Comparator, LogicalOperator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// 规则中的字面量与输入记录中的字段值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

/// 值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    String,
    Boolean,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [Self::Number, Self::String, Self::Boolean];

    /// 在兼容表中的列号
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Number => 0,
            Self::String => 1,
            Self::Boolean => 2,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        };
        write!(f, "{}", s)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Boolean,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// 以规则文本的形式输出，字符串带引号并转义，可被词法分析器原样读回
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "\"")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// 输入记录：字段名到值的映射，每次评估时提供
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(HashMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.0.get(attribute)
    }

    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(attribute.into(), value.into());
    }

    /// 链式插入，便于构造测试数据
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(attribute, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// 条件（叶子节点）：属性 比较符 字面量
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub comparator: Comparator,
    pub value: Value,
}

impl Condition {
    pub fn new(attribute: impl Into<String>, comparator: Comparator, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            comparator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.comparator, self.value)
    }
}

/// 规则节点（逻辑操作或条件）
///
/// 父节点独占子节点，构建后不再修改，可在线程间共享只读评估。
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Operator {
        operator: LogicalOperator,
        left: Box<RuleNode>,
        right: Box<RuleNode>,
    },
    Operand(Condition),
}

impl RuleNode {
    pub fn operator(operator: LogicalOperator, left: RuleNode, right: RuleNode) -> Self {
        Self::Operator {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: RuleNode, right: RuleNode) -> Self {
        Self::operator(LogicalOperator::And, left, right)
    }

    pub fn or(left: RuleNode, right: RuleNode) -> Self {
        Self::operator(LogicalOperator::Or, left, right)
    }

    pub fn condition(
        attribute: impl Into<String>,
        comparator: Comparator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Operand(Condition::new(attribute, comparator, value))
    }

    /// 树的深度（单个条件为 1）
    pub fn depth(&self) -> usize {
        match self {
            Self::Operand(_) => 1,
            Self::Operator { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// 条件节点数量
    pub fn condition_count(&self) -> usize {
        match self {
            Self::Operand(_) => 1,
            Self::Operator { left, right, .. } => left.condition_count() + right.condition_count(),
        }
    }

    /// 输出为文本后括号的最大嵌套层数，与 [`fmt::Display`] 的加括号规则一致
    pub fn paren_depth(&self) -> usize {
        match self {
            Self::Operand(_) => 0,
            Self::Operator {
                operator,
                left,
                right,
            } => {
                let left_depth =
                    left.paren_depth() + usize::from(left.needs_parens(*operator, false));
                let right_depth =
                    right.paren_depth() + usize::from(right.needs_parens(*operator, true));
                left_depth.max(right_depth)
            }
        }
    }

    fn needs_parens(&self, parent: LogicalOperator, is_right: bool) -> bool {
        match self {
            Self::Operand(_) => false,
            Self::Operator { operator, .. } => {
                operator.precedence() < parent.precedence()
                    || (is_right && operator.precedence() == parent.precedence())
            }
        }
    }

    fn write_child(
        &self,
        f: &mut fmt::Formatter<'_>,
        parent: LogicalOperator,
        is_right: bool,
    ) -> fmt::Result {
        if self.needs_parens(parent, is_right) {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// 输出为规则文本，只在优先级或左结合需要时加括号，重新解析后得到相同的树结构
impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operand(cond) => write!(f, "{}", cond),
            Self::Operator {
                operator,
                left,
                right,
            } => {
                left.write_child(f, *operator, false)?;
                write!(f, " {} ", operator)?;
                right.write_child(f, *operator, true)
            }
        }
    }
}

/// 规则定义（持久化单元）
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub root: RuleNode,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(name: impl Into<String>, root: RuleNode) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            root,
            created_at: Utc::now(),
        }
    }

    /// 规则的文本形式
    pub fn source(&self) -> String {
        self.root.to_string()
    }
}

/// 评估结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub matched: bool,
    pub rule_id: String,
    pub rule_name: String,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_ms: i64,
}

impl EvaluationResult {
    pub fn new(rule_id: String, rule_name: String) -> Self {
        Self {
            matched: false,
            rule_id,
            rule_name,
            matched_conditions: Vec::new(),
            evaluation_trace: Vec::new(),
            evaluation_time_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserialization() {
        let record =
            Record::from_json(r#"{"age": 35, "department": "Sales", "is_vip": true}"#).unwrap();

        assert_eq!(record.get("age"), Some(&Value::Number(35.0)));
        assert_eq!(record.get("department"), Some(&Value::from("Sales")));
        assert_eq!(record.get("is_vip"), Some(&Value::Bool(true)));
        assert_eq!(record.get("nonexistent"), None);
    }

    #[test]
    fn test_record_rejects_nested_values() {
        assert!(Record::from_json(r#"{"tags": ["a", "b"]}"#).is_err());
        assert!(Record::from_json(r#"{"age": null}"#).is_err());
    }

    #[test]
    fn test_value_display_quotes_strings() {
        assert_eq!(Value::from("Sales").to_string(), "\"Sales\"");
        assert_eq!(Value::from(r#"say "hi""#).to_string(), r#""say \"hi\"""#);
        assert_eq!(Value::from(30).to_string(), "30");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(false).to_string(), "false");
    }

    #[test]
    fn test_display_adds_parens_only_when_needed() {
        let a = RuleNode::condition("a", Comparator::Eq, 1);
        let b = RuleNode::condition("b", Comparator::Eq, 2);
        let c = RuleNode::condition("c", Comparator::Eq, 3);

        let or_of_and = RuleNode::or(RuleNode::and(a.clone(), b.clone()), c.clone());
        assert_eq!(or_of_and.to_string(), "a = 1 AND b = 2 OR c = 3");

        let and_of_or = RuleNode::and(a.clone(), RuleNode::or(b.clone(), c.clone()));
        assert_eq!(and_of_or.to_string(), "a = 1 AND (b = 2 OR c = 3)");

        let right_nested = RuleNode::and(a, RuleNode::and(b, c));
        assert_eq!(right_nested.to_string(), "a = 1 AND (b = 2 AND c = 3)");
    }

    #[test]
    fn test_tree_metrics() {
        let tree = RuleNode::and(
            RuleNode::condition("a", Comparator::Gt, 1),
            RuleNode::or(
                RuleNode::condition("b", Comparator::Lt, 2),
                RuleNode::condition("c", Comparator::Eq, true),
            ),
        );

        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.condition_count(), 3);
        assert_eq!(tree.paren_depth(), 1);
    }

    #[test]
    fn test_paren_depth_follows_display() {
        let a = RuleNode::condition("a", Comparator::Eq, 1);
        let b = RuleNode::condition("b", Comparator::Eq, 2);
        let c = RuleNode::condition("c", Comparator::Eq, 3);

        assert_eq!(a.paren_depth(), 0);
        // 左结合链不需要括号
        let left_chain = RuleNode::and(RuleNode::and(a.clone(), b.clone()), c.clone());
        assert_eq!(left_chain.paren_depth(), 0);

        let nested = RuleNode::and(a.clone(), RuleNode::or(b.clone(), RuleNode::and(c, a)));
        assert_eq!(nested.to_string(), "a = 1 AND (b = 2 OR c = 3 AND a = 1)");
        assert_eq!(nested.paren_depth(), 1);

        let twice = RuleNode::and(b, nested);
        assert_eq!(twice.paren_depth(), 2);
    }
}
