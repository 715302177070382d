//! 条件评估器
//!
//! 针对输入记录评估规则树。比较前按操作符兼容表检查类型，不做隐式类型转换：
//! 数值只与数值比较，字符串和布尔值只支持 `=`/`!=`。

use crate::error::{Result, RuleError};
use crate::models::{Condition, Record, RuleNode, Value};
use crate::operators::{Comparator, LogicalOperator};

/// 评估规则树
///
/// AND 在左侧为 false 时、OR 在左侧为 true 时不再评估右侧，
/// 因此右侧引用的缺失字段不会导致错误。
pub fn evaluate(node: &RuleNode, record: &Record) -> Result<bool> {
    match node {
        RuleNode::Operand(cond) => {
            ConditionEvaluator::evaluate(record.get(&cond.attribute), cond)
        }
        RuleNode::Operator {
            operator,
            left,
            right,
        } => {
            let left_matched = evaluate(left, record)?;
            match (operator, left_matched) {
                (LogicalOperator::And, false) => Ok(false),
                (LogicalOperator::Or, true) => Ok(true),
                _ => evaluate(right, record),
            }
        }
    }
}

/// 单个条件的评估
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估条件
    ///
    /// # Arguments
    /// * `field_value` - 从输入记录中取得的字段值，字段缺失时为 `None`
    /// * `cond` - 规则中的条件
    pub fn evaluate(field_value: Option<&Value>, cond: &Condition) -> Result<bool> {
        let field_value =
            field_value.ok_or_else(|| RuleError::MissingAttribute(cond.attribute.clone()))?;

        Self::compare(field_value, cond.comparator, &cond.value)
    }

    /// 比较字段值与期望值
    pub fn compare(field: &Value, comparator: Comparator, expected: &Value) -> Result<bool> {
        if !comparator.supports(expected.kind()) {
            return Err(RuleError::TypeMismatch {
                comparator: comparator.to_string(),
                expected: comparator.supported_kinds(),
                actual: expected.kind().to_string(),
            });
        }

        if field.kind() != expected.kind() {
            return Err(RuleError::TypeMismatch {
                comparator: comparator.to_string(),
                expected: expected.kind().to_string(),
                actual: field.kind().to_string(),
            });
        }

        match (field, expected) {
            (Value::Number(a), Value::Number(b)) => Ok(Self::compare_numbers(*a, comparator, *b)),
            (Value::String(a), Value::String(b)) => Ok(Self::equality(a == b, comparator)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Self::equality(a == b, comparator)),
            // 类型已在上面对齐
            _ => Err(RuleError::TypeMismatch {
                comparator: comparator.to_string(),
                expected: expected.kind().to_string(),
                actual: field.kind().to_string(),
            }),
        }
    }

    /// 数值按原值比较，不引入误差容忍，`=` 与大小比较的结论保持一致
    fn compare_numbers(a: f64, comparator: Comparator, b: f64) -> bool {
        match comparator {
            Comparator::Eq => a == b,
            Comparator::Neq => a != b,
            Comparator::Gt => a > b,
            Comparator::Gte => a >= b,
            Comparator::Lt => a < b,
            Comparator::Lte => a <= b,
        }
    }

    /// 只支持相等类操作符的类型；兼容表已排除大小比较
    fn equality(equal: bool, comparator: Comparator) -> bool {
        match comparator {
            Comparator::Neq => !equal,
            _ => equal,
        }
    }
}
