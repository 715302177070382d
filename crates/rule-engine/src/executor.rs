//! 规则执行器
//!
//! 实现规则的短路求值执行，返回匹配结果和评估追踪信息。
//! 语义与 [`crate::evaluator::evaluate`] 一致，额外记录命中的条件与求值路径。

use crate::compiler::CompiledRule;
use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::models::{Condition, EvaluationResult, Record, RuleNode};
use crate::operators::LogicalOperator;
use std::time::Instant;

/// 规则执行器
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 执行规则评估
    pub fn execute(&self, rule: &CompiledRule, record: &Record) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::new(rule.id().to_string(), rule.name().to_string());
        self.run(rule.root(), record, &mut result)?;
        Ok(result)
    }

    /// 直接评估一棵未编译的规则树
    pub fn execute_tree(&self, root: &RuleNode, record: &Record) -> Result<EvaluationResult> {
        let mut result = EvaluationResult::new(String::new(), String::new());
        self.run(root, record, &mut result)?;
        Ok(result)
    }

    fn run(&self, root: &RuleNode, record: &Record, result: &mut EvaluationResult) -> Result<()> {
        let start = Instant::now();
        let matched = self.evaluate_node(root, record, result, "root")?;

        result.matched = matched;
        result.evaluation_time_ms = start.elapsed().as_millis() as i64;
        Ok(())
    }

    /// 递归评估规则节点
    fn evaluate_node(
        &self,
        node: &RuleNode,
        record: &Record,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        match node {
            RuleNode::Operand(cond) => self.evaluate_condition(cond, record, result, path),
            RuleNode::Operator {
                operator,
                left,
                right,
            } => self.evaluate_operator(*operator, left, right, record, result, path),
        }
    }

    /// 评估条件节点
    fn evaluate_condition(
        &self,
        cond: &Condition,
        record: &Record,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        let matched = ConditionEvaluator::evaluate(record.get(&cond.attribute), cond)?;

        if self.trace_enabled {
            result.evaluation_trace.push(format!(
                "{}: {} => {}",
                path,
                cond,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        if matched {
            result.matched_conditions.push(format!("{}: {}", path, cond));
        }

        Ok(matched)
    }

    /// 评估操作符节点（短路求值）
    fn evaluate_operator(
        &self,
        operator: LogicalOperator,
        left: &RuleNode,
        right: &RuleNode,
        record: &Record,
        result: &mut EvaluationResult,
        path: &str,
    ) -> Result<bool> {
        let left_matched = self.evaluate_node(left, record, result, &format!("{}.left", path))?;

        let short_circuit = match operator {
            LogicalOperator::And => !left_matched,
            LogicalOperator::Or => left_matched,
        };

        if short_circuit {
            if self.trace_enabled {
                result.evaluation_trace.push(format!(
                    "{}: {} 短路 - 左侧为 {}",
                    path, operator, left_matched
                ));
            }
            return Ok(left_matched);
        }

        let matched = self.evaluate_node(right, record, result, &format!("{}.right", path))?;

        if self.trace_enabled {
            result
                .evaluation_trace
                .push(format!("{}: {} => {}", path, operator, matched));
        }

        Ok(matched)
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::RuleCompiler;
    use crate::error::RuleError;

    fn compile_rule(source: &str) -> CompiledRule {
        let mut compiler = RuleCompiler::new();
        compiler.compile_source("test", source).unwrap()
    }

    fn create_test_record() -> Record {
        Record::new()
            .with("age", 35)
            .with("department", "Sales")
            .with("salary", 60000)
            .with("is_manager", false)
    }

    #[test]
    fn test_simple_condition_match() {
        let rule = compile_rule("department = Sales");
        let result = RuleExecutor::new()
            .execute(&rule, &create_test_record())
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.rule_name, "test");
        assert_eq!(result.matched_conditions, vec!["root: department = \"Sales\""]);
        assert!(result.evaluation_trace.is_empty());
    }

    #[test]
    fn test_simple_condition_not_match() {
        let rule = compile_rule("department = Marketing");
        let result = RuleExecutor::new()
            .execute(&rule, &create_test_record())
            .unwrap();

        assert!(!result.matched);
        assert!(result.matched_conditions.is_empty());
    }

    #[test]
    fn test_and_short_circuit_trace() {
        let rule = compile_rule("is_manager = true AND bonus > 100");
        let result = RuleExecutor::new()
            .with_trace()
            .execute(&rule, &create_test_record())
            .unwrap();

        assert!(!result.matched);
        assert_eq!(
            result.evaluation_trace,
            vec![
                "root.left: is_manager = true => NOT_MATCHED",
                "root: AND 短路 - 左侧为 false",
            ]
        );
    }

    #[test]
    fn test_or_short_circuit_trace() {
        let rule = compile_rule("age > 30 OR bonus > 100");
        let result = RuleExecutor::new()
            .with_trace()
            .execute(&rule, &create_test_record())
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.matched_conditions, vec!["root.left: age > 30"]);
        assert!(result.evaluation_trace[1].contains("OR 短路"));
    }

    #[test]
    fn test_nested_rule() {
        let rule = compile_rule("(age > 40 OR salary >= 50000) AND department = Sales");
        let result = RuleExecutor::new()
            .with_trace()
            .execute(&rule, &create_test_record())
            .unwrap();

        assert!(result.matched);
        assert_eq!(
            result.matched_conditions,
            vec![
                "root.left.right: salary >= 50000",
                "root.right: department = \"Sales\"",
            ]
        );
    }

    #[test]
    fn test_matches_plain_evaluate() {
        let record = create_test_record();
        for source in [
            "age > 30 AND department = Sales",
            "age < 30 OR is_manager = true",
            "salary != 60000 OR (age >= 35 AND age <= 35)",
        ] {
            let rule = compile_rule(source);
            let traced = RuleExecutor::new().with_trace().execute(&rule, &record).unwrap();
            let plain = crate::evaluator::evaluate(rule.root(), &record).unwrap();
            assert_eq!(traced.matched, plain, "{}", source);
        }
    }

    #[test]
    fn test_execute_tree_propagates_errors() {
        let tree = crate::parser::parse_rule("bonus > 1").unwrap();
        let result = RuleExecutor::new().execute_tree(&tree, &create_test_record());
        assert!(matches!(result, Err(RuleError::MissingAttribute(_))));
    }
}
