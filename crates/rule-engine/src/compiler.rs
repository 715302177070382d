//! 规则编译器
//!
//! 将规则文本或规则树校验后编译成可执行的规则，并预提取规则引用的字段。

use crate::error::{Result, RuleError};
use crate::models::{Rule, RuleNode};
use crate::parser::parse_rule;
use crate::validator::validate_node;
use std::collections::BTreeSet;

/// 编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 原始规则
    pub rule: Rule,
    /// 规则中引用的所有属性名
    pub required_attributes: BTreeSet<String>,
    /// 编译版本号（用于缓存失效）
    pub compile_version: u64,
}

impl CompiledRule {
    /// 获取规则 ID
    pub fn id(&self) -> &str {
        &self.rule.id
    }

    /// 获取规则名称
    pub fn name(&self) -> &str {
        &self.rule.name
    }

    /// 获取根节点
    pub fn root(&self) -> &RuleNode {
        &self.rule.root
    }
}

/// 规则编译器
pub struct RuleCompiler {
    compile_version: u64,
}

impl RuleCompiler {
    pub fn new() -> Self {
        Self { compile_version: 0 }
    }

    /// 从规则文本编译
    pub fn compile_source(&mut self, name: &str, source: &str) -> Result<CompiledRule> {
        let root = parse_rule(source)?;
        self.compile(Rule::new(name, root))
    }

    /// 编译规则
    pub fn compile(&mut self, rule: Rule) -> Result<CompiledRule> {
        if rule.id.is_empty() {
            return Err(RuleError::InvalidArgument("规则 ID 不能为空".to_string()));
        }

        let errors = validate_node(&rule.root);
        if !errors.is_empty() {
            return Err(RuleError::Validation(errors));
        }

        let required_attributes = extract_attributes(&rule.root);

        self.compile_version += 1;

        Ok(CompiledRule {
            rule,
            required_attributes,
            compile_version: self.compile_version,
        })
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// 提取规则中引用的所有属性名
pub fn extract_attributes(node: &RuleNode) -> BTreeSet<String> {
    let mut attributes = BTreeSet::new();
    collect_attributes(node, &mut attributes);
    attributes
}

fn collect_attributes(node: &RuleNode, attributes: &mut BTreeSet<String>) {
    match node {
        RuleNode::Operand(cond) => {
            attributes.insert(cond.attribute.clone());
        }
        RuleNode::Operator { left, right, .. } => {
            collect_attributes(left, attributes);
            collect_attributes(right, attributes);
        }
    }
}
