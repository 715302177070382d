//! 布尔规则引擎
//!
//! 提供规则表达式的解析、组合、校验与评估能力，支持：
//! - 规则文本的词法分析和语法解析（AND 优先级高于 OR，支持括号）
//! - 多棵规则树按逻辑操作符左折叠组合
//! - 规则树结构校验
//! - 针对属性记录的短路求值
//! - 规则编译和存储

pub mod ast;
pub mod combinator;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod lexer;
pub mod models;
pub mod operators;
pub mod parser;
pub mod store;
pub mod validator;

pub use ast::AstNode;
pub use combinator::combine;
pub use compiler::{CompiledRule, RuleCompiler, extract_attributes};
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, evaluate};
pub use executor::RuleExecutor;
pub use lexer::{Token, TokenKind, tokenize};
pub use models::{Condition, EvaluationResult, Record, Rule, RuleNode, Value, ValueKind};
pub use operators::{Comparator, LogicalOperator};
pub use parser::{MAX_NESTING_DEPTH, parse, parse_rule};
pub use store::{RuleRepository, RuleStore, RuleStoreStats};
pub use validator::{ValidationError, ValidationErrorKind, validate, validate_node};
