//! 规则存储管理
//!
//! 规则以不透明的规则树形式存取，引擎核心不依赖具体存储实现。
//! [`RuleStore`] 使用 DashMap 提供线程安全的内存存储，保存前先编译校验。

use crate::compiler::{CompiledRule, RuleCompiler};
use crate::error::{Result, RuleError};
use crate::models::Rule;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 规则持久化接口
pub trait RuleRepository: Send + Sync {
    /// 保存规则，返回规则 ID；同 ID 规则会被覆盖
    fn save(&self, rule: Rule) -> Result<String>;

    /// 按 ID 读取规则
    fn load(&self, rule_id: &str) -> Result<CompiledRule>;

    /// 删除规则
    fn delete(&self, rule_id: &str) -> Result<()>;

    /// 获取所有规则 ID
    fn list_ids(&self) -> Vec<String>;

    /// 当前存储的规则数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 内存规则存储
#[derive(Clone)]
pub struct RuleStore {
    /// 编译后的规则缓存
    rules: Arc<DashMap<String, CompiledRule>>,
    /// 规则编译器
    compiler: Arc<parking_lot::Mutex<RuleCompiler>>,
}

impl RuleStore {
    /// 创建新的规则存储
    pub fn new() -> Self {
        Self {
            rules: Arc::new(DashMap::new()),
            compiler: Arc::new(parking_lot::Mutex::new(RuleCompiler::new())),
        }
    }

    /// 从规则文本编译并保存
    #[instrument(skip(self, source))]
    pub fn save_source(&self, name: &str, source: &str) -> Result<String> {
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile_source(name, source)?
        };
        Ok(self.insert(compiled))
    }

    /// 获取规则统计信息
    pub fn stats(&self) -> RuleStoreStats {
        let rules_count = self.rules.len();
        let mut total_conditions = 0;
        let mut max_depth = 0;

        for entry in self.rules.iter() {
            total_conditions += entry.root().condition_count();
            max_depth = max_depth.max(entry.root().depth());
        }

        RuleStoreStats {
            rules_count,
            total_conditions,
            max_depth,
            avg_conditions_per_rule: if rules_count > 0 {
                total_conditions as f64 / rules_count as f64
            } else {
                0.0
            },
        }
    }

    fn insert(&self, compiled: CompiledRule) -> String {
        let rule_id = compiled.id().to_string();
        self.rules.insert(rule_id.clone(), compiled);
        info!("规则已保存: {}", rule_id);
        rule_id
    }
}

impl RuleRepository for RuleStore {
    #[instrument(skip(self, rule), fields(rule_id = %rule.id, rule_name = %rule.name))]
    fn save(&self, rule: Rule) -> Result<String> {
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile(rule)?
        };
        Ok(self.insert(compiled))
    }

    fn load(&self, rule_id: &str) -> Result<CompiledRule> {
        self.rules
            .get(rule_id)
            .map(|r| r.clone())
            .ok_or_else(|| RuleError::RuleNotFound(rule_id.to_string()))
    }

    #[instrument(skip(self))]
    fn delete(&self, rule_id: &str) -> Result<()> {
        if self.rules.remove(rule_id).is_some() {
            info!("规则已删除: {}", rule_id);
            Ok(())
        } else {
            warn!("删除不存在的规则: {}", rule_id);
            Err(RuleError::RuleNotFound(rule_id.to_string()))
        }
    }

    fn list_ids(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.key().clone()).collect()
    }

    fn len(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 规则存储统计信息
#[derive(Debug, Clone)]
pub struct RuleStoreStats {
    /// 规则总数
    pub rules_count: usize,
    /// 所有规则的条件总数
    pub total_conditions: usize,
    /// 最深的规则树深度
    pub max_depth: usize,
    /// 平均每条规则的条件数
    pub avg_conditions_per_rule: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleNode;
    use crate::operators::Comparator;

    fn sample_rule(id: &str, name: &str) -> Rule {
        let mut rule = Rule::new(
            name,
            RuleNode::and(
                RuleNode::condition("age", Comparator::Gt, 30),
                RuleNode::condition("department", Comparator::Eq, "Sales"),
            ),
        );
        rule.id = id.to_string();
        rule
    }

    #[test]
    fn test_save_and_load() {
        let store = RuleStore::new();
        let id = store.save(sample_rule("rule-001", "test")).unwrap();

        assert_eq!(id, "rule-001");
        assert_eq!(store.len(), 1);

        let loaded = store.load("rule-001").unwrap();
        assert_eq!(loaded.name(), "test");
        assert_eq!(loaded.root(), &sample_rule("rule-001", "test").root);
    }

    #[test]
    fn test_save_source() {
        let store = RuleStore::new();
        let id = store.save_source("adult", "age >= 18").unwrap();

        assert!(store.list_ids().contains(&id));
        assert_eq!(store.load(&id).unwrap().rule.source(), "age >= 18");
    }

    #[test]
    fn test_save_rejects_invalid_rule() {
        let store = RuleStore::new();
        let rule = Rule::new("bad", RuleNode::condition("", Comparator::Eq, 1));

        assert!(matches!(store.save(rule), Err(RuleError::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_overwrites_same_id() {
        let store = RuleStore::new();
        store.save(sample_rule("rule-001", "test")).unwrap();
        store.save(sample_rule("rule-001", "updated")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load("rule-001").unwrap().name(), "updated");
    }

    #[test]
    fn test_load_nonexistent_rule() {
        let store = RuleStore::new();
        assert!(matches!(
            store.load("nonexistent"),
            Err(RuleError::RuleNotFound(_))
        ));
    }

    #[test]
    fn test_delete_rule() {
        let store = RuleStore::new();
        store.save(sample_rule("rule-001", "test")).unwrap();

        store.delete("rule-001").unwrap();

        assert!(store.load("rule-001").is_err());
        assert!(store.delete("rule-001").is_err());
    }

    #[test]
    fn test_list_ids() {
        let store = RuleStore::new();
        store.save(sample_rule("rule-001", "test1")).unwrap();
        store.save(sample_rule("rule-002", "test2")).unwrap();

        let ids = store.list_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"rule-001".to_string()));
        assert!(ids.contains(&"rule-002".to_string()));
    }

    #[test]
    fn test_stats() {
        let store = RuleStore::new();
        store.save(sample_rule("rule-001", "test1")).unwrap();
        store.save_source("single", "age > 1").unwrap();

        let stats = store.stats();

        assert_eq!(stats.rules_count, 2);
        assert_eq!(stats.total_conditions, 3);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.avg_conditions_per_rule, 1.5);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let store = RuleStore::new();
        let store_clone = store.clone();

        let handle = thread::spawn(move || {
            for i in 0..100 {
                store_clone
                    .save(sample_rule(&format!("rule-{}", i), &format!("test-{}", i)))
                    .unwrap();
            }
        });

        for i in 100..200 {
            store
                .save(sample_rule(&format!("rule-{}", i), &format!("test-{}", i)))
                .unwrap();
        }

        handle.join().unwrap();

        assert_eq!(store.len(), 200);
    }
}
