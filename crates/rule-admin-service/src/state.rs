//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use rule_engine::{RuleRepository, RuleStore};
use rule_shared::config::EngineConfig;
use std::sync::Arc;

/// Axum 应用共享状态
///
/// 规则存储通过 trait 对象注入，handler 不依赖具体实现
#[derive(Clone)]
pub struct AppState {
    /// 规则存储
    pub repository: Arc<dyn RuleRepository>,
    /// 规则引擎限制与默认行为
    pub engine: EngineConfig,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(repository: Arc<dyn RuleRepository>, engine: EngineConfig) -> Self {
        Self { repository, engine }
    }

    /// 使用内存规则存储
    pub fn in_memory(engine: EngineConfig) -> Self {
        Self::new(Arc::new(RuleStore::new()), engine)
    }
}
