//! 共享库
//!
//! 包含所有服务共用的配置加载、日志与指标等基础设施代码。

pub mod config;
pub mod observability;
