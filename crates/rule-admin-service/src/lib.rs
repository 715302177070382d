//! 规则管理服务
//!
//! 通过 REST API 暴露规则引擎能力：从文本创建规则、组合多条规则、
//! 针对记录评估规则、校验外部提交的规则树，以及规则的查询与删除。
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use dto::{ApiResponse, CombineRulesRequest, CreateRuleRequest, EvaluateRuleRequest};
pub use error::{AdminError, Result};
pub use routes::app;
pub use state::AppState;
