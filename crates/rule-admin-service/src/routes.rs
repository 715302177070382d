//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post},
};
use rule_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 构建规则相关的路由，挂载在 /api/rules 下
pub fn rule_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::rule::create_rule))
        .route("/combine", post(handlers::rule::combine_rules))
        .route("/evaluate", post(handlers::rule::evaluate_rule))
        .route("/validate", post(handlers::rule::validate_rule))
        .route("/health", get(handlers::health::health_check))
        .route(
            "/{id}",
            get(handlers::rule::get_rule).delete(handlers::rule::delete_rule),
        )
}

/// 构建完整应用：路由、可观测性中间件与共享状态
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/rules", rule_routes())
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
