//! 规则 API 处理器
//!
//! 实现规则的创建、组合、评估、结构校验、查询与删除。

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use rule_engine::{
    AstNode, CompiledRule, LogicalOperator, Record, Rule, RuleError, RuleExecutor, RuleNode,
    combine, evaluate, parse_rule, validate,
};
use rule_shared::observability::metrics;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, CombineRulesRequest, CreateRuleRequest, DeletedResponse, EvaluateResponse,
        EvaluateRuleRequest, RuleDto, ValidateResponse, ValidateRuleRequest,
    },
    error::{AdminError, Result},
    state::AppState,
};

/// 未指定名称时的规则名
const DEFAULT_RULE_NAME: &str = "unnamed";

/// 解析规则文本并记录解析指标
fn parse_with_limit(source: &str, max_len: usize) -> Result<RuleNode> {
    let len = source.chars().count();
    if len > max_len {
        return Err(AdminError::InvalidRequest(format!(
            "规则文本长度 {} 超过上限 {}",
            len, max_len
        )));
    }

    match parse_rule(source) {
        Ok(tree) => {
            metrics::record_rule_parse("ok");
            Ok(tree)
        }
        Err(e) => {
            metrics::record_rule_parse(e.code());
            Err(e.into())
        }
    }
}

/// 创建规则
///
/// POST /api/rules/create
#[instrument(skip_all)]
pub async fn create_rule(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateRuleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RuleDto>>> {
    let Json(req) = payload?;
    req.validate()?;

    let tree = parse_with_limit(&req.rule, state.engine.max_rule_length)?;
    let rule = Rule::new(req.name.as_deref().unwrap_or(DEFAULT_RULE_NAME), tree);
    let dto = RuleDto::from(&rule);

    let rule_id = state.repository.save(rule)?;
    metrics::set_rules_stored(state.repository.len());

    info!(rule_id = %rule_id, rule_name = %dto.name, "Rule created");

    Ok(Json(ApiResponse::success(dto)))
}

/// 组合多条规则
///
/// POST /api/rules/combine
#[instrument(skip_all)]
pub async fn combine_rules(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CombineRulesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AstNode>>> {
    let Json(req) = payload?;
    req.validate()?;

    if req.rules.len() > state.engine.max_rules_per_combine {
        return Err(AdminError::InvalidRequest(format!(
            "一次最多组合 {} 条规则",
            state.engine.max_rules_per_combine
        )));
    }

    let operator: LogicalOperator = req
        .operator
        .as_deref()
        .unwrap_or("AND")
        .parse()
        .map_err(RuleError::InvalidArgument)?;

    let trees = req
        .rules
        .iter()
        .map(|source| parse_with_limit(source, state.engine.max_rule_length))
        .collect::<Result<Vec<_>>>()?;

    let combined = combine(trees, operator)?;

    info!(
        rules = req.rules.len(),
        operator = %operator,
        conditions = combined.condition_count(),
        "Rules combined"
    );

    Ok(Json(ApiResponse::success(AstNode::from(&combined))))
}

/// 待评估的目标：请求中直接提交的树，或已保存的规则
enum Target {
    Tree(RuleNode),
    Stored(CompiledRule),
}

impl Target {
    fn root(&self) -> &RuleNode {
        match self {
            Self::Tree(node) => node,
            Self::Stored(compiled) => compiled.root(),
        }
    }
}

/// 评估规则
///
/// POST /api/rules/evaluate
#[instrument(skip_all)]
pub async fn evaluate_rule(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EvaluateRuleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<EvaluateResponse>>> {
    let Json(req) = payload?;
    req.validate()?;

    let target = match (req.ast, req.rule_id) {
        (Some(ast), _) => Target::Tree(ast.to_rule_node()?),
        (None, Some(rule_id)) => Target::Stored(state.repository.load(&rule_id)?),
        (None, None) => {
            return Err(AdminError::InvalidRequest(
                "ast 与 ruleId 必须且只能提供一个".to_string(),
            ));
        }
    };

    let with_trace = req.trace.unwrap_or(state.engine.trace_evaluations);
    let start = Instant::now();
    let outcome = run(&target, &req.data, with_trace);
    let elapsed = start.elapsed().as_secs_f64();

    let label = match &outcome {
        Ok(response) if response.result => "matched",
        Ok(_) => "not_matched",
        Err(e) => e.code(),
    };
    metrics::record_rule_evaluation(label, elapsed);
    debug!(outcome = label, elapsed_secs = elapsed, "Rule evaluated");

    Ok(Json(ApiResponse::success(outcome?)))
}

fn run(target: &Target, record: &Record, with_trace: bool) -> rule_engine::Result<EvaluateResponse> {
    if !with_trace {
        return Ok(EvaluateResponse {
            result: evaluate(target.root(), record)?,
            trace: None,
        });
    }

    let executor = RuleExecutor::new().with_trace();
    let result = match target {
        Target::Tree(node) => executor.execute_tree(node, record)?,
        Target::Stored(compiled) => executor.execute(compiled, record)?,
    };

    Ok(EvaluateResponse {
        result: result.matched,
        trace: Some(result),
    })
}

/// 校验规则树结构
///
/// POST /api/rules/validate
pub async fn validate_rule(
    payload: std::result::Result<Json<ValidateRuleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ValidateResponse>>> {
    let Json(req) = payload?;

    let errors = validate(&req.ast);
    debug!(errors = errors.len(), "Rule tree validated");

    Ok(Json(ApiResponse::success(ValidateResponse::from_errors(
        &errors,
    ))))
}

/// 获取规则详情
///
/// GET /api/rules/{id}
#[instrument(skip(state))]
pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RuleDto>>> {
    let compiled = state.repository.load(&id)?;
    Ok(Json(ApiResponse::success(RuleDto::from(&compiled.rule))))
}

/// 删除规则
///
/// DELETE /api/rules/{id}
#[instrument(skip(state))]
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.repository.delete(&id)?;
    metrics::set_rules_stored(state.repository.len());

    info!(rule_id = %id, "Rule deleted");

    Ok(Json(ApiResponse::success(DeletedResponse::success())))
}
