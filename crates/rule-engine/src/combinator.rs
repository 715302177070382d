//! 规则树组合
//!
//! 将多棵规则树按给定逻辑操作符从左到右折叠成一棵树。

use crate::error::{Result, RuleError};
use crate::models::RuleNode;
use crate::operators::LogicalOperator;
use crate::parser::MAX_NESTING_DEPTH;

/// 组合多棵规则树
///
/// 单棵树原样返回，不额外包一层操作符节点；多棵树左结合折叠：
/// `combine([t1, t2, t3], AND)` 等价于 `(t1 AND t2) AND t3`。
/// 输入树被移入新树，只新建操作符节点。同一棵树不应与自身组合。
pub fn combine<I>(trees: I, operator: LogicalOperator) -> Result<RuleNode>
where
    I: IntoIterator<Item = RuleNode>,
{
    let mut trees = trees.into_iter();
    let first = trees
        .next()
        .ok_or_else(|| RuleError::InvalidArgument("待组合的规则列表不能为空".to_string()))?;

    let combined = trees.fold(first, |combined, tree| {
        RuleNode::operator(operator, combined, tree)
    });

    // 组合结果须能写回文本并重新解析
    let depth = combined.paren_depth();
    if depth > MAX_NESTING_DEPTH {
        return Err(RuleError::InvalidArgument(format!(
            "组合后括号嵌套 {} 层，超过上限 {}",
            depth, MAX_NESTING_DEPTH
        )));
    }

    Ok(combined)
}
