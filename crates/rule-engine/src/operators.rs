//! 规则操作符定义

use crate::models::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

/// 操作符与值类型的兼容表，列顺序与 [`ValueKind::index`] 一致：number, string, boolean
///
/// 字符串不支持大小比较。
const COMPATIBILITY: [(Comparator, [bool; 3]); 6] = [
    (Comparator::Eq, [true, true, true]),
    (Comparator::Neq, [true, true, true]),
    (Comparator::Gt, [true, false, false]),
    (Comparator::Gte, [true, false, false]),
    (Comparator::Lt, [true, false, false]),
    (Comparator::Lte, [true, false, false]),
];

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
    ];

    /// 操作符的文本形式
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// 从文本解析操作符
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.symbol() == symbol)
    }

    /// 查表判断操作符是否支持该值类型
    pub fn supports(&self, kind: ValueKind) -> bool {
        COMPATIBILITY
            .iter()
            .find(|(comparator, _)| comparator == self)
            .map(|(_, row)| row[kind.index()])
            .unwrap_or(false)
    }

    /// 该操作符支持的值类型描述（用于错误信息）
    pub fn supported_kinds(&self) -> String {
        ValueKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| format!("未知的比较操作符: {}", s))
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// 结合优先级，数值越大结合越紧
    pub fn precedence(&self) -> u8 {
        match self {
            Self::And => 2,
            Self::Or => 1,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(format!("未知的逻辑操作符: {}", other)),
        }
    }
}
