//! 语法分析器
//!
//! 递归下降解析，AND 优先级高于 OR，两者均为左结合：
//!
//! ```text
//! expr       := orExpr
//! orExpr     := andExpr ( 'OR' andExpr )*
//! andExpr    := primary ( 'AND' primary )*
//! primary    := '(' expr ')' | comparison
//! comparison := IDENTIFIER COMPARATOR LITERAL
//! ```

use crate::error::{Result, RuleError};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::models::{RuleNode, Value};
use crate::operators::Comparator;

/// 括号最大嵌套层数
pub const MAX_NESTING_DEPTH: usize = 64;

/// 解析规则文本（词法分析 + 语法分析）
pub fn parse_rule(input: &str) -> Result<RuleNode> {
    let tokens = tokenize(input)?;
    Parser::new(&tokens, input.chars().count()).parse()
}

/// 将词法单元序列解析为规则树
pub fn parse(tokens: &[Token]) -> Result<RuleNode> {
    let end_offset = tokens.last().map(|t| t.end).unwrap_or(0);
    Parser::new(tokens, end_offset).parse()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    end_offset: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], end_offset: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            end_offset,
        }
    }

    fn parse(mut self) -> Result<RuleNode> {
        let node = self.or_expr()?;

        // 剩余未消费的词法单元：缺少操作符或括号不匹配
        if self.peek().is_some() {
            return Err(self.unexpected(&[TokenKind::And, TokenKind::Or]));
        }

        Ok(node)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(&[kind])),
        }
    }

    fn unexpected(&self, expected: &[TokenKind]) -> RuleError {
        let expected = expected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" 或 ");
        self.error_here(expected)
    }

    fn error_here(&self, expected: String) -> RuleError {
        let (found, offset) = match self.peek() {
            Some(token) => (format!("'{}'", token.text), token.offset),
            None => ("输入结束".to_string(), self.end_offset),
        };
        RuleError::Syntax {
            found,
            expected,
            offset,
        }
    }

    fn or_expr(&mut self) -> Result<RuleNode> {
        let mut left = self.and_expr()?;
        while self.peek_kind() == Some(TokenKind::Or) {
            self.advance();
            let right = self.and_expr()?;
            left = RuleNode::or(left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<RuleNode> {
        let mut left = self.primary()?;
        while self.peek_kind() == Some(TokenKind::And) {
            self.advance();
            let right = self.primary()?;
            left = RuleNode::and(left, right);
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<RuleNode> {
        match self.peek_kind() {
            Some(TokenKind::LParen) => {
                if self.depth >= MAX_NESTING_DEPTH {
                    return Err(
                        self.error_here(format!("嵌套不超过 {} 层的表达式", MAX_NESTING_DEPTH))
                    );
                }
                self.advance();
                self.depth += 1;
                let node = self.or_expr()?;
                self.expect(TokenKind::RParen)?;
                self.depth -= 1;
                Ok(node)
            }
            Some(TokenKind::Identifier) => self.comparison(),
            _ => Err(self.unexpected(&[TokenKind::LParen, TokenKind::Identifier])),
        }
    }

    fn comparison(&mut self) -> Result<RuleNode> {
        let attribute = self.expect(TokenKind::Identifier)?;

        let comparator_token = self.expect(TokenKind::Comparator)?;
        let comparator = Comparator::from_symbol(&comparator_token.text).ok_or_else(|| {
            RuleError::Syntax {
                found: format!("'{}'", comparator_token.text),
                expected: TokenKind::Comparator.to_string(),
                offset: comparator_token.offset,
            }
        })?;

        // 比较右侧的裸标识符按字符串字面量处理，如 department = Sales
        let value = match self.peek() {
            Some(token) if token.kind == TokenKind::Literal => {
                self.pos += 1;
                token
                    .value
                    .clone()
                    .unwrap_or_else(|| Value::String(token.text.clone()))
            }
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                Value::String(token.text.clone())
            }
            _ => return Err(self.unexpected(&[TokenKind::Literal])),
        };

        Ok(RuleNode::condition(attribute.text.clone(), comparator, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::LogicalOperator;

    fn cond(attribute: &str, comparator: Comparator, value: impl Into<Value>) -> RuleNode {
        RuleNode::condition(attribute, comparator, value)
    }

    fn syntax_offset(input: &str) -> usize {
        match parse_rule(input) {
            Err(RuleError::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error for {:?}, got {:?}", input, other),
        }
    }

    #[test]
    fn test_single_comparison() {
        let node = parse_rule("age > 30").unwrap();
        assert_eq!(node, cond("age", Comparator::Gt, 30));
    }

    #[test]
    fn test_bare_word_literal_is_string() {
        let node = parse_rule("age > 30 AND department = Sales").unwrap();
        assert_eq!(
            node,
            RuleNode::and(
                cond("age", Comparator::Gt, 30),
                cond("department", Comparator::Eq, "Sales"),
            )
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let node = parse_rule("a = 1 AND b = 2 OR c = 3").unwrap();
        assert_eq!(
            node,
            RuleNode::or(
                RuleNode::and(cond("a", Comparator::Eq, 1), cond("b", Comparator::Eq, 2)),
                cond("c", Comparator::Eq, 3),
            )
        );

        let node = parse_rule("a = 1 OR b = 2 AND c = 3").unwrap();
        assert_eq!(
            node,
            RuleNode::or(
                cond("a", Comparator::Eq, 1),
                RuleNode::and(cond("b", Comparator::Eq, 2), cond("c", Comparator::Eq, 3)),
            )
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let node = parse_rule("a = 1 AND (b = 2 OR c = 3)").unwrap();
        match node {
            RuleNode::Operator {
                operator, right, ..
            } => {
                assert_eq!(operator, LogicalOperator::And);
                assert!(matches!(
                    *right,
                    RuleNode::Operator {
                        operator: LogicalOperator::Or,
                        ..
                    }
                ));
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_left_associative() {
        let node = parse_rule("a = 1 AND b = 2 AND c = 3").unwrap();
        assert_eq!(
            node,
            RuleNode::and(
                RuleNode::and(cond("a", Comparator::Eq, 1), cond("b", Comparator::Eq, 2)),
                cond("c", Comparator::Eq, 3),
            )
        );
    }

    #[test]
    fn test_redundant_parentheses() {
        assert_eq!(
            parse_rule("((age >= 18))").unwrap(),
            cond("age", Comparator::Gte, 18)
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(syntax_offset(""), 0);
        assert!(matches!(parse(&[]), Err(RuleError::Syntax { .. })));
    }

    #[test]
    fn test_end_of_input_offset_after_quoted_literal() {
        let source = r#"(name = "Bob""#;
        let tokens = tokenize(source).unwrap();
        match parse(&tokens) {
            Err(RuleError::Syntax { found, offset, .. }) => {
                assert_eq!(found, "输入结束");
                assert_eq!(offset, source.chars().count());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_parentheses() {
        // 缺少右括号：在输入结束处报错
        assert_eq!(syntax_offset("(a = 1"), 6);
        // 多余的右括号
        assert_eq!(syntax_offset("a = 1)"), 5);
    }

    #[test]
    fn test_missing_operator_between_operands() {
        match parse_rule("a = 1 b = 2") {
            Err(RuleError::Syntax {
                found,
                expected,
                offset,
            }) => {
                assert_eq!(found, "'b'");
                assert_eq!(expected, "AND 或 OR");
                assert_eq!(offset, 6);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_operator_missing_operand() {
        assert_eq!(syntax_offset("a = 1 AND"), 9);
        assert_eq!(syntax_offset("OR a = 1"), 0);
        assert_eq!(syntax_offset("a = 1 AND OR b = 2"), 10);
    }

    #[test]
    fn test_non_comparator_middle_token() {
        match parse_rule("age 30 > 1") {
            Err(RuleError::Syntax {
                found, expected, ..
            }) => {
                assert_eq!(found, "'30'");
                assert_eq!(expected, "比较操作符");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_literal() {
        assert_eq!(syntax_offset("age >"), 5);
        assert_eq!(syntax_offset("age > AND b = 1"), 6);
    }

    #[test]
    fn test_lex_error_propagates() {
        assert!(matches!(
            parse_rule("a = 1 & b = 2"),
            Err(RuleError::Lex { character: '&', .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!(
            "{}a = 1{}",
            "(".repeat(MAX_NESTING_DEPTH + 1),
            ")".repeat(MAX_NESTING_DEPTH + 1)
        );
        assert!(matches!(parse_rule(&deep), Err(RuleError::Syntax { .. })));

        let ok = format!(
            "{}a = 1{}",
            "(".repeat(MAX_NESTING_DEPTH),
            ")".repeat(MAX_NESTING_DEPTH)
        );
        assert!(parse_rule(&ok).is_ok());
    }

    #[test]
    fn test_display_round_trip() {
        let inputs = [
            "age > 30",
            "a = 1 AND b = 2 OR c = 3",
            "a = 1 AND (b = 2 OR c = 3)",
            "(a = 1 OR b = 2) AND (c != \"x y\" OR d <= -4.5)",
            "a = 1 OR (b = 2 OR c = 3)",
            "flag = true AND name = \"quote \\\" inside\"",
        ];

        for input in inputs {
            let tree = parse_rule(input).unwrap();
            let printed = tree.to_string();
            assert_eq!(parse_rule(&printed).unwrap(), tree, "round trip of {}", input);
        }
    }
}
