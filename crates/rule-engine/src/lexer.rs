//! 词法分析器
//!
//! 基于 winnow 组合子将规则文本切分为有序的词法单元序列，
//! 每个单元记录其在输入中的字符区间。

use crate::error::{Result, RuleError};
use crate::models::Value;
use std::fmt;
use std::ops::Range;
use winnow::{
    combinator::{alt, preceded, repeat, terminated},
    prelude::*,
    stream::{LocatingSlice, Stream},
    token::{any, none_of, one_of, take_while},
};

/// 词法单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Comparator,
    Literal,
    And,
    Or,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Identifier => "标识符",
            Self::Comparator => "比较操作符",
            Self::Literal => "字面量",
            Self::And => "AND",
            Self::Or => "OR",
            Self::LParen => "'('",
            Self::RParen => "')'",
        };
        write!(f, "{}", s)
    }
}

/// 词法单元
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 原始文本（字符串字面量为去掉引号、处理转义后的内容）
    pub text: String,
    /// 在输入中的起始字符偏移
    pub offset: usize,
    /// 在输入中的结束字符偏移（不含），字符串字面量包含引号
    pub end: usize,
    /// 字面量的类型化值，仅 `Literal` 有
    pub value: Option<Value>,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            kind,
            text: text.into(),
            offset: span.start,
            end: span.end,
            value: None,
        }
    }

    fn literal(text: impl Into<String>, span: Range<usize>, value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::new(TokenKind::Literal, text, span)
        }
    }
}

type Input<'a> = LocatingSlice<&'a str>;
type LexResult<T> = winnow::Result<T>;

/// 单个词法单元的内容，位置由外层的 span 给出
#[derive(Clone)]
enum Lexeme<'a> {
    Paren(TokenKind),
    Comparator(&'a str),
    Quoted(String),
    Word(&'a str),
}

/// 将规则文本切分为词法单元
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut input = LocatingSlice::new(source);
    let mut cursor = CharCursor::new(source);
    let mut tokens = Vec::new();

    loop {
        // 空白可以为空，不会失败
        let _ = skip_whitespace(&mut input);

        let start = source.len() - input.eof_offset();
        let Some(next) = source[start..].chars().next() else {
            break;
        };

        let (lexeme, span) = next_lexeme
            .with_span()
            .parse_next(&mut input)
            .map_err(|_| RuleError::Lex {
                character: next,
                offset: cursor.offset(start),
            })?;
        let span = cursor.offset(span.start)..cursor.offset(span.end);

        tokens.push(match lexeme {
            Lexeme::Paren(kind) => Token::new(kind, &source[start..start + 1], span),
            Lexeme::Comparator(symbol) => Token::new(TokenKind::Comparator, symbol, span),
            Lexeme::Quoted(content) => {
                let value = Value::String(content.clone());
                Token::literal(content, span, value)
            }
            Lexeme::Word(word) => classify_word(word, span)?,
        });
    }

    Ok(tokens)
}

fn skip_whitespace(input: &mut Input<'_>) -> LexResult<()> {
    take_while(0.., char::is_whitespace).void().parse_next(input)
}

fn next_lexeme<'a>(input: &mut Input<'a>) -> LexResult<Lexeme<'a>> {
    alt((
        '('.value(Lexeme::Paren(TokenKind::LParen)),
        ')'.value(Lexeme::Paren(TokenKind::RParen)),
        comparator.map(Lexeme::Comparator),
        quoted.map(Lexeme::Quoted),
        take_while(1.., is_word_char).map(Lexeme::Word),
    ))
    .parse_next(input)
}

/// 多字符操作符优先匹配
fn comparator<'a>(input: &mut Input<'a>) -> LexResult<&'a str> {
    alt((">=", "<=", "!=", ">", "<", "=")).parse_next(input)
}

/// 单引号或双引号包围的字符串，反斜杠转义下一个字符
fn quoted(input: &mut Input<'_>) -> LexResult<String> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    terminated(
        repeat(0.., alt((preceded('\\', any), none_of([quote, '\\'])))),
        quote,
    )
    .parse_next(input)
}

fn classify_word(word: &str, span: Range<usize>) -> Result<Token> {
    let token = match word {
        "AND" => Token::new(TokenKind::And, word, span),
        "OR" => Token::new(TokenKind::Or, word, span),
        "true" => Token::literal(word, span, Value::Bool(true)),
        "false" => Token::literal(word, span, Value::Bool(false)),
        _ => match parse_number(word) {
            Some(n) if n.is_finite() => Token::literal(word, span, Value::Number(n)),
            Some(_) => {
                return Err(RuleError::Syntax {
                    found: format!("'{}'", word),
                    expected: "有限范围内的数值".to_string(),
                    offset: span.start,
                });
            }
            None => Token::new(TokenKind::Identifier, word, span),
        },
    };
    Ok(token)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')
}

/// 只把带数字的词当作数值，排除 "inf"、"NaN" 之类；超出 f64 范围时得到无穷
fn parse_number(text: &str) -> Option<f64> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok()
}

/// 字节位置到字符偏移的换算，查询位置须单调不减
struct CharCursor<'a> {
    source: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            byte: 0,
            chars: 0,
        }
    }

    fn offset(&mut self, byte: usize) -> usize {
        self.chars += self.source[self.byte..byte].chars().count();
        self.byte = byte;
        self.chars
    }
}
