use std::fmt;

use regex::Regex;
use serde_json::Value;

use crate::assertion::predicate::Predicate;
use crate::assertion::schema::Schema;

/// 断言失败
///
/// 每个失败只对应一条规则。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    /// 是否适合以 diff 形式展示 expected / actual
    pub show_diff: bool,
}

impl AssertionError {
    /// 只有消息，没有 expected / actual（例如 predicate 失败）
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: None,
            actual: None,
            show_diff: false,
        }
    }

    pub fn mismatch(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            show_diff: false,
        }
    }

    /// 带 diff 标记的失败
    pub fn diff(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            show_diff: true,
            ..Self::mismatch(message, expected, actual)
        }
    }
}

/// header 期望值
#[derive(Debug, Clone)]
pub enum HeaderExpectation {
    Exact(String),
    Pattern(Regex),
}

impl HeaderExpectation {
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            HeaderExpectation::Exact(expected) => expected == actual,
            HeaderExpectation::Pattern(re) => re.is_match(actual),
        }
    }
}

impl fmt::Display for HeaderExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderExpectation::Exact(value) => write!(f, "{}", value),
            HeaderExpectation::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// body 期望值
#[derive(Debug, Clone)]
pub enum BodyExpectation {
    /// 与 data 完全相等
    Literal(Value),
    /// 匹配 body 文本
    Pattern(Regex),
    /// 交给 schema matcher 校验整个 data
    Schema(Schema),
}

/// 队列中的一条断言规则，入队后不再改变
#[derive(Debug)]
pub enum Rule {
    Status(u16),
    Header {
        /// 已转成小写
        name: String,
        expected: HeaderExpectation,
    },
    Body(BodyExpectation),
    Predicate(Predicate),
    /// 无法归类的 expect 参数，求值时失败
    Unsupported(String),
}

impl Rule {
    pub fn header(name: &str, expected: HeaderExpectation) -> Self {
        Rule::Header {
            name: name.to_ascii_lowercase(),
            expected,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Status(code) => write!(f, "status {}", code),
            Rule::Header { name, expected } => write!(f, "header {} matching {}", name, expected),
            Rule::Body(BodyExpectation::Literal(value)) => write!(f, "body {}", inspect(value)),
            Rule::Body(BodyExpectation::Pattern(re)) => write!(f, "body matching /{}/", re.as_str()),
            Rule::Body(BodyExpectation::Schema(schema)) => write!(f, "body shaped {}", schema),
            Rule::Predicate(_) => write!(f, "predicate"),
            Rule::Unsupported(reason) => write!(f, "unsupported ({})", reason),
        }
    }
}

/// 人类可读的值表示，字符串用单引号包裹
pub fn inspect(value: &Value) -> String {
    match value {
        Value::String(s) if s.contains('\'') && !s.contains('"') => format!("\"{}\"", s),
        Value::String(s) => format!("'{}'", s.replace('\'', "\\'")),
        other => other.to_string(),
    }
}
