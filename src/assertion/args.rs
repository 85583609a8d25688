use regex::Regex;
use serde_json::Value;

use crate::assertion::predicate::{Callback, Predicate};
use crate::assertion::schema::Schema;
use crate::assertion::types::{BodyExpectation, HeaderExpectation, Rule};

/// `expect` 的单个参数
#[derive(Debug)]
pub enum ExpectArg {
    Predicate(Predicate),
    Callback(Callback),
    Number(i64),
    Text(String),
    Pattern(Regex),
    Schema(Schema),
    /// 其它 JSON 值；对象和数组按 schema 写法解析
    Json(Value),
}

impl From<Predicate> for ExpectArg {
    fn from(predicate: Predicate) -> Self {
        ExpectArg::Predicate(predicate)
    }
}

impl From<Callback> for ExpectArg {
    fn from(callback: Callback) -> Self {
        ExpectArg::Callback(callback)
    }
}

impl From<Regex> for ExpectArg {
    fn from(re: Regex) -> Self {
        ExpectArg::Pattern(re)
    }
}

impl From<Schema> for ExpectArg {
    fn from(schema: Schema) -> Self {
        ExpectArg::Schema(schema)
    }
}

impl From<&str> for ExpectArg {
    fn from(text: &str) -> Self {
        ExpectArg::Text(text.to_string())
    }
}

impl From<String> for ExpectArg {
    fn from(text: String) -> Self {
        ExpectArg::Text(text)
    }
}

impl From<&String> for ExpectArg {
    fn from(text: &String) -> Self {
        ExpectArg::Text(text.clone())
    }
}

impl From<Value> for ExpectArg {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ExpectArg::Text(text),
            Value::Number(n) if n.is_i64() => ExpectArg::Number(n.as_i64().unwrap_or_default()),
            other => ExpectArg::Json(other),
        }
    }
}

macro_rules! number_arg {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ExpectArg {
                fn from(n: $t) -> Self {
                    ExpectArg::Number(i64::from(n))
                }
            }
        )*
    };
}

number_arg!(i32, i64, u16, u32);

/// `expect` 接受的参数形状：单个值，或 2 / 3 元组
pub trait ExpectArgs {
    fn into_args(self) -> Vec<ExpectArg>;
}

macro_rules! single_arg {
    ($($t:ty),*) => {
        $(
            impl ExpectArgs for $t {
                fn into_args(self) -> Vec<ExpectArg> {
                    vec![self.into()]
                }
            }
        )*
    };
}

single_arg!(
    i32, i64, u16, u32, &str, String, &String, Regex, Schema, Value, Predicate, Callback
);

impl<A: Into<ExpectArg>> ExpectArgs for (A,) {
    fn into_args(self) -> Vec<ExpectArg> {
        vec![self.0.into()]
    }
}

impl<A: Into<ExpectArg>, B: Into<ExpectArg>> ExpectArgs for (A, B) {
    fn into_args(self) -> Vec<ExpectArg> {
        vec![self.0.into(), self.1.into()]
    }
}

impl<A: Into<ExpectArg>, B: Into<ExpectArg>, C: Into<ExpectArg>> ExpectArgs for (A, B, C) {
    fn into_args(self) -> Vec<ExpectArg> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

/// 归类结果：至多一条规则，外加第 2、3 个参数里的终止回调
#[derive(Debug, Default)]
pub struct Classified {
    pub rule: Option<Rule>,
    pub callbacks: Vec<Callback>,
}

/// 按固定优先级把参数归为一条规则
///
/// 1. 第一个参数是 predicate
/// 2. 第一个参数是数字 -> 状态码
/// 3. 第二个参数是字符串、数字或正则 -> header
/// 4. 第一个参数是对象、字符串或正则 -> body
/// 5. 其它形状 -> Unsupported，求值时失败
///
/// 第 2、3 个参数如果是回调，登记为终止回调（第 1 种情况除外）。
pub fn classify(args: Vec<ExpectArg>) -> Classified {
    let mut args = args.into_iter();
    let Some(first) = args.next() else {
        return Classified {
            rule: Some(Rule::Unsupported("expect() without arguments".to_string())),
            callbacks: Vec::new(),
        };
    };

    if let ExpectArg::Predicate(predicate) = first {
        return Classified {
            rule: Some(Rule::Predicate(predicate)),
            callbacks: Vec::new(),
        };
    }

    let mut callbacks = Vec::new();
    let second = match args.next() {
        Some(ExpectArg::Callback(cb)) => {
            callbacks.push(cb);
            None
        }
        other => other,
    };
    if let Some(ExpectArg::Callback(cb)) = args.next() {
        callbacks.push(cb);
    }

    let rule = match (first, second) {
        (ExpectArg::Number(code), _) => status_rule(code),
        (first, Some(second @ (ExpectArg::Text(_) | ExpectArg::Number(_) | ExpectArg::Pattern(_)))) => {
            header_rule(first, second)
        }
        (ExpectArg::Text(text), _) => Rule::Body(BodyExpectation::Literal(Value::String(text))),
        (ExpectArg::Pattern(re), _) => Rule::Body(BodyExpectation::Pattern(re)),
        (ExpectArg::Schema(schema), _) => Rule::Body(BodyExpectation::Schema(schema)),
        (ExpectArg::Json(value @ (Value::Object(_) | Value::Array(_))), _) => schema_rule(&value),
        (other, _) => Rule::Unsupported(format!("cannot build an expectation from {}", describe(&other))),
    };

    Classified {
        rule: Some(rule),
        callbacks,
    }
}

/// 对象形式的 JSON 按 schema 解析成 body 规则
pub(crate) fn schema_rule(value: &Value) -> Rule {
    match Schema::parse(value) {
        Ok(schema) => Rule::Body(BodyExpectation::Schema(schema)),
        Err(e) => Rule::Unsupported(e.to_string()),
    }
}

fn status_rule(code: i64) -> Rule {
    match u16::try_from(code) {
        Ok(code) if (100..600).contains(&code) => Rule::Status(code),
        _ => Rule::Unsupported(format!("invalid status code {}", code)),
    }
}

fn header_rule(name: ExpectArg, expected: ExpectArg) -> Rule {
    let name = match name {
        ExpectArg::Text(text) => text,
        ExpectArg::Number(n) => n.to_string(),
        ExpectArg::Json(value) => value.to_string(),
        ExpectArg::Pattern(re) => re.as_str().to_string(),
        ExpectArg::Schema(schema) => schema.to_string(),
        other => {
            return Rule::Unsupported(format!("{} is not a header name", describe(&other)));
        }
    };

    let expected = match expected {
        ExpectArg::Pattern(re) => HeaderExpectation::Pattern(re),
        ExpectArg::Number(n) => HeaderExpectation::Exact(n.to_string()),
        ExpectArg::Text(text) => HeaderExpectation::Exact(text),
        other => {
            return Rule::Unsupported(format!("{} is not a header value", describe(&other)));
        }
    };

    Rule::header(&name, expected)
}

fn describe(arg: &ExpectArg) -> String {
    match arg {
        ExpectArg::Predicate(_) => "a predicate".to_string(),
        ExpectArg::Callback(_) => "a callback".to_string(),
        ExpectArg::Number(n) => format!("number {}", n),
        ExpectArg::Text(text) => format!("string '{}'", text),
        ExpectArg::Pattern(re) => format!("pattern /{}/", re.as_str()),
        ExpectArg::Schema(schema) => format!("schema {}", schema),
        ExpectArg::Json(value) => format!("value {}", value),
    }
}
