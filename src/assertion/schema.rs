use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// 基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    /// 任意值，但字段必须存在
    Any,
}

impl Kind {
    fn parse(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "string" => Kind::String,
            "number" => Kind::Number,
            "boolean" | "bool" => Kind::Boolean,
            "object" => Kind::Object,
            "array" => Kind::Array,
            "null" => Kind::Null,
            "any" => Kind::Any,
            _ => return None,
        };
        Some(kind)
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Kind::String,
            Value::Number(_) => Kind::Number,
            Value::Bool(_) => Kind::Boolean,
            Value::Object(_) => Kind::Object,
            Value::Array(_) => Kind::Array,
            Value::Null => Kind::Null,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        self == Kind::Any || self == Kind::of(value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::String => "String",
            Kind::Number => "Number",
            Kind::Boolean => "Boolean",
            Kind::Object => "Object",
            Kind::Array => "Array",
            Kind::Null => "Null",
            Kind::Any => "Any",
        }
    }
}

/// 结构描述
///
/// JSON 写法：
/// - `"String"` / `"Number"` / ... 基本类型，`"String?"` 表示可缺省或为 null
/// - `{ "name": "String" }` 对象，只检查列出的字段
/// - `["Number"]` 元素都满足给定结构的数组，`[]` 等同于 `"Array"`
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Kind(Kind),
    Optional(Box<Schema>),
    Shape(BTreeMap<String, Schema>),
    ArrayOf(Box<Schema>),
}

impl Schema {
    pub const STRING: Schema = Schema::Kind(Kind::String);
    pub const NUMBER: Schema = Schema::Kind(Kind::Number);
    pub const BOOLEAN: Schema = Schema::Kind(Kind::Boolean);
    pub const OBJECT: Schema = Schema::Kind(Kind::Object);
    pub const ARRAY: Schema = Schema::Kind(Kind::Array);
    pub const NULL: Schema = Schema::Kind(Kind::Null);
    pub const ANY: Schema = Schema::Kind(Kind::Any);

    pub fn shape<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Shape(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn array_of(item: Schema) -> Self {
        Schema::ArrayOf(Box::new(item))
    }

    pub fn optional(self) -> Self {
        match self {
            Schema::Optional(_) => self,
            other => Schema::Optional(Box::new(other)),
        }
    }

    /// 从 JSON 写法解析
    pub fn parse(value: &Value) -> Result<Self, SchemaError> {
        Self::parse_at(value, "$")
    }

    fn parse_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        match value {
            Value::String(name) => {
                let name = name.trim();
                if let Some(inner) = name.strip_suffix('?') {
                    return Ok(Self::parse_at(&Value::String(inner.to_string()), path)?.optional());
                }
                Kind::parse(name)
                    .map(Schema::Kind)
                    .ok_or_else(|| SchemaError::new(path, format!("unknown type {}", name)))
            }
            Value::Object(fields) => {
                let mut shape = BTreeMap::new();
                for (key, field) in fields {
                    let field_path = format!("{}.{}", path, key);
                    shape.insert(key.clone(), Self::parse_at(field, &field_path)?);
                }
                Ok(Schema::Shape(shape))
            }
            Value::Array(items) => match items.as_slice() {
                [] => Ok(Schema::ARRAY),
                [item] => Ok(Schema::array_of(Self::parse_at(item, &format!("{}[]", path))?)),
                _ => Err(SchemaError::new(
                    path,
                    "array schema takes a single item schema".to_string(),
                )),
            },
            other => Err(SchemaError::new(path, format!("unsupported node {}", other))),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Kind(kind) => f.write_str(kind.as_str()),
            Schema::Optional(inner) => write!(f, "{}?", inner),
            Schema::Shape(_) => f.write_str("Object"),
            Schema::ArrayOf(item) => write!(f, "Array<{}>", item),
        }
    }
}

/// schema 本身写错了
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid schema at {path}: {reason}")]
pub struct SchemaError {
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    fn new(path: &str, reason: String) -> Self {
        Self {
            path: path.to_string(),
            reason,
        }
    }
}

/// 值不符合 schema
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {path} to be {expected}, got {actual}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

/// 校验结果
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub error: Option<SchemaViolation>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn failed(error: SchemaViolation) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

/// 结构匹配器，body schema 规则通过它校验整个 data
pub trait SchemaMatcher: Send + Sync {
    fn validate(&self, schema: &Schema, value: &Value) -> Validation;
}

/// 默认匹配器：对象只检查列出的字段，多余字段忽略
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralMatcher;

impl SchemaMatcher for StructuralMatcher {
    fn validate(&self, schema: &Schema, value: &Value) -> Validation {
        match check(schema, Some(value), "data") {
            Ok(()) => Validation::ok(),
            Err(violation) => Validation::failed(violation),
        }
    }
}

fn check(schema: &Schema, value: Option<&Value>, path: &str) -> Result<(), SchemaViolation> {
    let violation = |actual: &str| SchemaViolation {
        path: path.to_string(),
        expected: schema.to_string(),
        actual: actual.to_string(),
    };

    match (schema, value) {
        (Schema::Optional(_), None | Some(Value::Null)) => Ok(()),
        (Schema::Optional(inner), value) => check(inner, value, path),
        (_, None) => Err(violation("undefined")),
        (Schema::Kind(kind), Some(value)) => {
            if kind.accepts(value) {
                Ok(())
            } else {
                Err(violation(Kind::of(value).as_str()))
            }
        }
        (Schema::Shape(fields), Some(Value::Object(object))) => {
            for (key, field) in fields {
                check(field, object.get(key), &format!("{}.{}", path, key))?;
            }
            Ok(())
        }
        (Schema::ArrayOf(item), Some(Value::Array(items))) => {
            for (index, value) in items.iter().enumerate() {
                check(item, Some(value), &format!("{}[{}]", path, index))?;
            }
            Ok(())
        }
        (_, Some(value)) => Err(violation(Kind::of(value).as_str())),
    }
}
