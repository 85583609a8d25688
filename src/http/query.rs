use serde_json::{Map, Value};

/// 浅合并，后写入的 key 覆盖先前的值
pub fn merge(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

/// 序列化 query 参数
///
/// - 标量直接输出
/// - 数组输出为重复的 `key[]=value`，单元素数组也一样
/// - 对象先序列化成 JSON 再编码
/// - null 被跳过
pub fn serialize(params: &Map<String, Value>) -> String {
    let mut parts = Vec::new();

    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                let key = format!("{}[]", key);
                for item in items.iter().filter(|v| !v.is_null()) {
                    parts.push(format!("{}={}", encode(&key), encode(&scalar(item))));
                }
            }
            other => parts.push(format!("{}={}", encode(key), encode(&scalar(other)))),
        }
    }

    parts.join("&")
}

/// 把 query 字符串拼到 URL 上，URL 已有 query 时用 `&` 连接
pub fn append(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    match fragment {
        Some(fragment) => format!("{}{}{}#{}", base, separator, query, fragment),
        None => format!("{}{}{}", base, separator, query),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => value.to_string(),
        other => other.to_string(),
    }
}

/// 百分号编码，保留 `[ ] : $ ,` 等字符，空格编码为 `+`
fn encode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace("%3A", ":")
        .replace("%24", "$")
        .replace("%2C", ",")
        .replace("%5B", "[")
        .replace("%5D", "]")
        .replace("%21", "!")
        .replace("%7E", "~")
        .replace("%28", "(")
        .replace("%29", ")")
}
