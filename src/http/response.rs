use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::HeaderMap as Headers;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{HatestError, Result};
use crate::http::types::{Method, Status};

/// 实际发出的请求信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: Method,
    pub url: String,
    /// 路径加 query，例如 `/?val[]=Test1`
    pub path: String,
}

impl RequestMeta {
    pub fn new(method: Method, url: &url::Url) -> Self {
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Self {
            method,
            url: url.to_string(),
            path,
        }
    }
}

/// 分发得到的响应
///
/// 断言过程中不会被修改，只有 predicate 规则可以有意地改写它，
/// 后续规则会看到改写后的值。
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    /// 小写 header 名到值；同名多值以 ", " 连接
    pub headers: BTreeMap<String, String>,
    /// body 能解析成 JSON 时为解析结果，否则为原始文本
    pub data: Value,
    /// 原始 body 文本
    pub text: String,
    pub request: RequestMeta,
    pub duration: Duration,
}

impl Response {
    pub fn new(
        status: Status,
        headers: &Headers,
        text: String,
        request: RequestMeta,
        duration: Duration,
    ) -> Self {
        Self {
            status,
            headers: flatten_headers(headers),
            data: parse_data(&text),
            text,
            request,
            duration,
        }
    }

    /// 大小写不敏感地读取 header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| HatestError::Other(e.to_string()))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirect()
    }
}

fn flatten_headers(headers: &Headers) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

fn parse_data(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::String(text.to_string());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
