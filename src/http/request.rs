use std::time::Duration;

use reqwest::header::{HeaderMap as Headers, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::http::query;
use crate::http::types::Method;
use crate::{HatestError, Result};

/// 分发前累积的请求配置
///
/// query / header / body 的重复设置都是浅合并，不会整体替换。
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// 已拼上基础地址的 URL，不含 query
    pub url: String,
    pub query: Map<String, Value>,
    pub headers: Headers,
    pub body: Option<Value>,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl RequestSpec {
    pub fn new(config: &Config) -> Self {
        let mut headers = Headers::new();
        if let Some(agent) = &config.user_agent
            && let Ok(value) = HeaderValue::from_str(agent)
        {
            headers.insert(reqwest::header::USER_AGENT, value);
        }

        Self {
            method: Method::Get,
            url: String::new(),
            query: Map::new(),
            headers,
            body: None,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }

    pub fn merge_query(&mut self, params: Map<String, Value>) {
        query::merge(&mut self.query, params);
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> Result<()> {
        let name: HeaderName = key
            .parse()
            .map_err(|_| HatestError::InvalidRequest(format!("invalid header name: {}", key)))?;
        let value: HeaderValue = value.parse().map_err(|_| {
            HatestError::InvalidRequest(format!("invalid value for header {}", key))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// 两边都是对象时合并字段，否则新值替换旧值
    pub fn merge_body(&mut self, data: Value) {
        match (&mut self.body, data) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                query::merge(existing, incoming);
            }
            (body, data) => *body = Some(data),
        }
    }

    /// 带 query 的完整 URL
    pub fn full_url(&self) -> String {
        query::append(&self.url, &query::serialize(&self.query))
    }
}

/// verb 方法的参数：裸路径或完整选项
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub url: String,
    pub query: Map<String, Value>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub max_redirects: Option<usize>,
}

impl RequestOptions {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn query<T: Serialize>(mut self, params: &T) -> Result<Self> {
        query::merge(&mut self.query, to_object(params)?);
        Ok(self)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(data).map_err(to_invalid)?);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }
}

impl From<&str> for RequestOptions {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for RequestOptions {
    fn from(url: String) -> Self {
        Self {
            url,
            ..Self::default()
        }
    }
}

impl From<&String> for RequestOptions {
    fn from(url: &String) -> Self {
        Self::new(url)
    }
}

/// 序列化为 JSON 对象，非对象报错
pub(crate) fn to_object<T: Serialize + ?Sized>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value).map_err(to_invalid)? {
        Value::Object(map) => Ok(map),
        other => Err(HatestError::InvalidRequest(format!(
            "query parameters must be an object, got {}",
            other
        ))),
    }
}

fn to_invalid(err: serde_json::Error) -> HatestError {
    HatestError::InvalidRequest(err.to_string())
}
