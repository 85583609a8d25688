use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, LOCATION};
use hyper::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::types::reason_phrase;

pub type HandlerFuture = Pin<Box<dyn Future<Output = AppResponse> + Send>>;
pub(crate) type Handler = Arc<dyn Fn(AppRequest) -> HandlerFuture + Send + Sync>;

/// handler 要求断开连接时返回给 hyper 的错误
#[derive(Error, Debug)]
#[error("connection dropped by handler")]
pub struct HangUp;

/// 传给 handler 的请求，body 已读完
#[derive(Debug, Clone)]
pub struct AppRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl AppRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 解码后的 query 键值对，保持原顺序
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// 同一个 key 的全部取值，用于 `key[]=a&key[]=b`
    pub fn query_all(&self, key: &str) -> Vec<String> {
        self.query_pairs()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// handler 返回的响应
#[derive(Debug, Clone)]
pub struct AppResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
    hang_up: bool,
}

impl AppResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: Vec::new(),
            body: Bytes::new(),
            hang_up: false,
        }
    }

    /// 200 文本响应
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(body.into())
    }

    /// 200 JSON 响应
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(200)
                .header("content-type", "application/json; charset=utf-8")
                .body(body),
            Err(e) => Self::new(500).body(e.to_string()),
        }
    }

    /// 只带状态短语的响应
    pub fn send_status(status: u16) -> Self {
        Self::text(reason_phrase(status)).status(status)
    }

    /// 302 跳转
    pub fn redirect(location: &str) -> Self {
        Self::new(302)
            .header(LOCATION.as_str(), location)
            .header("content-type", "text/plain; charset=utf-8")
            .body(format!("Found. Redirecting to {}", location))
    }

    /// 不写响应，直接关闭连接
    pub fn hang_up() -> Self {
        Self {
            hang_up: true,
            ..Self::new(200)
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self
    }

    /// 同名 header 会被替换
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn into_hyper(self) -> Result<hyper::Response<Full<Bytes>>, HangUp> {
        if self.hang_up {
            return Err(HangUp);
        }

        let mut headers = HeaderMap::new();
        for (key, value) in &self.headers {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => {
                    tracing::warn!("handler returned invalid header {}: {}", key, value);
                    return Ok(internal_error(format!("invalid header {}", key)));
                }
            }
        }

        let mut response = hyper::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn internal_error(message: String) -> hyper::Response<Full<Bytes>> {
    let mut response = hyper::Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

#[derive(Clone)]
pub(crate) struct Route {
    method: Option<Method>,
    path: Option<String>,
    handler: Handler,
}

impl Route {
    fn matches(&self, method: &Method, path: &str) -> bool {
        let method_ok = match &self.method {
            None => true,
            Some(m) => m == method || (*m == Method::GET && *method == Method::HEAD),
        };
        let path_ok = self.path.as_deref().is_none_or(|p| p == path);
        method_ok && path_ok
    }
}

/// 路由表，按注册顺序匹配，第一个命中的 handler 处理请求
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub(crate) fn push<F, Fut>(&mut self, method: Option<Method>, path: Option<&str>, handler: F)
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| Box::pin(handler(req)));
        self.routes.push(Route {
            method,
            path: path.map(str::to_string),
            handler,
        });
    }

    pub(crate) async fn dispatch(&self, request: AppRequest) -> AppResponse {
        let route = self
            .routes
            .iter()
            .find(|route| route.matches(&request.method, &request.path));

        match route {
            Some(route) => (route.handler)(request).await,
            None => AppResponse::text(format!(
                "Cannot {} {}",
                request.method, request.path
            ))
            .status(404),
        }
    }
}
