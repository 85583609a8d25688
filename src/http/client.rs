use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde_json::Value;

use crate::error::TransportError;
use crate::http::request::RequestSpec;
use crate::http::response::{RequestMeta, Response};
use crate::http::types::{Method, Status};
use crate::{HatestError, Result};

/// 传输层：发出一个请求，返回响应或网络错误
///
/// 非 2xx 状态码不算错误，照常返回响应。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, spec: &RequestSpec) -> std::result::Result<Response, TransportError>;
}

/// 基于 reqwest 的默认传输实现
///
/// 重定向由这里手动跟随，次数取自 `RequestSpec::max_redirects`。
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Result<Self> {
        Self::build(false)
    }

    /// 带 cookie store 的客户端，供 Agent 跨请求复用
    pub fn with_cookies() -> Result<Self> {
        Self::build(true)
    }

    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    fn build(cookies: bool) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(cookies)
            .build()
            .map_err(|e| HatestError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { inner })
    }

    async fn send_once(
        &self,
        spec: &RequestSpec,
        method: Method,
        url: &url::Url,
        body: Option<&Value>,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        let mut req = self
            .inner
            .request(method.to_reqwest(), url.clone())
            .headers(spec.headers.clone())
            .timeout(spec.timeout);

        let has_content_type = spec.headers.contains_key(CONTENT_TYPE);
        match body {
            Some(Value::String(text)) => {
                if !has_content_type {
                    req = req.header(CONTENT_TYPE, "text/plain;charset=utf-8");
                }
                req = req.body(text.clone());
            }
            Some(value) => {
                if !has_content_type {
                    req = req.header(CONTENT_TYPE, "application/json");
                }
                req = req.body(value.to_string());
            }
            None => {}
        }

        req.send().await.map_err(|e| classify(e, spec.timeout))
    }
}

#[async_trait]
impl Transport for Client {
    async fn perform(&self, spec: &RequestSpec) -> std::result::Result<Response, TransportError> {
        let start = Instant::now();
        let mut url = url::Url::parse(&spec.full_url())
            .map_err(|e| TransportError::Other(format!("invalid URL {}: {}", spec.url, e)))?;
        let mut method = spec.method;
        let mut body = spec.body.clone();
        let mut hops = 0;

        loop {
            let response = self.send_once(spec, method, &url, body.as_ref()).await?;
            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if status.is_redirection()
                && hops < spec.max_redirects
                && let Some(location) = location
            {
                url = url
                    .join(&location)
                    .map_err(|e| TransportError::Other(format!("invalid redirect: {}", e)))?;
                if status == StatusCode::SEE_OTHER
                    || (method == Method::Post
                        && (status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND))
                {
                    method = Method::Get;
                    body = None;
                }
                hops += 1;
                tracing::debug!("following redirect {} -> {}", status.as_u16(), url);
                continue;
            }

            let status =
                Status::new(status.as_u16()).map_err(|e| TransportError::Other(e.to_string()))?;
            let headers = response.headers().clone();
            let text = response
                .text()
                .await
                .map_err(|e| classify(e, spec.timeout))?;

            return Ok(Response::new(
                status,
                &headers,
                text,
                RequestMeta::new(method, &url),
                start.elapsed(),
            ));
        }
    }
}

/// 把 reqwest 错误归类为 Node 风格的传输错误
fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout.as_millis() as u64);
    }

    if err.is_connect() {
        let refused = io_kind(&err) == Some(ErrorKind::ConnectionRefused);
        return match err.url() {
            Some(url) if refused => TransportError::ConnectionRefused(format!(
                "{}:{}",
                url.host_str().unwrap_or_default(),
                url.port_or_known_default().unwrap_or_default()
            )),
            _ => TransportError::Connect(root_message(&err)),
        };
    }

    // 连接建立后被对端关闭
    if is_hang_up(&err) || err.is_request() || err.is_body() {
        return TransportError::SocketHangUp;
    }

    TransportError::Other(err.to_string())
}

fn sources<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |current: &&'a (dyn StdError + 'static)| {
        (*current).source()
    })
}

fn io_kind(err: &reqwest::Error) -> Option<ErrorKind> {
    sources(err)
        .find_map(|e| e.downcast_ref::<std::io::Error>())
        .map(std::io::Error::kind)
}

fn is_hang_up(err: &reqwest::Error) -> bool {
    sources(err).any(|e| {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            return hyper_err.is_incomplete_message() || hyper_err.is_closed();
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
                    | ErrorKind::BrokenPipe
            );
        }
        false
    })
}

fn root_message(err: &reqwest::Error) -> String {
    sources(err)
        .last()
        .map(|e| e.to_string())
        .unwrap_or_else(|| err.to_string())
}
