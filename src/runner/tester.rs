use std::fmt::Display;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::assertion::{
    Callback, Classified, ExpectArgs, Rule, SchemaMatcher, StructuralMatcher, classify, evaluate,
};
use crate::config::Config;
use crate::http::request::to_object;
use crate::http::{Client, Method, RequestOptions, RequestSpec, Response, Transport};
use crate::runner::completion::{Terminal, settle};
use crate::runner::dispatcher::Dispatcher;
use crate::runner::target::Target;
use crate::{HatestError, Result};

/// 链式请求构造器
///
/// 配置方法都返回自身；同一个构造器只分发一次，
/// `.await` / `end()` / `end_with()` 触发分发。
///
/// ```ignore
/// hatest::request(&app)
///     .get("/user")
///     .set("Accept", "application/json")
///     .expect(("Content-Type", Regex::new("json")?))
///     .expect(200)
///     .await?;
/// ```
#[must_use = "a Hatest does nothing until awaited or ended"]
pub struct Hatest {
    target: Target,
    transport: Option<Arc<dyn Transport>>,
    matcher: Arc<dyn SchemaMatcher>,
    spec: RequestSpec,
    rules: Vec<Rule>,
    callbacks: Vec<Callback>,
    /// 构造过程中的第一个错误，分发时直接作为结果
    error: Option<HatestError>,
}

impl Hatest {
    pub fn new(target: impl Into<Target>) -> Self {
        Self::with_config(target, Config::global())
    }

    pub fn with_config(target: impl Into<Target>, config: &Config) -> Self {
        Self {
            target: target.into(),
            transport: None,
            matcher: Arc::new(StructuralMatcher),
            spec: RequestSpec::new(config),
            rules: Vec::new(),
            callbacks: Vec::new(),
            error: None,
        }
    }

    /// 替换传输层，默认每次分发新建一个 reqwest 客户端
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_schema_matcher(mut self, matcher: Arc<dyn SchemaMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn get(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Get, options.into())
    }

    pub fn post(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Post, options.into())
    }

    pub fn put(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Put, options.into())
    }

    pub fn patch(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Patch, options.into())
    }

    pub fn delete(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Delete, options.into())
    }

    /// `delete` 的别名
    pub fn del(self, options: impl Into<RequestOptions>) -> Self {
        self.delete(options)
    }

    pub fn head(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Head, options.into())
    }

    pub fn options(self, options: impl Into<RequestOptions>) -> Self {
        self.open(Method::Options, options.into())
    }

    /// 按方法名发请求，例如 `req("PATCH", "/items/1")`
    pub fn req(self, method: &str, options: impl Into<RequestOptions>) -> Self {
        match Method::parse(method) {
            Ok(method) => self.open(method, options.into()),
            Err(e) => self.fail(e),
        }
    }

    /// 合并 query 参数
    pub fn query<T: Serialize + ?Sized>(mut self, params: &T) -> Self {
        match to_object(params) {
            Ok(params) => {
                self.spec.merge_query(params);
                self
            }
            Err(e) => self.fail(e),
        }
    }

    /// 设置 header，同名覆盖
    pub fn set(mut self, key: &str, value: impl Display) -> Self {
        match self.spec.set_header(key, &value.to_string()) {
            Ok(()) => self,
            Err(e) => self.fail(e),
        }
    }

    /// 设置 body；两次都是对象时合并字段
    pub fn send<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => {
                self.spec.merge_body(data);
                self
            }
            Err(e) => self.fail(HatestError::InvalidRequest(e.to_string())),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = timeout;
        self
    }

    /// 最多跟随的重定向次数，0 表示不跟随
    pub fn redirects(mut self, max: usize) -> Self {
        self.spec.max_redirects = max;
        self
    }

    /// 追加一条断言规则，参数形状见 [`ExpectArgs`]
    ///
    /// 第 2、3 个参数是 [`Callback`] 时登记为终止回调。
    pub fn expect<A: ExpectArgs>(mut self, args: A) -> Self {
        let Classified { rule, callbacks } = classify(args.into_args());
        if let Some(rule) = rule {
            tracing::debug!("queued rule #{}: {}", self.rules.len() + 1, rule);
            self.rules.push(rule);
        }
        self.callbacks.extend(callbacks);
        self
    }

    /// future 模式结束
    pub async fn end(self) -> Result<Response> {
        self.run().await
    }

    /// 以回调或额外的 schema 结束
    pub async fn end_with(mut self, terminal: impl Into<Terminal>) -> Result<Response> {
        match terminal.into() {
            Terminal::Callback(callback) => self.callbacks.push(callback),
            Terminal::Expect(rule) => self.rules.push(rule),
        }
        self.run().await
    }

    /// verb 方法在调用时就拼好 URL
    fn open(mut self, method: Method, options: RequestOptions) -> Self {
        self.spec.method = method;

        match self.target.base_url() {
            Ok(base) => self.spec.url = base.join(&options.url),
            Err(e) => return self.fail(e),
        }

        self.spec.merge_query(options.query);
        for (key, value) in &options.headers {
            if let Err(e) = self.spec.set_header(key, value) {
                return self.fail(e);
            }
        }
        if let Some(body) = options.body {
            self.spec.merge_body(body);
        }
        if let Some(timeout) = options.timeout {
            self.spec.timeout = timeout;
        }
        if let Some(max) = options.max_redirects {
            self.spec.max_redirects = max;
        }
        self
    }

    /// 只保留第一个构造错误
    fn fail(mut self, error: HatestError) -> Self {
        tracing::warn!("request setup failed: {}", error);
        self.error.get_or_insert(error);
        self
    }

    async fn run(mut self) -> Result<Response> {
        let callbacks = std::mem::take(&mut self.callbacks);
        let (error, response) = match self.error.take() {
            Some(err) => (Some(err), None),
            None => self.dispatch().await,
        };
        settle(error, response, callbacks)
    }

    /// 传输错误不经过断言规则
    async fn dispatch(&mut self) -> (Option<HatestError>, Option<Response>) {
        if self.spec.url.is_empty() {
            return (
                Some(HatestError::InvalidRequest(
                    "no request method called before dispatch".to_string(),
                )),
                None,
            );
        }

        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => transport.clone(),
            None => match Client::new() {
                Ok(client) => Arc::new(client),
                Err(e) => return (Some(e), None),
            },
        };

        let dispatcher = Dispatcher::new(transport);
        let mut response = match dispatcher.send(&self.target, &self.spec).await {
            Ok(response) => response,
            Err(e) => return (Some(e), None),
        };

        let outcome = evaluate(&mut self.rules, Some(&mut response), self.matcher.as_ref());
        (outcome.err().map(HatestError::from), Some(response))
    }
}

impl IntoFuture for Hatest {
    type Output = Result<Response>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}
