use std::sync::Arc;

use crate::assertion::{SchemaMatcher, StructuralMatcher};
use crate::config::Config;
use crate::http::{Client, RequestOptions, Transport};
use crate::runner::target::Target;
use crate::runner::tester::Hatest;

/// 可重复使用的构造器
///
/// 所有请求共享同一个目标（进程内服务只绑定一次）和同一个带 cookie 的客户端，
/// 每次调用 verb 方法得到一个新的 [`Hatest`]，各自有独立的断言队列。
/// 适合串行使用：分发、等待结束，再分发下一个。
#[derive(Clone)]
pub struct Agent {
    target: Target,
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    matcher: Arc<dyn SchemaMatcher>,
}

impl Agent {
    pub fn new(target: impl Into<Target>) -> Self {
        Self::with_config(target, Config::global())
    }

    pub fn with_config(target: impl Into<Target>, config: &Config) -> Self {
        let transport = match Client::with_cookies() {
            Ok(client) => Some(Arc::new(client) as Arc<dyn Transport>),
            Err(e) => {
                // 退回每次分发新建客户端，cookie 不再跨请求保留
                tracing::warn!("agent cookie store unavailable: {}", e);
                None
            }
        };

        Self {
            target: target.into(),
            config: config.clone(),
            transport,
            matcher: Arc::new(StructuralMatcher),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_schema_matcher(mut self, matcher: Arc<dyn SchemaMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// 基于共享状态的新构造器
    pub fn request(&self) -> Hatest {
        let hatest = Hatest::with_config(self.target.clone(), &self.config)
            .with_schema_matcher(self.matcher.clone());
        match &self.transport {
            Some(transport) => hatest.with_transport(transport.clone()),
            None => hatest,
        }
    }

    pub fn get(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().get(options)
    }

    pub fn post(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().post(options)
    }

    pub fn put(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().put(options)
    }

    pub fn patch(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().patch(options)
    }

    pub fn delete(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().delete(options)
    }

    pub fn del(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().del(options)
    }

    pub fn head(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().head(options)
    }

    pub fn options(&self, options: impl Into<RequestOptions>) -> Hatest {
        self.request().options(options)
    }

    pub fn req(&self, method: &str, options: impl Into<RequestOptions>) -> Hatest {
        self.request().req(method, options)
    }
}
