use std::sync::Arc;

use crate::Result;
use crate::http::BaseUrl;
use crate::server::{App, Bindable};

/// 请求目标：现成的基础 URL，或待绑定的进程内服务
///
/// 克隆共享同一个服务，绑定只发生一次。
#[derive(Clone)]
pub enum Target {
    Url(String),
    Bound(Arc<dyn Bindable>),
}

impl Target {
    pub fn bound<B: Bindable + 'static>(server: B) -> Self {
        Target::Bound(Arc::new(server))
    }

    /// 基础地址；进程内服务在第一次调用时绑定临时端口
    pub fn base_url(&self) -> Result<BaseUrl> {
        match self {
            Target::Url(url) => BaseUrl::parse(url),
            Target::Bound(server) => server.base_url(),
        }
    }

    /// 分发前确保服务已在接收连接
    pub fn start(&self) -> Result<()> {
        match self {
            Target::Url(_) => Ok(()),
            Target::Bound(server) => server.start(),
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Target::Bound(_) => f.write_str("Bound(..)"),
        }
    }
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Target::Url(url.to_string())
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Target::Url(url)
    }
}

impl From<&String> for Target {
    fn from(url: &String) -> Self {
        Target::Url(url.clone())
    }
}

impl From<App> for Target {
    fn from(app: App) -> Self {
        Target::bound(app)
    }
}

impl From<&App> for Target {
    fn from(app: &App) -> Self {
        Target::bound(app.clone())
    }
}

impl From<Arc<dyn Bindable>> for Target {
    fn from(server: Arc<dyn Bindable>) -> Self {
        Target::Bound(server)
    }
}
