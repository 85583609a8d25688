use std::future::Future;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener as StdListener};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use http_body_util::BodyExt;
use hyper::Method;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::Result;
use crate::http::types::BaseUrl;
use crate::server::app::{AppRequest, AppResponse, HangUp, Router};

/// 可以绑定到 socket 上被测试的服务
///
/// 只要求能给出监听地址、说明是否走 TLS，以及在第一次分发前开始接收连接。
pub trait Bindable: Send + Sync {
    /// 监听地址；尚未绑定时绑定到系统分配的临时端口
    fn local_addr(&self) -> Result<SocketAddr>;

    fn is_tls(&self) -> bool {
        false
    }

    /// 开始处理连接，重复调用无副作用
    fn start(&self) -> Result<()>;

    fn base_url(&self) -> Result<BaseUrl> {
        Ok(BaseUrl::from_socket(self.local_addr()?, self.is_tls()))
    }
}

#[derive(Default)]
enum BindState {
    #[default]
    Unbound,
    /// 已绑定；listener 在开始服务前一直保存在这里
    Bound {
        addr: SocketAddr,
        pending: Option<StdListener>,
    },
}

/// 进程内被测应用
///
/// 克隆共享同一个绑定，所以同一个 App 的多次分发使用同一个地址。
#[derive(Clone, Default)]
pub struct App {
    router: Router,
    state: Arc<Mutex<BindState>>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有请求都交给同一个 handler
    pub fn from_fn<F, Fut>(handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        let mut app = Self::new();
        app.router.push(None, None, handler);
        app
    }

    pub fn route<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.router.push(Some(method), Some(path), handler);
        self
    }

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn patch<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.route(Method::PATCH, path, handler)
    }

    pub fn delete<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    pub fn options<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.route(Method::OPTIONS, path, handler)
    }

    /// 任意方法
    pub fn all<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(AppRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResponse> + Send + 'static,
    {
        self.router.push(None, Some(path), handler);
        self
    }

    /// 绑定到指定地址；已经绑定过时返回原地址
    pub fn listen(&self, addr: SocketAddr) -> Result<SocketAddr> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let BindState::Bound { addr, .. } = &*state {
            return Ok(*addr);
        }

        let listener = StdListener::bind(addr)?;
        let addr = listener.local_addr()?;
        tracing::debug!("test server bound to {}", addr);
        *state = BindState::Bound {
            addr,
            pending: Some(listener),
        };
        Ok(addr)
    }
}

impl Bindable for App {
    fn local_addr(&self) -> Result<SocketAddr> {
        self.listen(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    fn start(&self) -> Result<()> {
        self.local_addr()?;

        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                BindState::Bound { pending, .. } => pending.take(),
                BindState::Unbound => None,
            }
        };

        // 已经在服务
        let Some(listener) = pending else {
            return Ok(());
        };

        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        tokio::spawn(run(listener, self.router.clone()));
        Ok(())
    }
}

async fn run(listener: TcpListener, router: Router) {
    let router = Arc::new(router);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!("test server accept failed: {}", err);
                let delay = accept_backoff(&err);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let router = router.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle(req, router.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!("connection from {} closed: {}", peer, err);
            }
        });
    }
}

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// accept 失败后的等待时间
///
/// 单个连接的错误立即重试；其它错误（例如文件描述符耗尽）会持续出现，稍等再试。
fn accept_backoff(err: &std::io::Error) -> Duration {
    match err.kind() {
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted => {
            Duration::ZERO
        }
        _ => ACCEPT_BACKOFF,
    }
}

async fn handle(
    req: hyper::Request<Incoming>,
    router: Arc<Router>,
) -> std::result::Result<hyper::Response<http_body_util::Full<hyper::body::Bytes>>, HangUp> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await.map_err(|_| HangUp)?.to_bytes();
    let request = AppRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };
    router.dispatch(request).await.into_hyper()
}
