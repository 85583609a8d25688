use std::sync::Arc;

use crate::Result;
use crate::http::{RequestSpec, Response, Transport};
use crate::runner::target::Target;

/// 每个队列只发出一个请求
///
/// 传输错误直接作为 `HatestError::Transport` 返回，不经过断言规则；
/// 非 2xx 响应照常返回。
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn send(&self, target: &Target, spec: &RequestSpec) -> Result<Response> {
        target.start()?;

        tracing::debug!("{} {}", spec.method, spec.full_url());
        match self.transport.perform(spec).await {
            Ok(response) => {
                tracing::info!(
                    "{} {} -> {} ({}ms)",
                    response.request.method,
                    response.request.path,
                    response.status,
                    response.duration.as_millis()
                );
                Ok(response)
            }
            Err(err) => {
                tracing::warn!("{} {} failed: {}", spec.method, spec.url, err);
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::TransportError;
    use crate::http::response::tests::create_test_response;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn perform(
            &self,
            _spec: &RequestSpec,
        ) -> std::result::Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TransportError::SocketHangUp)
            } else {
                Ok(create_test_response(500, r#"{"message": "boom"}"#))
            }
        }
    }

    fn spec() -> RequestSpec {
        let mut spec = RequestSpec::new(&Config::default());
        spec.url = "http://127.0.0.1:3000/".to_string();
        spec
    }

    #[tokio::test]
    async fn test_server_error_is_a_response() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let dispatcher = Dispatcher::new(transport.clone());
        let target = Target::from("http://127.0.0.1:3000");

        let response = dispatcher.send(&target, &spec()).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_error_has_no_expected_actual() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let dispatcher = Dispatcher::new(transport);
        let target = Target::from("http://127.0.0.1:3000");

        let err = dispatcher.send(&target, &spec()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "socket hang up");
        assert!(err.expected().is_none());
        assert!(err.actual().is_none());
    }
}
