pub mod assertion;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod runner;
pub mod server;

// Re-export commonly used types
pub use assertion::{AssertionError, Schema, SchemaMatcher, callback, check};
pub use config::Config;
pub use error::{HatestError, Result, TransportError};
pub use http::{RequestOptions, Response};
pub use runner::{Agent, Hatest, Target, Terminal};
pub use server::{App, AppRequest, AppResponse, Bindable};

/// 针对一个 URL 或进程内服务开始构造请求
pub fn request(target: impl Into<Target>) -> Hatest {
    Hatest::new(target)
}

/// 跨请求保留绑定和 cookie 的构造器
pub fn agent(target: impl Into<Target>) -> Agent {
    Agent::new(target)
}
