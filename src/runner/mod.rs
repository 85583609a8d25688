//! 分发与结束：构造器、Agent、Dispatcher 和结果收尾
mod agent;
mod completion;
mod dispatcher;
mod target;
mod tester;

pub use agent::Agent;
pub use completion::{Terminal, settle};
pub use dispatcher::Dispatcher;
pub use target::Target;
pub use tester::Hatest;
