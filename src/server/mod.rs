/// 被测应用：路由、请求/响应类型，以及绑定到临时端口
mod app;
mod listener;

pub use app::{AppRequest, AppResponse, HandlerFuture, HangUp, Router};
pub use listener::{App, Bindable};
