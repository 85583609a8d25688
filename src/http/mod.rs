pub mod client;
pub mod query;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types for convenient access
pub use client::{Client, Transport};
pub use request::{RequestOptions, RequestSpec};
pub use response::{RequestMeta, Response};
pub use types::{BaseUrl, Method, Status};
