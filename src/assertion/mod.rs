//! 断言模块 - expect 参数归类、规则队列与求值
mod args;
mod evaluator;
mod predicate;
mod schema;
mod types;

pub use args::{Classified, ExpectArg, ExpectArgs, classify};
pub(crate) use args::schema_rule;
pub use evaluator::evaluate;
pub use predicate::{Callback, CheckResult, IntoCheckResult, Predicate, callback, check};
pub use schema::{Kind, Schema, SchemaError, SchemaMatcher, SchemaViolation, StructuralMatcher, Validation};
pub use types::{AssertionError, BodyExpectation, HeaderExpectation, Rule, inspect};
