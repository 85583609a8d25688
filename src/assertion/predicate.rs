use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::HatestError;
use crate::http::Response;

pub type CheckResult = std::result::Result<(), anyhow::Error>;

/// predicate / callback 允许的返回值
///
/// `()` 表示通过；`Err` 表示失败，`Ok` 里的值被忽略。
pub trait IntoCheckResult {
    fn into_check_result(self) -> CheckResult;
}

impl IntoCheckResult for () {
    fn into_check_result(self) -> CheckResult {
        Ok(())
    }
}

impl<T, E> IntoCheckResult for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn into_check_result(self) -> CheckResult {
        self.map(|_| ()).map_err(Into::into)
    }
}

type PredicateFn = dyn FnMut(&mut Response) -> CheckResult + Send;
type CallbackFn = dyn FnOnce(Option<&HatestError>, Option<&Response>) -> CheckResult + Send;

/// 任意检查函数，可以修改响应，后续规则会看到修改
pub struct Predicate(Box<PredicateFn>);

impl Predicate {
    pub fn new<F, R>(mut f: F) -> Self
    where
        F: FnMut(&mut Response) -> R + Send + 'static,
        R: IntoCheckResult,
    {
        Self(Box::new(move |res: &mut Response| f(res).into_check_result()))
    }

    /// panic 也按失败处理
    pub(crate) fn call(&mut self, response: &mut Response) -> CheckResult {
        guarded(|| (self.0)(response))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// 终止回调，收到 `(error, response)`，只调用一次
pub struct Callback(Box<CallbackFn>);

impl Callback {
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce(Option<&HatestError>, Option<&Response>) -> R + Send + 'static,
        R: IntoCheckResult,
    {
        Self(Box::new(
            move |err: Option<&HatestError>, res: Option<&Response>| f(err, res).into_check_result(),
        ))
    }

    pub(crate) fn call(self, error: Option<&HatestError>, response: Option<&Response>) -> CheckResult {
        let f = self.0;
        guarded(move || f(error, response))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// 构造 predicate 规则参数
///
/// ```ignore
/// hatest::request(app).get("/").expect(check(|res| res.data["seen"] = true.into()))
/// ```
pub fn check<F, R>(f: F) -> Predicate
where
    F: FnMut(&mut Response) -> R + Send + 'static,
    R: IntoCheckResult,
{
    Predicate::new(f)
}

/// 构造终止回调
pub fn callback<F, R>(f: F) -> Callback
where
    F: FnOnce(Option<&HatestError>, Option<&Response>) -> R + Send + 'static,
    R: IntoCheckResult,
{
    Callback::new(f)
}

fn guarded<F>(f: F) -> CheckResult
where
    F: FnOnce() -> CheckResult,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
    }
}
