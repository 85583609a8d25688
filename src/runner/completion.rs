use serde_json::Value;

use crate::assertion::{BodyExpectation, Callback, Rule, Schema, schema_rule};
use crate::http::Response;
use crate::{HatestError, Result};

/// `end_with` 的参数
#[derive(Debug)]
pub enum Terminal {
    /// 回调模式，收到 `(error, response)`
    Callback(Callback),
    /// 再追加一条 body 规则，然后按 future 模式结束
    Expect(Rule),
}

impl From<Callback> for Terminal {
    fn from(callback: Callback) -> Self {
        Terminal::Callback(callback)
    }
}

impl From<Schema> for Terminal {
    fn from(schema: Schema) -> Self {
        Terminal::Expect(Rule::Body(BodyExpectation::Schema(schema)))
    }
}

impl From<Value> for Terminal {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(_) | Value::Array(_) => Terminal::Expect(schema_rule(&value)),
            other => Terminal::Expect(Rule::Unsupported(format!(
                "end_with() takes a callback or a schema, got {}",
                other
            ))),
        }
    }
}

/// 结束一次分发，保证只产生一个结果
///
/// 回调按登记顺序各调用一次；回调失败（返回 Err 或 panic）时，
/// 它的错误替换原来的错误。
pub fn settle(
    mut error: Option<HatestError>,
    response: Option<Response>,
    callbacks: Vec<Callback>,
) -> Result<Response> {
    for callback in callbacks {
        if let Err(e) = callback.call(error.as_ref(), response.as_ref()) {
            tracing::warn!("completion callback failed: {:#}", e);
            error = Some(HatestError::Callback(format!("{:#}", e)));
        }
    }

    match (error, response) {
        (Some(err), _) => Err(err),
        (None, Some(response)) => Ok(response),
        (None, None) => Err(HatestError::Other("request settled without a response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{AssertionError, callback};
    use crate::error::TransportError;
    use crate::http::response::tests::create_test_response;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_future_mode_success() {
        let response = settle(None, Some(create_test_response(200, "{}")), Vec::new()).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_future_mode_failure() {
        let err = settle(
            Some(AssertionError::new("expected 'hey'").into()),
            Some(create_test_response(200, "{}")),
            Vec::new(),
        )
        .unwrap_err();
        assert!(err.is_assertion());
    }

    #[test]
    fn test_callback_sees_error_and_response() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let cb = callback(move |err, res| {
            *sink.lock().unwrap() = Some((
                err.map(|e| e.to_string()),
                res.map(|r| r.status.code()),
            ));
        });

        let result = settle(
            Some(TransportError::SocketHangUp.into()),
            None,
            vec![cb],
        );

        assert!(result.unwrap_err().is_transport());
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Some("socket hang up".to_string()), None))
        );
    }

    #[test]
    fn test_callback_error_replaces_error() {
        let cb = callback(|err, _res| -> () {
            assert!(err.is_none());
            panic!("callback blew up");
        });
        let err = settle(None, Some(create_test_response(200, "{}")), vec![cb]).unwrap_err();
        assert!(matches!(err, HatestError::Callback(_)));
        assert_eq!(err.to_string(), "callback blew up");
    }

    #[test]
    fn test_callbacks_run_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let callbacks = (1..=3)
            .map(|n| {
                let order = order.clone();
                callback(move |_err, _res| order.lock().unwrap().push(n))
            })
            .collect();

        settle(None, Some(create_test_response(200, "{}")), callbacks).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_terminal_from_values() {
        assert!(matches!(
            Terminal::from(json!({ "id": "Number" })),
            Terminal::Expect(Rule::Body(BodyExpectation::Schema(_)))
        ));
        assert!(matches!(
            Terminal::from(json!("nope")),
            Terminal::Expect(Rule::Unsupported(_))
        ));
        assert!(matches!(
            Terminal::from(callback(|_e, _r| {})),
            Terminal::Callback(_)
        ));
    }
}
