use serde_json::Value;

use crate::assertion::schema::SchemaMatcher;
use crate::assertion::types::{AssertionError, BodyExpectation, HeaderExpectation, Rule, inspect};
use crate::http::Response;
use crate::http::types::reason_phrase;

/// 按入队顺序执行规则，遇到第一个失败立即停止
///
/// predicate 对响应的修改对后续规则可见。
pub fn evaluate(
    rules: &mut [Rule],
    mut response: Option<&mut Response>,
    matcher: &dyn SchemaMatcher,
) -> Result<(), AssertionError> {
    for (index, rule) in rules.iter_mut().enumerate() {
        tracing::debug!("checking rule #{}: {}", index + 1, rule);
        if let Err(err) = rule.check(response.as_deref_mut(), matcher) {
            tracing::warn!("rule #{} ({}) failed: {}", index + 1, rule, err);
            return Err(err);
        }
    }
    Ok(())
}

impl Rule {
    /// 执行单条规则
    pub fn check(
        &mut self,
        response: Option<&mut Response>,
        matcher: &dyn SchemaMatcher,
    ) -> Result<(), AssertionError> {
        match self {
            Rule::Status(expected) => check_status(*expected, response.as_deref()),
            Rule::Header { name, expected } => check_header(name, expected, response.as_deref()),
            Rule::Body(expected) => check_body(expected, response.as_deref(), matcher),
            Rule::Predicate(predicate) => {
                let Some(response) = response else {
                    return Err(AssertionError::new("expected a response to check, got none"));
                };
                predicate
                    .call(response)
                    .map_err(|e| AssertionError::new(format!("{:#}", e)))
            }
            Rule::Unsupported(reason) => Err(AssertionError::new(format!(
                "unsupported expectation: {}",
                reason
            ))),
        }
    }
}

fn check_status(expected: u16, response: Option<&Response>) -> Result<(), AssertionError> {
    let expected_text = format!("{} \"{}\"", expected, reason_phrase(expected));
    let Some(response) = response else {
        return Err(AssertionError::mismatch(
            format!("expected {}, got no response", expected_text),
            expected.to_string(),
            "none",
        ));
    };

    let actual = response.status.code();
    if actual == expected {
        return Ok(());
    }

    Err(AssertionError::mismatch(
        format!(
            "expected {}, got {} \"{}\"",
            expected_text,
            actual,
            reason_phrase(actual)
        ),
        expected.to_string(),
        actual.to_string(),
    ))
}

fn check_header(
    name: &str,
    expected: &HeaderExpectation,
    response: Option<&Response>,
) -> Result<(), AssertionError> {
    let actual = match response {
        Some(response) => response.header(name),
        None => {
            return Err(AssertionError::new(format!(
                "expected {} header field, got no response",
                name
            )));
        }
    };

    let Some(actual) = actual else {
        return Err(AssertionError::new(format!("expected {} header field", name)));
    };

    if expected.matches(actual) {
        return Ok(());
    }

    Err(AssertionError::mismatch(
        format!("expected {} matching {}, got {}", name, expected, actual),
        expected.to_string(),
        actual,
    ))
}

fn check_body(
    expected: &BodyExpectation,
    response: Option<&Response>,
    matcher: &dyn SchemaMatcher,
) -> Result<(), AssertionError> {
    let Some(response) = response else {
        return Err(AssertionError::new("expected response body, got no response"));
    };
    let data = &response.data;

    match expected {
        BodyExpectation::Schema(schema) => {
            let validation = matcher.validate(schema, data);
            if validation.valid {
                return Ok(());
            }
            // matcher 的错误原样上抛
            Err(match validation.error {
                Some(violation) => AssertionError::mismatch(
                    violation.to_string(),
                    violation.expected,
                    violation.actual,
                ),
                None => AssertionError::new(format!("expected body to match schema {}", schema)),
            })
        }
        BodyExpectation::Pattern(re) => {
            let text = match data {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if re.is_match(&text) {
                return Ok(());
            }
            Err(AssertionError::diff(
                format!("expected body {} to match /{}/", inspect(data), re.as_str()),
                format!("/{}/", re.as_str()),
                inspect(data),
            ))
        }
        BodyExpectation::Literal(literal) => {
            if literal == data {
                return Ok(());
            }
            let (a, b) = (inspect(literal), inspect(data));
            Err(AssertionError::diff(
                format!("expected {} response body, got {}", a, b),
                a,
                b,
            ))
        }
    }
}
