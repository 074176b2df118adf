//! Normalization of failed responses
//!
//! A response with a non-ok status outside the retryable set ends the call.
//! Its body is read as text and condensed into a description; the status
//! text becomes the error message.

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use crate::error::{FailedResponse, FailureCause, DEFAULT_ERROR_DESCRIPTION};
use crate::http::response::header_map;
use crate::http::transport::TransportError;

/// Human-readable phrase of a status code, e.g. "Not Found"
pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// Snapshot the metadata of a response before its body is consumed
pub fn snapshot(response: &reqwest::Response) -> FailedResponse {
    FailedResponse {
        status: response.status().as_u16(),
        status_text: status_text(response.status()),
        url: response.url().to_string(),
        headers: header_map(response.headers()),
    }
}

/// Build the description of an error body.
///
/// JSON bodies contribute their `error` field, or `message` when `error` is
/// absent, pretty-printed. Anything else is used verbatim. A JSON body that
/// does not parse is returned as an error.
pub fn describe_error_body(content_type: Option<&str>, body: &str) -> Result<String, serde_json::Error> {
    let is_json = content_type
        .map(|value| value.contains("application/json"))
        .unwrap_or(false);

    if !is_json {
        return Ok(body.to_string());
    }

    let output: Value = serde_json::from_str(body)?;
    let field = ["error", "message"]
        .iter()
        .filter_map(|key| output.get(key))
        .find(|value| is_truthy(value));

    match field {
        Some(value) => serde_json::to_string_pretty(value),
        None => Ok(DEFAULT_ERROR_DESCRIPTION.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Consume a failed response and turn it into an error
pub async fn normalize_failure(response: reqwest::Response) -> crate::Error {
    let failed = snapshot(&response);
    let content_type = failed.headers.get(CONTENT_TYPE.as_str()).cloned();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return TransportError::from(e).into(),
    };

    match describe_error_body(content_type.as_deref(), &body) {
        Ok(description) => crate::Error::RequestFailed {
            message: failed.status_text.clone(),
            cause: Box::new(FailureCause {
                description,
                response: failed,
            }),
        },
        Err(source) => crate::Error::MalformedErrorBody {
            source,
            response: Box::new(failed),
        },
    }
}
