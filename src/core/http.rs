use crate::utils::error::{HarnessError, Result};
use reqwest::Response;
use serde_json::Value;

/// Fails with [`HarnessError::StatusError`] unless the status is 2xx.
pub async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(status_error(response).await)
}

/// Fails unless the status is one of `accepted`.
pub async fn expect_status(response: Response, accepted: &[u16]) -> Result<Response> {
    if accepted.contains(&response.status().as_u16()) {
        return Ok(response);
    }
    Err(status_error(response).await)
}

async fn status_error(response: Response) -> HarnessError {
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("HTTP {} from {}: {}", status, url, body);
    HarnessError::StatusError { status, url, body }
}

/// Decodes a response body that is usually JSON. Some endpoints answer with
/// an empty body or a bare `OK`, which become `null` and a JSON string.
pub async fn decode_lenient(response: Response) -> Result<Value> {
    let text = response.text().await?;
    Ok(parse_lenient(&text))
}

pub fn parse_lenient(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient(""), Value::Null);
        assert_eq!(parse_lenient("  \n"), Value::Null);
        assert_eq!(parse_lenient("OK"), json!("OK"));
        assert_eq!(parse_lenient("\"OK\""), json!("OK"));
        assert_eq!(parse_lenient(r#"{"id":"p1"}"#), json!({"id": "p1"}));
    }
}
