use thiserror::Error;

/// Common errors that can occur while talking to an upload endpoint
#[derive(Error, Debug)]
pub enum CommonRequestError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A header name or value cannot be sent over HTTP
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Extract a human readable message from an error response body.
///
/// Upload endpoints answer with `{"message": "..."}`; the nested
/// `{"error": {"message": "..."}}` shape is accepted as well.
#[must_use]
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let json = serde_json::from_slice::<serde_json::Value>(body).ok()?;

    if let Some(msg) = json.get("message").and_then(serde_json::Value::as_str) {
        if !msg.is_empty() {
            return Some(msg.to_string());
        }
    }

    json.get("error")
        .and_then(|error| error.get("message"))
        .and_then(serde_json::Value::as_str)
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Generic message for a failed status when the server gave none.
#[must_use]
pub fn status_message(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("error: {} {}", status.as_u16(), reason),
        None => format!("error: {}", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn message_from_flat_body() {
        let body = br#"{"message": "Invalid token"}"#;
        assert_eq!(extract_error_message(body), Some("Invalid token".to_string()));
    }

    #[test]
    fn message_from_nested_body() {
        let body = br#"{"error": {"code": 403, "message": "Forbidden field"}}"#;
        assert_eq!(
            extract_error_message(body),
            Some("Forbidden field".to_string())
        );
    }

    #[test]
    fn no_message_in_html_or_empty() {
        assert_eq!(extract_error_message(b"<html>oops</html>"), None);
        assert_eq!(extract_error_message(b""), None);
        assert_eq!(extract_error_message(br#"{"message": ""}"#), None);
    }

    #[test]
    fn status_message_uses_reason() {
        assert_eq!(
            status_message(StatusCode::INTERNAL_SERVER_ERROR),
            "error: 500 Internal Server Error"
        );
        let custom = StatusCode::from_u16(599).unwrap();
        assert_eq!(status_message(custom), "error: 599");
    }
}
