//! Parse the upload endpoint's JSON reply.

use serde_json::Value;

use super::TransferError;

/// Returns the string at `field`, either at the top level or under `data`
/// (`{"url": ...}` or `{"data": {"url": ...}}`).
pub(super) fn extract_result(body: &[u8], field: &str) -> Result<String, TransferError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TransferError::Response(format!("invalid JSON: {e}")))?;
    let found = value
        .get(field)
        .or_else(|| value.get("data").and_then(|d| d.get(field)))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    match found {
        Some(s) => Ok(s.to_string()),
        None => Err(TransferError::Response(format!("missing \"{field}\""))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_field() {
        let r = extract_result(br#"{"url":"https://cdn/x.png","size":3}"#, "url").unwrap();
        assert_eq!(r, "https://cdn/x.png");
    }

    #[test]
    fn nested_under_data() {
        let r = extract_result(br#"{"data":{"url":"/uploads/a.jpg"}}"#, "url").unwrap();
        assert_eq!(r, "/uploads/a.jpg");
    }

    #[test]
    fn missing_or_invalid() {
        assert!(matches!(
            extract_result(br#"{"ok":true}"#, "url"),
            Err(TransferError::Response(_))
        ));
        assert!(matches!(
            extract_result(br#"{"url":""}"#, "url"),
            Err(TransferError::Response(_))
        ));
        assert!(matches!(
            extract_result(b"<html>", "url"),
            Err(TransferError::Response(_))
        ));
    }
}
