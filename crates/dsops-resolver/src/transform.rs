use crate::error::TransformError;

/// Apply a `<op>:<arg>` transform string to a raw provider value (§4.C
/// "Transforms"). `None` (no transform configured) passes the value through
/// unchanged.
pub fn apply(transform: Option<&str>, raw: &str) -> Result<String, TransformError> {
    let Some(expr) = transform else {
        return Ok(raw.to_string());
    };

    let Some((op, arg)) = expr.split_once(':') else {
        return Err(TransformError::UnknownOp(expr.to_string()));
    };

    match op {
        "json_extract" => json_extract(raw, arg),
        other => Err(TransformError::UnknownOp(other.to_string())),
    }
}

/// `arg` is a JSON path starting with `.`, e.g. `.database.password`.
fn json_extract(raw: &str, arg: &str) -> Result<String, TransformError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| TransformError::InvalidJson(e.to_string()))?;

    let mut cursor = &value;
    for segment in arg.trim_start_matches('.').split('.').filter(|s| !s.is_empty()) {
        cursor = cursor.get(segment).ok_or_else(|| TransformError::PathNotFound(arg.to_string()))?;
    }

    Ok(match cursor {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_with_no_transform() {
        assert_eq!(apply(None, "hello").unwrap(), "hello");
    }

    #[test]
    fn extracts_nested_json_field() {
        let raw = r#"{"database": {"password": "s3cr3t"}}"#;
        assert_eq!(apply(Some("json_extract:.database.password"), raw).unwrap(), "s3cr3t");
    }

    #[test]
    fn unknown_op_is_an_error() {
        assert!(matches!(apply(Some("rot13:ignored"), "x"), Err(TransformError::UnknownOp(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(apply(Some("json_extract:.x"), "not json"), Err(TransformError::InvalidJson(_))));
    }

    #[test]
    fn missing_path_is_an_error() {
        let raw = r#"{"a": 1}"#;
        assert!(matches!(apply(Some("json_extract:.b"), raw), Err(TransformError::PathNotFound(_))));
    }
}
