//! HTTP API handlers for epe-re

pub mod alignments;
pub mod annotations;
pub mod export;
pub mod health;
pub mod logs;
pub mod witnesses;

pub use alignments::{get_alignment, import_alignment_groups, list_alignment_groups};
pub use annotations::{create_annotation, delete_annotation, list_annotations, update_annotation};
pub use export::{export_apparatus, export_witness_json, export_witness_tei};
pub use health::health_routes;
pub use logs::{export_logs, get_logs};
pub use witnesses::{
    create_witness, delete_witness, get_witness, list_witnesses, update_witness_label,
};

use crate::error::ApiResult;
use axum::body::Bytes;
use epe_common::Error;
use serde_json::Value;

/// Parse a request body as a JSON object.
///
/// Malformed payloads surface as `InvalidInput`, not as the `Json`
/// extractor's plain-text rejection.
pub(crate) fn parse_json_object(body: &Bytes) -> ApiResult<Value> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(Error::InvalidInput("request body must be a JSON object".to_string()).into());
    }
    Ok(value)
}

/// File name safe to quote in a `Content-Disposition` header
pub(crate) fn download_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Required string field of a JSON object body
pub(crate) fn required_str<'a>(body: &'a Value, field: &str) -> ApiResult<&'a str> {
    match body.get(field) {
        None | Some(Value::Null) => {
            Err(Error::InvalidInput(format!("missing field '{}'", field)).into())
        }
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(Error::InvalidInput(format!("field '{}' must be a string", field)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    #[test]
    fn test_parse_json_object_rejects_arrays_and_garbage() {
        assert!(parse_json_object(&Bytes::from_static(b"{\"a\": 1}")).is_ok());
        assert!(matches!(
            parse_json_object(&Bytes::from_static(b"[1, 2]")),
            Err(ApiError::Core(Error::InvalidInput(_)))
        ));
        assert!(matches!(
            parse_json_object(&Bytes::from_static(b"{oops")),
            Err(ApiError::Core(Error::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_download_name() {
        assert_eq!(download_name("w1"), "w1");
        assert_eq!(download_name("a\"b/c d"), "a_b_c_d");
    }

    #[test]
    fn test_required_str() {
        let body = json!({"label": "A", "n": 3});
        assert_eq!(required_str(&body, "label").unwrap(), "A");
        assert!(required_str(&body, "n").is_err());
        assert!(required_str(&body, "missing").is_err());
    }
}
