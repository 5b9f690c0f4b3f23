//! Request body validation shared by mutation handlers
//!
//! Bodies are extracted as `Result<Json<T>, JsonRejection>` so malformed JSON
//! and failed `validator` rules both surface as an [`ApiError`] the handler
//! can record in the audit trail before answering.

use axum::{
    body::Bytes,
    extract::rejection::{BytesRejection, JsonRejection},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Unwrap a JSON body and run its validation rules
pub fn validated_json<T: Validate>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(payload) = body?;
    payload.validate().map_err(ApiError::from)?;
    Ok(payload)
}

/// Parse a JSON body that may be left out entirely
///
/// An empty or whitespace-only body yields `T::default()`. Anything else must
/// be valid JSON for `T`; the content type is not required.
pub fn optional_json<T: DeserializeOwned + Default>(body: Result<Bytes, BytesRejection>) -> ApiResult<T> {
    let bytes = body?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let Json(payload) = Json::<T>::from_bytes(&bytes)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Rename {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_field_errors_reported() {
        let error = validated_json(Ok(Json(Rename { name: String::new() }))).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        match error {
            ApiError::Validation { field_errors: Some(fields), .. } => {
                assert_eq!(fields["name"], vec!["Name is required".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[derive(Debug, Default, Deserialize)]
    struct Scope {
        account_id: Option<i64>,
    }

    #[test]
    fn test_missing_body_uses_default() {
        let scope: Scope = optional_json(Ok(Bytes::new())).unwrap();
        assert_eq!(scope.account_id, None);

        let scope: Scope = optional_json(Ok(Bytes::from_static(b"{\"account_id\": 4}"))).unwrap();
        assert_eq!(scope.account_id, Some(4));

        let error = optional_json::<Scope>(Ok(Bytes::from_static(b"{oops"))).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_valid_payload_passes() {
        let payload = validated_json(Ok(Json(Rename { name: "Support".to_string() }))).unwrap();
        assert_eq!(payload.name, "Support");
    }
}
