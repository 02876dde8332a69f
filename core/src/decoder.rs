//! Maps raw `HttpResponse` values to typed results or `ApiError`s.
//!
//! # Design
//! Only 200 and 201 count as success. An empty success body is a
//! `ProcessingError` like any other undecodable body; no default value is
//! substituted. List decoding is all-or-nothing.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ErrorKind};
use crate::http::HttpResponse;

/// Decode a single object from a success response.
pub fn decode_object<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    check_status(response)?;
    serde_json::from_slice(&response.body).map_err(|e| processing_error(&e))
}

/// Decode a JSON array into one `T` per element, preserving order.
pub fn decode_list<T: DeserializeOwned>(response: &HttpResponse) -> Result<Vec<T>, ApiError> {
    check_status(response)?;
    let json: Value = serde_json::from_slice(&response.body).map_err(|e| processing_error(&e))?;
    let Value::Array(items) = json else {
        tracing::warn!("expected a JSON array in list response");
        return Err(ApiError::new(ErrorKind::ProcessingError));
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| processing_error(&e)))
        .collect()
}

/// Error for a non-success response.
pub fn decode_error(response: &HttpResponse) -> ApiError {
    let kind = kind_for_status(response.status);
    tracing::debug!(status = response.status, %kind, "mapped error response");
    match server_text(&response.body) {
        Some(text) => ApiError::with_message(kind, text),
        None => ApiError::new(kind),
    }
}

pub fn is_success(status: u16) -> bool {
    matches!(status, 200 | 201)
}

pub fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::BadRequest,
        401 | 403 => ErrorKind::Unauthorized,
        402 => ErrorKind::BadCredentials,
        404 => ErrorKind::NotFound,
        500 => ErrorKind::InternalError,
        _ => ErrorKind::UnknownError,
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if is_success(response.status) {
        Ok(())
    } else {
        Err(decode_error(response))
    }
}

/// Body text when it is valid UTF-8 and not blank.
fn server_text(body: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(body).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn processing_error(err: &serde_json::Error) -> ApiError {
    tracing::warn!(error = %err, "response body did not decode");
    ApiError::new(ErrorKind::ProcessingError)
}
