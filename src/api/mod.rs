//! Typed wrappers for the portal endpoints. Each one goes through
//! [`AuthClient::request`](crate::client::AuthClient::request) so it gets
//! token attachment and refresh handling for free.

pub mod access_logs;
pub mod auth;
pub mod consents;
pub mod facilities;

pub use access_logs::AccessLogsApi;
pub use auth::{AuthApi, NewAccount};
pub use consents::ConsentsApi;
pub use facilities::FacilitiesApi;

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::envelope::{failure_message, Envelope};

/// Read a response body as JSON, turning non-2xx statuses into [`ApiError::Status`].
pub(crate) async fn read_json(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) if status.is_success() => return Err(ApiError::Decode(e.to_string())),
            Err(_) => Value::String(text),
        }
    };

    if !status.is_success() {
        let message = failure_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

/// Decode a successful `{success, data}` envelope into its payload.
pub(crate) async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let body = read_json(response).await?;
    unwrap_envelope(body, status)
}

pub(crate) fn unwrap_envelope<T: DeserializeOwned>(body: Value, status: u16) -> Result<T, ApiError> {
    let envelope: Envelope<T> =
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if !envelope.success {
        return Err(ApiError::Status {
            status,
            message: envelope
                .message
                .or(envelope.error)
                .unwrap_or_else(|| "request was not successful".to_string()),
        });
    }
    envelope
        .data
        .ok_or_else(|| ApiError::Decode("response is missing 'data'".to_string()))
}

/// Decode a payload that may arrive either bare or wrapped in an envelope.
///
/// A 2xx body without `data` yields the empty payload unless it explicitly
/// reports `"success": false`.
pub(crate) fn bare_or_enveloped<T: DeserializeOwned + Default>(
    mut body: Value,
    status: u16,
) -> Result<T, ApiError> {
    if body.is_array() {
        return serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()));
    }
    match body.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => {
            serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
        }
        _ if body.get("success") == Some(&Value::Bool(false)) => unwrap_envelope(body, status),
        _ => Ok(T::default()),
    }
}
