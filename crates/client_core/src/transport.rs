//! Request helpers shared by the sensor and prediction clients.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::ApiError;
use tracing::warn;

use crate::error::WorkflowError;

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, WorkflowError> {
    let builder = Client::builder().timeout(timeout);
    // Mock servers listen on loopback; a proxy from the environment would
    // swallow those requests.
    #[cfg(test)]
    let builder = builder.no_proxy();
    Ok(builder.build()?)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Turns a non-2xx response into `ServiceError`, keeping the `error` string
/// from the body when the service sent one.
pub(crate) async fn check_status(response: Response) -> Result<Response, WorkflowError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.bytes().await {
        Ok(body) => serde_json::from_slice::<ApiError>(&body)
            .ok()
            .map(|body| body.error),
        Err(err) => {
            warn!(status = status.as_u16(), error = %err, "http: failed to read error body");
            None
        }
    };

    Err(WorkflowError::ServiceError {
        status: status.as_u16(),
        message,
    })
}

/// Decodes a success body that must be a JSON object. Serde would otherwise
/// fill struct fields by position from an array.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, WorkflowError> {
    let body = response.bytes().await?;
    decode_object(&body, what)
}

fn decode_object<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T, WorkflowError> {
    let malformed =
        |e: serde_json::Error| WorkflowError::MalformedResponse(format!("{what}: {e}"));
    match serde_json::from_slice::<Value>(body).map_err(malformed)? {
        object @ Value::Object(_) => serde_json::from_value(object).map_err(malformed),
        other => Err(WorkflowError::MalformedResponse(format!(
            "{what}: expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
