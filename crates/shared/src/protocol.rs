use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{DistrictMap, SaveState, SyncJobStatus};

pub const DISTRICTS_PATH: &str = "/api/districts";
pub const SYNC_START_PATH: &str = "/api/sync";
pub const SYNC_STATUS_PATH: &str = "/api/sync-status";
pub const SAVE_PATH: &str = "/api/save";

/// A decoded endpoint response: either the payload or the server's `error` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome<T> {
    Ok(T),
    Failed(String),
}

impl<T> ApiOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiOutcome<U> {
        match self {
            Self::Ok(value) => ApiOutcome::Ok(f(value)),
            Self::Failed(message) => ApiOutcome::Failed(message),
        }
    }

    pub fn into_result(self) -> Result<T, crate::error::PortalError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Failed(message) => Err(crate::error::PortalError::application(message)),
        }
    }
}

/// Returns the message of a truthy `error` field on an object body.
pub fn error_field(body: &Value) -> Option<String> {
    body.get("error").and_then(error_text)
}

/// `error` field of a raw body, if the body is a JSON object carrying one.
pub fn body_error(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .as_ref()
        .and_then(error_field)
}

/// Text of an `error` value, or `None` when the value is falsy.
pub fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Decodes an endpoint body once, checking for the `error` field before the payload shape.
pub fn decode_outcome<T: DeserializeOwned>(body: &[u8]) -> Result<ApiOutcome<T>, serde_json::Error> {
    let value: Value = serde_json::from_slice(body)?;
    if let Some(message) = error_field(&value) {
        return Ok(ApiOutcome::Failed(message));
    }
    serde_json::from_value(value).map(ApiOutcome::Ok)
}

/// Decodes a `/api/sync-status` snapshot. `running` is consulted before `error`,
/// so an `error` field never short-circuits a running job.
pub fn decode_status(body: &[u8]) -> Result<ApiOutcome<SyncJobStatus>, serde_json::Error> {
    serde_json::from_slice(body).map(ApiOutcome::Ok)
}

/// `/api/sync` acknowledges with any shape; only `error` is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStarted;

impl<'de> Deserialize<'de> for SyncStarted {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(SyncStarted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub saved: bool,
}

impl From<SaveResponse> for SaveState {
    fn from(value: SaveResponse) -> Self {
        SaveState(value.saved)
    }
}
