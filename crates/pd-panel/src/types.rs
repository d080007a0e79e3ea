use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One structured request against the panel management API.
#[derive(Debug, Clone, Serialize)]
pub struct PanelRequest {
    /// Operation name, e.g. `certificate-install`.
    pub operation: String,
    /// Operation parameters as a JSON object.
    pub params: Value,
}

impl PanelRequest {
    pub fn new(operation: impl Into<String>, params: Value) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }
}

/// Explicit success/error marker carried in every panel response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Response envelope of the panel management API.
///
/// The panel reports success through the `status` field; an HTTP 200 with
/// `status: error` is still a failed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct PanelResponse {
    pub status: ResponseStatus,
    /// Human-readable diagnostic, set by the panel on errors.
    #[serde(default)]
    pub message: Option<String>,
    /// Operation-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl PanelResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            message: None,
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: Value::Null,
        }
    }

    /// Unwrap the payload, converting an error status into [`PanelError::Api`]
    /// with the panel's message attached.
    pub fn into_result(self) -> PanelResult<Value> {
        match self.status {
            ResponseStatus::Ok => Ok(self.data),
            ResponseStatus::Error => Err(PanelError::Api(
                self.message
                    .unwrap_or_else(|| "panel reported an unspecified error".to_string()),
            )),
        }
    }
}

/// A named slot in the panel's certificate pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolEntry {
    pub name: String,
}

/// Captured result of a panel administration tool run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum PanelError {
    /// The panel answered, but with an explicit error status.
    #[error("panel error: {0}")]
    Api(String),

    /// The panel could not be reached, or its answer could not be decoded.
    #[error("transport error: {0}")]
    Transport(String),
}

pub type PanelResult<T> = Result<T, PanelError>;
