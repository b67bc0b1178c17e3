//! Wire types for the Handy v1 API.
//!
//! Every endpoint answers with a JSON object. A truthy `error` field marks
//! a failed command; the whole object is then the error payload. Fields the
//! client does not model are ignored.

use crate::error::{Error, Result, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operating mode of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HandyMode {
    Off = 0,
    Automatic = 1,
    Position = 2,
    Calibration = 3,
    Sync = 4,
}

impl From<HandyMode> for u8 {
    fn from(mode: HandyMode) -> Self {
        mode as u8
    }
}

impl TryFrom<u8> for HandyMode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(HandyMode::Off),
            1 => Ok(HandyMode::Automatic),
            2 => Ok(HandyMode::Position),
            3 => Ok(HandyMode::Calibration),
            4 => Ok(HandyMode::Sync),
            other => Err(format!("unknown mode {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<HandyMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetSpeedResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SetStrokeResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Latest firmware published by the vendor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<HandyMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<HandyMode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncPrepareResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Whether the script was fetched by the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncPlayResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOffsetResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
}

/// JSON truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Fail with the whole payload if the response carries a truthy `error`.
pub fn check_response(value: Value) -> Result<Value> {
    match value.get("error") {
        Some(error) if is_truthy(error) => Err(Error::Remote(value)),
        _ => Ok(value),
    }
}

/// Check the error convention, then decode into a typed response.
pub fn decode_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    let value = check_response(value)?;
    serde_json::from_value(value).map_err(|e| Error::Transport(TransportError::Decode(e)))
}

/// Server clock reading of a `getServerTime` response.
///
/// The vendor has served this both as a number and as a numeric string.
pub fn server_time(value: &Value) -> std::result::Result<f64, TransportError> {
    let reading = match value.get("serverTime") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    reading
        .filter(|t| t.is_finite())
        .ok_or(TransportError::MissingField("serverTime"))
}
