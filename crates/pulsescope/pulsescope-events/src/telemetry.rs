#![forbid(unsafe_code)]

// Point-in-time state estimate carried in the telemetry slot.
// The transport treats it as opaque bytes; this module owns the encoding.

use serde::{Deserialize, Serialize};

/// Classification label of the tracked target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetClass {
    Hero,
    Engineer,
    Infantry,
    Sentry,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Filter output: position in metres, yaw in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct EkfState {
    pub pos: [f64; 3],
    pub yaw: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub ekf: EkfState,
    #[serde(default)]
    pub target: TargetClass,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode telemetry")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode telemetry")]
    Decode(#[source] serde_json::Error),
}

impl TelemetryRecord {
    /// UTF-8 JSON bytes, ready to publish.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Encode)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Decode)
    }
}
