pub mod telemetry;
pub use telemetry::{CodecError, EkfState, TargetClass, TelemetryRecord};
