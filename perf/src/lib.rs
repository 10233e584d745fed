use pulsescope_events::{EkfState, TargetClass, TelemetryRecord};

pub fn temp_shm_path(label: &str) -> String {
    let pid = std::process::id();
    format!("/tmp/pulsescope_bench_{label}_{pid}")
}

pub fn make_test_record() -> TelemetryRecord {
    TelemetryRecord {
        timestamp: 1_700_000_000.123,
        ekf: EkfState {
            pos: [1.25, -3.5, 0.75],
            yaw: 182.5,
        },
        target: TargetClass::Infantry,
    }
}

/// Frame-sized payload with a recognisable pattern.
pub fn make_test_frame(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
