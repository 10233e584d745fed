use anyhow::Context;
use pulsescope_config::MonitorConfig;
use pulsescope_events::TelemetryRecord;
use pulsescope_shm::{Reader, ShmError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Counters reported once per second.
#[derive(Default)]
struct PollStats {
    frames: u64,
    records: u64,
    transient: u64,
}

fn open_reader(cfg: &MonitorConfig) -> anyhow::Result<Reader> {
    // The producer may not have created the region yet.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match Reader::open(&cfg.shm_file_path) {
            Ok(reader) => return Ok(reader.with_retry_budget(cfg.read_retries)),
            Err(ShmError::Storage { .. } | ShmError::Schema(_)) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("opening region {}", cfg.shm_file_path));
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)),
        )
        .init();

    let mut reader = open_reader(&cfg)?;
    info!(path = %cfg.shm_file_path, retries = reader.retry_budget(), "monitoring region");

    let interval = Duration::from_millis(cfg.poll_interval_ms);
    let mut stats = PollStats::default();
    let mut last = Instant::now();

    loop {
        match reader.poll_image() {
            Ok(Some(frame)) => {
                stats.frames += 1;
                debug!(
                    seq = frame.sequence,
                    width = frame.width,
                    height = frame.height,
                    bytes = frame.data.len(),
                    "frame"
                );
            }
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                stats.transient += 1;
                debug!(error = %e, "image read retried next poll");
            }
            Err(e) => return Err(e.into()),
        }

        match reader.poll_telemetry() {
            Ok(Some(snap)) => {
                stats.records += 1;
                match TelemetryRecord::from_json_bytes(&snap.payload) {
                    Ok(rec) => debug!(
                        seq = snap.sequence,
                        ts = rec.timestamp,
                        x = rec.ekf.pos[0],
                        y = rec.ekf.pos[1],
                        z = rec.ekf.pos[2],
                        yaw = rec.ekf.yaw,
                        target = ?rec.target,
                        "telemetry"
                    ),
                    Err(e) => warn!(seq = snap.sequence, error = %e, "undecodable telemetry"),
                }
            }
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                stats.transient += 1;
                debug!(error = %e, "telemetry read retried next poll");
            }
            Err(e) => return Err(e.into()),
        }

        if last.elapsed() >= Duration::from_secs(1) {
            info!(
                frames = stats.frames,
                records = stats.records,
                transient = stats.transient,
                image_seq = reader.last_image_sequence(),
                telemetry_seq = reader.last_telemetry_sequence(),
                "poll rate"
            );
            stats = PollStats::default();
            last = Instant::now();
        }

        std::thread::sleep(interval);
    }
}
