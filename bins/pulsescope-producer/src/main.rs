use anyhow::Context;
use pulsescope_config::ProducerConfig;
use pulsescope_events::{EkfState, TargetClass, TelemetryRecord};
use pulsescope_shm::Publisher;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Two-colour placeholder frame: SOI marker, a tag byte, EOI marker.
const PLACEHOLDER_WIDTH: u32 = 100;
const PLACEHOLDER_HEIGHT: u32 = 100;

fn placeholder_frame(seq: u64) -> Vec<u8> {
    let tag = if (seq / 30) % 2 == 0 { b'R' } else { b'B' };
    vec![0xFF, 0xD8, tag, 0xFF, 0xD9]
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn mock_record(seq: u64) -> TelemetryRecord {
    let t = seq as f64 * 0.05;
    TelemetryRecord {
        timestamp: now_secs(),
        ekf: EkfState {
            pos: [5.0 * t.sin(), 5.0 * t.cos(), (0.5 * t).sin()],
            yaw: (seq as f64 * 3.0) % 360.0,
        },
        target: if seq % 2 == 0 {
            TargetClass::Hero
        } else {
            TargetClass::Infantry
        },
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => ProducerConfig::load(path)?,
        None => ProducerConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)),
        )
        .init();

    let mut frame = match &cfg.mock_frame_path {
        Some(path) => Some(std::fs::read(path).with_context(|| format!("reading {path}"))?),
        None => None,
    };

    let mut publisher = Publisher::open(&cfg.shm_file_path)
        .with_context(|| format!("opening region {}", cfg.shm_file_path))?;

    let period = Duration::from_secs_f64(1.0 / f64::from(cfg.fps.max(1)));
    info!(path = %cfg.shm_file_path, fps = cfg.fps, "publishing frames and telemetry");

    let mut last = Instant::now();
    let mut count: u64 = 0;

    loop {
        let seq = publisher.image_sequence() + 1;

        let published = match &frame {
            Some(bytes) => publisher
                .publish_image(bytes, cfg.mock_frame_width, cfg.mock_frame_height)
                .is_ok(),
            None => false,
        };
        if !published {
            if frame.take().is_some() {
                // An oversized mock frame will never fit.
                warn!("mock frame rejected, switching to placeholder");
            }
            publisher.publish_image(
                &placeholder_frame(seq),
                PLACEHOLDER_WIDTH,
                PLACEHOLDER_HEIGHT,
            )?;
        }

        let payload = mock_record(seq).to_json_bytes()?;
        publisher.publish_telemetry(&payload)?;
        count += 1;

        if last.elapsed() >= Duration::from_secs(1) {
            info!(
                rate = count,
                image_seq = publisher.image_sequence(),
                telemetry_seq = publisher.telemetry_sequence(),
                "publish rate"
            );
            count = 0;
            last = Instant::now();
        }

        std::thread::sleep(period);
    }
}
