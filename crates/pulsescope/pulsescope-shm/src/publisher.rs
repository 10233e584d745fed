use crate::error::Result;
use crate::layout::{IMAGE_SLOT, TELEMETRY_SLOT};
use crate::region::RegionMut;
use crate::slot::WRITE_IN_PROGRESS;
use std::path::Path;
use tracing::warn;

/// The single writer of a region.
///
/// Publications are a fixed sequence of stores into the mapping and never
/// wait on readers. Only one `Publisher` may exist per backing store.
pub struct Publisher {
    region: RegionMut,
}

impl Publisher {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_region(RegionMut::open_for_write(path)?))
    }

    pub fn from_region(region: RegionMut) -> Self {
        Self { region }
    }

    /// Publishes an encoded frame and returns its sequence number.
    ///
    /// On `PayloadTooLarge` the previous frame stays visible.
    pub fn publish_image(&mut self, frame: &[u8], width: u32, height: u32) -> Result<u64> {
        self.region
            .slot_writer(IMAGE_SLOT)
            .publish(frame, &[width, height])
            .inspect_err(|e| warn!(error = %e, "image publication rejected"))
    }

    /// Publishes an encoded telemetry record and returns its sequence number.
    pub fn publish_telemetry(&mut self, payload: &[u8]) -> Result<u64> {
        self.region
            .slot_writer(TELEMETRY_SLOT)
            .publish(payload, &[])
            .inspect_err(|e| warn!(error = %e, "telemetry publication rejected"))
    }

    /// Number of committed image publications.
    pub fn image_sequence(&self) -> u64 {
        self.region.slot_reader(IMAGE_SLOT).sequence() & !WRITE_IN_PROGRESS
    }

    /// Number of committed telemetry publications.
    pub fn telemetry_sequence(&self) -> u64 {
        self.region.slot_reader(TELEMETRY_SLOT).sequence() & !WRITE_IN_PROGRESS
    }
}
