use crate::error::Result;
use crate::layout::{IMAGE_SLOT, TELEMETRY_SLOT};
use crate::region::Region;
use std::path::Path;

/// Attempts per read before reporting `TransientReadFailure`.
pub const DEFAULT_RETRY_BUDGET: u32 = 8;

/// A consistent copy of the image slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Encoded frame bytes, format opaque to the transport.
    pub data: Vec<u8>,
}

/// A consistent copy of the telemetry slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// A passive, non-blocking reader of a region.
///
/// Any number of readers may poll the same store independently. Each keeps
/// its own record of the last sequence it returned from `poll_*`.
pub struct Reader {
    region: Region,
    retry_budget: u32,
    last_image: u64,
    last_telemetry: u64,
}

impl Reader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_region(Region::open_for_read(path)?))
    }

    pub fn from_region(region: Region) -> Self {
        Self {
            region,
            retry_budget: DEFAULT_RETRY_BUDGET,
            last_image: 0,
            last_telemetry: 0,
        }
    }

    /// Sets the attempts per read; values below 1 are raised to 1.
    pub fn with_retry_budget(mut self, attempts: u32) -> Self {
        self.retry_budget = attempts.max(1);
        self
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Latest committed frame, or `None` if nothing was published yet.
    pub fn read_image(&self) -> Result<Option<ImageFrame>> {
        let snap = self
            .region
            .slot_reader(IMAGE_SLOT)
            .read(self.retry_budget)?;
        Ok(snap.map(|s| ImageFrame {
            sequence: s.sequence,
            width: s.meta[0],
            height: s.meta[1],
            data: s.payload,
        }))
    }

    /// Latest committed telemetry payload, or `None` if nothing was published yet.
    pub fn read_telemetry(&self) -> Result<Option<TelemetrySnapshot>> {
        let snap = self
            .region
            .slot_reader(TELEMETRY_SLOT)
            .read(self.retry_budget)?;
        Ok(snap.map(|s| TelemetrySnapshot {
            sequence: s.sequence,
            payload: s.payload,
        }))
    }

    /// Like `read_image`, but `None` when the frame was already returned by a
    /// previous poll. An unchanged sequence skips the payload copy entirely.
    pub fn poll_image(&mut self) -> Result<Option<ImageFrame>> {
        if self.region.slot_reader(IMAGE_SLOT).sequence() == self.last_image {
            return Ok(None);
        }
        match self.read_image()? {
            Some(frame) if frame.sequence != self.last_image => {
                self.last_image = frame.sequence;
                Ok(Some(frame))
            }
            _ => Ok(None),
        }
    }

    /// Telemetry counterpart of `poll_image`.
    pub fn poll_telemetry(&mut self) -> Result<Option<TelemetrySnapshot>> {
        if self.region.slot_reader(TELEMETRY_SLOT).sequence() == self.last_telemetry {
            return Ok(None);
        }
        match self.read_telemetry()? {
            Some(snap) if snap.sequence != self.last_telemetry => {
                self.last_telemetry = snap.sequence;
                Ok(Some(snap))
            }
            _ => Ok(None),
        }
    }

    /// Sequence of the last frame returned by `poll_image` (0 if none).
    pub fn last_image_sequence(&self) -> u64 {
        self.last_image
    }

    pub fn last_telemetry_sequence(&self) -> u64 {
        self.last_telemetry
    }
}
