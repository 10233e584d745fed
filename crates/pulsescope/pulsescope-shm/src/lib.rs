//! Lock-free latest-value transport over a file-backed shared region.
//!
//! One [`Publisher`] writes a rolling image frame and a rolling telemetry
//! payload; any number of [`Reader`]s poll them without ever blocking the
//! publisher or observing a torn record.

mod error;
mod layout;
mod publisher;
mod reader;
mod region;
mod slot;

pub use error::{Result, SchemaError, ShmError};
pub use layout::{Header, IMAGE_CAPACITY, MAGIC, REGION_SIZE, TELEMETRY_CAPACITY, VERSION};
pub use publisher::Publisher;
pub use reader::{DEFAULT_RETRY_BUDGET, ImageFrame, Reader, TelemetrySnapshot};
pub use region::{Region, RegionMut};
