use std::io;
use std::path::PathBuf;

/// The header or size of a mapped store does not describe this schema.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("bad magic {found:#010x}, expected {expected:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("schema version {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("store is {len} bytes, region needs {required}")]
    Undersized { len: u64, required: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error("region schema mismatch")]
    Schema(#[from] SchemaError),

    #[error("cannot map backing store '{}'", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{slot} payload of {len} bytes exceeds capacity {capacity}")]
    PayloadTooLarge {
        slot: &'static str,
        len: usize,
        capacity: usize,
    },

    #[error("{slot} slot gave no consistent snapshot in {attempts} attempts")]
    TransientReadFailure { slot: &'static str, attempts: u32 },
}

impl ShmError {
    /// `true` for outcomes the caller should simply retry on its next poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, ShmError::TransientReadFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, ShmError>;
