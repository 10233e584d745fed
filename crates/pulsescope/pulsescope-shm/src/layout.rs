//! Byte-level schema of the shared region.
//!
//! ```text
//! offset        size
//! ┌─────────────┬──────────────────────────────────────────────────────┐
//! │ 0           │ magic u32 │ version u32                              │
//! ├─────────────┼──────────────────────────────────────────────────────┤
//! │ 8           │ image slot                                           │
//! │             │ seq u64 │ len u32 │ width u32 │ height u32 │         │
//! │             │ payload [2 MiB] │ trailer [4]                        │
//! ├─────────────┼──────────────────────────────────────────────────────┤
//! │ 2_097_184   │ telemetry slot                                       │
//! │             │ seq u64 │ len u32 │ payload [64 KiB] │ trailer [4]   │
//! └─────────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! All offsets are compile-time constants of the schema version; nothing about
//! the layout is stored in the region besides magic and version. Fields are
//! little-endian.

use crate::error::SchemaError;

#[cfg(not(target_endian = "little"))]
compile_error!("the region stores its sequence words as native little-endian atomics");

/// `0x50534350` ("PSCP" as a hex literal; the little-endian bytes on disk read "PCSP").
pub const MAGIC: u32 = 0x5053_4350;

/// Increment on any change to offsets or field widths.
pub const VERSION: u32 = 1;

pub const HEADER_SIZE: usize = 8;

pub const IMAGE_CAPACITY: usize = 2 * 1024 * 1024;
pub const TELEMETRY_CAPACITY: usize = 64 * 1024;

const SEQ_SIZE: usize = 8;
const LEN_SIZE: usize = 4;
const META_WORD_SIZE: usize = 4;
const TRAILER_SIZE: usize = 4;

/// Placement of one sequenced slot inside the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub name: &'static str,
    /// Byte offset of the slot's sequence word from the region start.
    pub offset: usize,
    /// Number of `u32` metadata words between `len` and the payload.
    pub meta_words: usize,
    pub capacity: usize,
}

impl SlotLayout {
    pub const fn seq_offset(&self) -> usize {
        self.offset
    }

    pub const fn len_offset(&self) -> usize {
        self.offset + SEQ_SIZE
    }

    pub const fn meta_offset(&self, word: usize) -> usize {
        self.len_offset() + LEN_SIZE + word * META_WORD_SIZE
    }

    pub const fn payload_offset(&self) -> usize {
        self.meta_offset(self.meta_words)
    }

    /// Total bytes reserved for the slot, trailer included.
    pub const fn section_size(&self) -> usize {
        SEQ_SIZE + LEN_SIZE + self.meta_words * META_WORD_SIZE + self.capacity + TRAILER_SIZE
    }

    pub const fn end(&self) -> usize {
        self.offset + self.section_size()
    }
}

/// Image slot: `width` and `height` as metadata words 0 and 1.
pub const IMAGE_SLOT: SlotLayout = SlotLayout {
    name: "image",
    offset: HEADER_SIZE,
    meta_words: 2,
    capacity: IMAGE_CAPACITY,
};

pub const TELEMETRY_SLOT: SlotLayout = SlotLayout {
    name: "telemetry",
    offset: IMAGE_SLOT.end(),
    meta_words: 0,
    capacity: TELEMETRY_CAPACITY,
};

/// Exact size of a freshly created backing store.
pub const REGION_SIZE: usize = TELEMETRY_SLOT.end();

const _: () = assert!(IMAGE_SLOT.seq_offset() % 8 == 0);
const _: () = assert!(TELEMETRY_SLOT.seq_offset() % 8 == 0);

/// Decoded region header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
}

impl Header {
    pub const CURRENT: Header = Header {
        magic: MAGIC,
        version: VERSION,
    };

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let [m0, m1, m2, m3, v0, v1, v2, v3] = *bytes;
        Self {
            magic: u32::from_le_bytes([m0, m1, m2, m3]),
            version: u32::from_le_bytes([v0, v1, v2, v3]),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..].copy_from_slice(&self.version.to_le_bytes());
        out
    }

    /// A header nobody has written yet.
    pub fn is_blank(&self) -> bool {
        self.magic == 0 && self.version == 0
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.magic != MAGIC {
            return Err(SchemaError::BadMagic {
                expected: MAGIC,
                found: self.magic,
            });
        }
        if self.version != VERSION {
            return Err(SchemaError::VersionMismatch {
                expected: VERSION,
                found: self.version,
            });
        }
        Ok(())
    }
}

/// Rejects stores too small to hold every slot.
pub fn check_store_len(len: u64) -> Result<(), SchemaError> {
    let required = REGION_SIZE as u64;
    if len < required {
        return Err(SchemaError::Undersized { len, required });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_sizes_match_wire_format() {
        assert_eq!(IMAGE_SLOT.section_size(), 8 + 4 + 4 + 4 + 2_097_152 + 4);
        assert_eq!(TELEMETRY_SLOT.section_size(), 8 + 4 + 65_536 + 4);
    }

    #[test]
    fn offsets_follow_header_and_previous_section() {
        assert_eq!(IMAGE_SLOT.seq_offset(), 8);
        assert_eq!(IMAGE_SLOT.len_offset(), 16);
        assert_eq!(IMAGE_SLOT.meta_offset(0), 20);
        assert_eq!(IMAGE_SLOT.meta_offset(1), 24);
        assert_eq!(IMAGE_SLOT.payload_offset(), 28);

        assert_eq!(TELEMETRY_SLOT.seq_offset(), 2_097_184);
        assert_eq!(TELEMETRY_SLOT.payload_offset(), 2_097_184 + 12);
        assert_eq!(REGION_SIZE, 2_162_736);
    }

    #[test]
    fn header_bytes_are_little_endian() {
        let bytes = Header::CURRENT.encode();
        assert_eq!(&bytes[..4], b"PCSP");
        assert_eq!(&bytes[4..], &[1, 0, 0, 0]);
        assert_eq!(Header::decode(&bytes), Header::CURRENT);
    }

    #[test]
    fn validate_rejects_foreign_headers() {
        assert!(Header::CURRENT.validate().is_ok());

        let bad_magic = Header {
            magic: 0xDEAD_BEEF,
            version: VERSION,
        };
        assert_eq!(
            bad_magic.validate(),
            Err(SchemaError::BadMagic {
                expected: MAGIC,
                found: 0xDEAD_BEEF
            })
        );

        let newer = Header {
            magic: MAGIC,
            version: VERSION + 1,
        };
        assert!(matches!(
            newer.validate(),
            Err(SchemaError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn blank_header_is_not_valid() {
        let blank = Header::decode(&[0; HEADER_SIZE]);
        assert!(blank.is_blank());
        assert!(blank.validate().is_err());
    }

    #[test]
    fn store_len_check() {
        assert!(check_store_len(REGION_SIZE as u64).is_ok());
        assert!(check_store_len(5 * 1024 * 1024).is_ok());
        assert_eq!(
            check_store_len(4),
            Err(SchemaError::Undersized {
                len: 4,
                required: REGION_SIZE as u64
            })
        );
    }
}
