//! File-backed region handles.
//!
//! `RegionMut` is the publisher's view and `Region` a passive reader's view.
//! Both are plain mappings over the backing store; nothing is copied at open.

use crate::error::{Result, SchemaError, ShmError};
use crate::layout::{HEADER_SIZE, Header, REGION_SIZE, SlotLayout, check_store_len};
use crate::slot::{SlotReader, SlotWriter};
use pulsescope_mmap::{MmapFile, MmapFileMut};
use std::io;
use std::path::Path;
use std::ptr;
use tracing::{debug, info};

fn storage_error(path: &Path) -> impl FnOnce(io::Error) -> ShmError + '_ {
    move |source| ShmError::Storage {
        path: path.to_path_buf(),
        source,
    }
}

/// # Safety
/// `base` must point to at least `HEADER_SIZE` readable bytes.
unsafe fn read_header(base: *const u8) -> Header {
    let bytes = unsafe { ptr::read(base as *const [u8; HEADER_SIZE]) };
    Header::decode(&bytes)
}

/// Read-write mapping owned by the single publisher.
pub struct RegionMut {
    mm: MmapFileMut,
}

impl RegionMut {
    /// Creates or resizes the store at `path` to `REGION_SIZE` and maps it.
    ///
    /// A blank header is initialised. An existing valid header, and every
    /// published slot behind it, is left as found.
    pub fn open_for_write<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut mm = MmapFileMut::open_or_create_rw(path, REGION_SIZE as u64)
            .map_err(storage_error(path))?;

        // SAFETY: the mapping is REGION_SIZE bytes
        let header = unsafe { read_header(mm.as_ptr()) };
        if header.is_blank() {
            let bytes = Header::CURRENT.encode();
            // SAFETY: as above; we are the only writer
            unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), mm.as_mut_ptr(), HEADER_SIZE) };
            info!(path = %path.display(), size = REGION_SIZE, "initialized region");
        } else {
            header.validate()?;
            debug!(path = %path.display(), version = header.version, "reattached to region");
        }

        Ok(Self { mm })
    }

    /// Only the schema's own slot layouts may be passed in.
    pub(crate) fn slot_writer(&mut self, layout: SlotLayout) -> SlotWriter<'_> {
        debug_assert!(layout.end() <= self.mm.len());
        // SAFETY: mapping covers every schema slot; &mut self makes us the only writer
        unsafe { SlotWriter::new(self.mm.as_mut_ptr(), layout) }
    }

    pub(crate) fn slot_reader(&self, layout: SlotLayout) -> SlotReader<'_> {
        debug_assert!(layout.end() <= self.mm.len());
        // SAFETY: mapping covers every schema slot and lives as long as &self
        unsafe { SlotReader::new(self.mm.as_ptr(), layout) }
    }
}

/// Read-only mapping used by polling readers.
pub struct Region {
    mm: MmapFile,
}

impl Region {
    /// Maps an existing store read-only and validates its header.
    ///
    /// Stores longer than `REGION_SIZE` are accepted; the tail is reserved.
    pub fn open_for_read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mm = match MmapFile::open_ro(path) {
            Ok(mm) => mm,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(SchemaError::Undersized {
                    len: 0,
                    required: REGION_SIZE as u64,
                }
                .into());
            }
            Err(source) => return Err(storage_error(path)(source)),
        };

        check_store_len(mm.len() as u64)?;
        // SAFETY: length checked above
        let header = unsafe { read_header(mm.as_ptr()) };
        header.validate()?;

        debug!(path = %path.display(), len = mm.len(), "opened region for read");
        Ok(Self { mm })
    }

    /// Length of the mapped store, reserved tail included.
    pub fn store_len(&self) -> usize {
        self.mm.len()
    }

    pub fn header(&self) -> Header {
        // SAFETY: length checked at open
        unsafe { read_header(self.mm.as_ptr()) }
    }

    pub(crate) fn slot_reader(&self, layout: SlotLayout) -> SlotReader<'_> {
        debug_assert!(layout.end() <= self.mm.len());
        // SAFETY: length checked at open; mapping lives as long as &self
        unsafe { SlotReader::new(self.mm.as_ptr(), layout) }
    }
}
