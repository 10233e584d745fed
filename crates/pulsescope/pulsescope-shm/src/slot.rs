//! Sequenced slot: a fixed-capacity payload buffer guarded by a sequence word.
//!
//! # Protocol
//!
//! **Publisher:**
//! 1. Reject the payload if it exceeds capacity (slot untouched)
//! 2. Mark the committed sequence with `WRITE_IN_PROGRESS`
//! 3. Write `len`, metadata words and payload bytes
//! 4. Store `committed + 1` with Release ordering as the final write
//!
//! **Reader:**
//! 1. Load seq (Acquire); if the in-progress bit is set, count a failed attempt
//! 2. Copy `len`, metadata and payload
//! 3. Load seq again; if it changed, count a failed attempt
//! 4. Give up with `TransientReadFailure` once the attempt budget is spent
//!
//! Unlike a spinning seqlock the reader never waits on the writer: every
//! attempt is a bounded amount of work and the budget is small.
//!
//! # Sequence Word
//!
//! - `0`: never published
//! - `N`: N publications committed, payload belongs to the Nth
//! - bit 63 set: a publication is being written on top of the committed value

use crate::error::{Result, ShmError};
use crate::layout::SlotLayout;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering, fence};

/// Tearing indicator carried in the sequence word during a publication.
pub const WRITE_IN_PROGRESS: u64 = 1 << 63;

/// Largest `meta_words` of any slot in the schema.
pub const MAX_META_WORDS: usize = 2;

/// A torn-free copy of one publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSnapshot {
    pub sequence: u64,
    /// Only the first `meta_words` entries are meaningful.
    pub meta: [u32; MAX_META_WORDS],
    pub payload: Vec<u8>,
}

#[inline(always)]
unsafe fn load_u32(src: *const u8) -> u32 {
    u32::from_le_bytes(unsafe { ptr::read_unaligned(src as *const [u8; 4]) })
}

#[inline(always)]
unsafe fn store_u32(dst: *mut u8, value: u32) {
    unsafe { ptr::write_unaligned(dst as *mut [u8; 4], value.to_le_bytes()) }
}

/// Exclusive write access to one slot of a mapped region.
pub struct SlotWriter<'a> {
    base: *mut u8,
    layout: SlotLayout,
    _region: PhantomData<&'a mut [u8]>,
}

impl<'a> SlotWriter<'a> {
    /// # Safety
    /// `base` must point to a writable region of at least `layout.end()` bytes,
    /// 8-byte aligned, with no other writer for this slot while `'a` lives.
    pub unsafe fn new(base: *mut u8, layout: SlotLayout) -> Self {
        Self {
            base,
            layout,
            _region: PhantomData,
        }
    }

    #[inline(always)]
    fn seq(&self) -> &AtomicU64 {
        // SAFETY: seq_offset is 8-aligned (asserted in layout) and in bounds
        unsafe { &*(self.base.add(self.layout.seq_offset()) as *const AtomicU64) }
    }

    /// Sequence of the last completed publication.
    ///
    /// Clears a stale in-progress bit left behind by a writer that died
    /// mid-publication.
    pub fn committed(&self) -> u64 {
        self.seq().load(Ordering::Relaxed) & !WRITE_IN_PROGRESS
    }

    /// Publishes `payload` with the slot's metadata words and returns the new
    /// sequence number.
    ///
    /// # Panics
    /// Panics if `meta.len()` differs from the slot's `meta_words`.
    pub fn publish(&mut self, payload: &[u8], meta: &[u32]) -> Result<u64> {
        if payload.len() > self.layout.capacity {
            return Err(ShmError::PayloadTooLarge {
                slot: self.layout.name,
                len: payload.len(),
                capacity: self.layout.capacity,
            });
        }
        assert_eq!(
            meta.len(),
            self.layout.meta_words,
            "metadata word count for {} slot",
            self.layout.name
        );

        let committed = self.committed();
        let next = committed + 1;
        let seq = self.seq();

        seq.store(committed | WRITE_IN_PROGRESS, Ordering::Relaxed);
        // Keeps the marker ahead of every payload store below.
        fence(Ordering::Release);

        // SAFETY: all offsets lie inside layout.end(); payload length checked above
        unsafe {
            store_u32(
                self.base.add(self.layout.len_offset()),
                payload.len() as u32,
            );
            for (i, word) in meta.iter().enumerate() {
                store_u32(self.base.add(self.layout.meta_offset(i)), *word);
            }
            ptr::copy_nonoverlapping(
                payload.as_ptr(),
                self.base.add(self.layout.payload_offset()),
                payload.len(),
            );
        }

        seq.store(next, Ordering::Release);
        Ok(next)
    }
}

/// Shared read access to one slot of a mapped region.
pub struct SlotReader<'a> {
    base: *const u8,
    layout: SlotLayout,
    _region: PhantomData<&'a [u8]>,
}

impl<'a> SlotReader<'a> {
    /// # Safety
    /// `base` must point to at least `layout.end()` readable bytes, 8-byte
    /// aligned, for the whole of `'a`.
    pub unsafe fn new(base: *const u8, layout: SlotLayout) -> Self {
        Self {
            base,
            layout,
            _region: PhantomData,
        }
    }

    #[inline(always)]
    fn seq(&self) -> &AtomicU64 {
        // SAFETY: see SlotWriter::seq
        unsafe { &*(self.base.add(self.layout.seq_offset()) as *const AtomicU64) }
    }

    /// Current sequence word, in-progress bit included.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.seq().load(Ordering::Acquire)
    }

    /// Copies out the latest committed publication.
    ///
    /// Returns `Ok(None)` if the slot was never published and
    /// `TransientReadFailure` if `attempts` tries all overlapped a publication.
    pub fn read(&self, attempts: u32) -> Result<Option<RawSnapshot>> {
        let seq = self.seq();
        let mut payload = Vec::new();

        for _ in 0..attempts {
            let s1 = seq.load(Ordering::Acquire);
            if s1 & WRITE_IN_PROGRESS != 0 {
                std::hint::spin_loop();
                continue;
            }
            if s1 == 0 {
                return Ok(None);
            }

            // SAFETY: offsets are in bounds; the copy may race with a writer,
            // which the second sequence load detects
            let len = unsafe { load_u32(self.base.add(self.layout.len_offset())) } as usize;
            if len > self.layout.capacity {
                std::hint::spin_loop();
                continue;
            }

            let mut meta = [0u32; MAX_META_WORDS];
            for (i, word) in meta.iter_mut().take(self.layout.meta_words).enumerate() {
                *word = unsafe { load_u32(self.base.add(self.layout.meta_offset(i))) };
            }

            payload.clear();
            payload.resize(len, 0);
            unsafe {
                ptr::copy_nonoverlapping(
                    self.base.add(self.layout.payload_offset()),
                    payload.as_mut_ptr(),
                    len,
                );
            }

            // Keeps the copies above ahead of the second sequence load.
            fence(Ordering::Acquire);
            let s2 = seq.load(Ordering::Relaxed);
            if s1 == s2 {
                return Ok(Some(RawSnapshot {
                    sequence: s1,
                    meta,
                    payload,
                }));
            }

            std::hint::spin_loop();
        }

        Err(ShmError::TransientReadFailure {
            slot: self.layout.name,
            attempts,
        })
    }
}
