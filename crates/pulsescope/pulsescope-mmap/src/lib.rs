use memmap2::{Mmap, MmapMut};
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

pub struct MmapFileMut {
    _file: File,
    mmap: MmapMut,
}

pub struct MmapFile {
    _file: File,
    mmap: Mmap,
}

impl MmapFileMut {
    /// Open `path` read-write, creating it if needed, and size it to exactly
    /// `size_bytes`. Bytes already in the file are kept; growth is zero-filled.
    pub fn open_or_create_rw<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        if file.metadata()?.len() != size_bytes {
            file.set_len(size_bytes)?;
        }

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

impl MmapFile {
    /// Open an existing file and map it read-only.
    ///
    /// Empty files are rejected with `InvalidData` instead of being mapped.
    pub fn open_ro<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "empty file"));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pulsescope_mmap_{tag}_{}", std::process::id()))
    }

    #[test]
    fn resize_keeps_existing_prefix() {
        let path = temp_path("resize");
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(&[7u8; 16]).unwrap();
        }

        let mm = MmapFileMut::open_or_create_rw(&path, 64).unwrap();
        assert_eq!(mm.len(), 64);
        let bytes = unsafe { std::slice::from_raw_parts(mm.as_ptr(), mm.len()) };
        assert!(bytes[..16].iter().all(|&b| b == 7));
        assert!(bytes[16..].iter().all(|&b| b == 0));

        drop(mm);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn read_only_map_sees_writes() {
        let path = temp_path("ro");
        let mut rw = MmapFileMut::open_or_create_rw(&path, 8).unwrap();
        unsafe { rw.as_mut_ptr().write(42) };

        let ro = MmapFile::open_ro(&path).unwrap();
        assert_eq!(ro.len(), 8);
        assert_eq!(unsafe { ro.as_ptr().read() }, 42);

        drop(rw);
        drop(ro);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_file_is_rejected() {
        let path = temp_path("empty");
        File::create(&path).unwrap();
        let err = MmapFile::open_ro(&path).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let _ = std::fs::remove_file(&path);
    }
}
