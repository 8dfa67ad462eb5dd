//! Random-access byte sources.
//!
//! Every container format in this crate reads from a [`ByteSource`]: a
//! length-checked positional view over a memory-mapped file, a buffered file
//! (fallback when mapping is unavailable), or an owned in-memory buffer
//! (synthetic data in tests, decompressed payloads).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::RwLock;

use crate::util::{Error, Result};

/// Random-access source over a backing buffer.
#[derive(Debug)]
pub struct ByteSource {
    inner: SourceInner,
    size: u64,
}

#[derive(Debug)]
enum SourceInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(Arc<RwLock<File>>),
    /// Owned buffer
    Memory(Vec<u8>),
}

impl ByteSource {
    /// Open a file for reading with memory mapping.
    ///
    /// A missing file yields [`Error::FileNotFound`] so callers can treat the
    /// owning resource category as disabled instead of failing startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();

        let inner = if use_mmap && size > 0 {
            // Safety: the file is opened read-only; concurrent external
            // truncation is outside this crate's contract.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            SourceInner::Mmap(mmap)
        } else {
            SourceInner::File(Arc::new(RwLock::new(file)))
        };

        Ok(Self { inner, size })
    }

    /// Wrap an owned buffer.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            inner: SourceInner::Memory(data),
            size,
        }
    }

    /// Total length of the source in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn check(&self, pos: u64, len: usize) -> Result<()> {
        if pos.checked_add(len as u64).map_or(true, |end| end > self.size) {
            return Err(Error::Truncated(pos.saturating_add(len as u64)));
        }
        Ok(())
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        self.check(pos, buf.len())?;

        match &self.inner {
            SourceInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..pos as usize + buf.len()]);
                Ok(())
            }
            SourceInner::Memory(data) => {
                buf.copy_from_slice(&data[pos as usize..pos as usize + buf.len()]);
                Ok(())
            }
            SourceInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// Borrow a slice of the backing data (mmap and in-memory modes only).
    pub fn slice(&self, pos: u64, len: usize) -> Result<&[u8]> {
        self.check(pos, len)?;

        match &self.inner {
            SourceInner::Mmap(mmap) => Ok(&mmap[pos as usize..pos as usize + len]),
            SourceInner::Memory(data) => Ok(&data[pos as usize..pos as usize + len]),
            SourceInner::File(_) => Err(Error::decode("slice() requires a mapped source")),
        }
    }

    /// Read a u8 value at the given position.
    pub fn read_u8(&self, pos: u64) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(pos, &mut buf)?;
        Ok(buf[0])
    }

    /// Read a little-endian u16 value at the given position.
    pub fn read_u16(&self, pos: u64) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_into(pos, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a little-endian u32 value at the given position.
    pub fn read_u32(&self, pos: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_into(pos, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a little-endian u64 value at the given position.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a little-endian i16 value at the given position.
    pub fn read_i16(&self, pos: u64) -> Result<i16> {
        Ok(self.read_u16(pos)? as i16)
    }

    /// Read a little-endian i32 value at the given position.
    pub fn read_i32(&self, pos: u64) -> Result<i32> {
        Ok(self.read_u32(pos)? as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reads() {
        let src = ByteSource::from_vec(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(src.len(), 8);
        assert_eq!(src.read_u8(0).unwrap(), 0x01);
        assert_eq!(src.read_u16(0).unwrap(), 0x0201);
        assert_eq!(src.read_u32(2).unwrap(), 0x06050403);
        assert_eq!(src.read_u64(0).unwrap(), 0x0807060504030201);
    }

    #[test]
    fn truncated_read() {
        let src = ByteSource::from_vec(vec![1, 2, 3]);
        assert!(matches!(src.read_u32(0), Err(Error::Truncated(_))));
        assert!(matches!(src.read_u8(3), Err(Error::Truncated(_))));
        // Offsets near u64::MAX must not wrap into "valid".
        assert!(matches!(src.read_u32(u64::MAX - 1), Err(Error::Truncated(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ByteSource::open("/nonexistent/definitely/missing.mul").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn file_reads_match_memory() {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        tmp.flush().unwrap();

        let mapped = ByteSource::open(tmp.path()).unwrap();
        let buffered = ByteSource::open_opts(tmp.path(), false).unwrap();
        assert_eq!(mapped.read_u32(0).unwrap(), buffered.read_u32(0).unwrap());
        assert_eq!(mapped.slice(1, 2).unwrap(), &[0xBB, 0xCC]);
    }
}
