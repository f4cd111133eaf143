//! Random-access byte sources a [`crate::stream::KStream`] can read from.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom};

use log::trace;

use crate::errors::{KsError, Result};

/// A finite, randomly seekable, byte-addressable source.
pub trait ByteSource {
    /// Total size in bytes. May be determined lazily on first call.
    fn size(&self) -> Result<u64>;

    /// Fills `buf` with the bytes starting at `pos`.
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()>;
}

/// In-memory buffer, owned or borrowed.
#[derive(Debug, Clone)]
pub struct MemorySource<'a> {
    data: Cow<'a, [u8]>,
}

impl<'a> MemorySource<'a> {
    pub fn new(data: impl Into<Cow<'a, [u8]>>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemorySource<'_> {
    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let len = self.data.len() as u64;
        let end = pos.checked_add(buf.len() as u64);

        match end {
            Some(end) if end <= len => {
                buf.copy_from_slice(&self.data[pos as usize..end as usize]);
                Ok(())
            }
            _ => Err(KsError::UnexpectedEndOfStream {
                pos,
                requested: buf.len() as u64,
                available: len.saturating_sub(pos),
            }),
        }
    }
}

/// Any `Read + Seek` handle: a `File`, a `&mut File` borrowed from the caller,
/// a `Cursor`...
///
/// The size is queried with a seek to the end the first time it is needed and
/// cached afterwards.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: RefCell<R>,
    size: Cell<Option<u64>>,
    cursor: Cell<Option<u64>>,
}

impl<R: Read + Seek> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: RefCell::new(inner),
            size: Cell::new(None),
            cursor: Cell::new(None),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn size(&self) -> Result<u64> {
        if let Some(size) = self.size.get() {
            return Ok(size);
        }

        let size = self.inner.borrow_mut().seek(SeekFrom::End(0))?;
        trace!("Reader source size resolved to {} bytes", size);
        self.size.set(Some(size));
        self.cursor.set(Some(size));

        Ok(size)
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if self.cursor.get() != Some(pos) {
            inner.seek(SeekFrom::Start(pos))?;
        }
        // Unknown after a failed read.
        self.cursor.set(None);

        inner.read_exact(buf).map_err(|e| {
            if e.kind() == IoErrorKind::UnexpectedEof {
                KsError::UnexpectedEndOfStream {
                    pos,
                    requested: buf.len() as u64,
                    available: self.size.get().map_or(0, |size| size.saturating_sub(pos)),
                }
            } else {
                KsError::Io(e)
            }
        })?;

        self.cursor.set(Some(pos + buf.len() as u64));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_memory_read_at() {
        let source = MemorySource::new(&[1u8, 2, 3, 4][..]);
        let mut buf = [0u8; 2];
        source.read_at(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
        assert_eq!(source.size().unwrap(), 4);
    }

    #[test]
    fn test_memory_read_past_end() {
        let source = MemorySource::new(vec![1u8, 2]);
        let mut buf = [0u8; 3];
        let err = source.read_at(0, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            KsError::UnexpectedEndOfStream {
                pos: 0,
                requested: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_reader_size_is_lazy_and_cached() {
        let source = ReaderSource::new(Cursor::new(vec![9u8; 10]));
        assert_eq!(source.size.get(), None);
        assert_eq!(source.size().unwrap(), 10);
        assert_eq!(source.size.get(), Some(10));
    }

    #[test]
    fn test_reader_read_at_seeks() {
        let source = ReaderSource::new(Cursor::new(vec![0u8, 1, 2, 3, 4]));
        let mut buf = [0u8; 2];
        source.read_at(3, &mut buf).unwrap();
        assert_eq!(buf, [3, 4]);

        source.read_at(0, &mut buf).unwrap();
        assert_eq!(buf, [0, 1]);

        // sequential read, no seek needed
        source.read_at(2, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
    }

    #[test]
    fn test_reader_read_past_end() {
        let source = ReaderSource::new(Cursor::new(vec![0u8, 1]));
        let mut buf = [0u8; 4];
        let err = source.read_at(0, &mut buf).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::UnexpectedEndOfStream);
    }
}
