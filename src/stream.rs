//! Position-aware binary stream with byte-aligned and bit-level reads.
//!
//! A [`KStream`] keeps its cursor and bit buffer in `Cell`s, so every read
//! takes `&self` and one stream can be shared by all the nodes of a parse
//! tree. The same interior mutability makes it `!Sync`: a stream belongs to
//! the thread that parses with it, and nodes sharing it must read in field
//! order.

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, trace};

use crate::bits::BitBuffer;
use crate::errors::{KsError, Result};
use crate::source::{ByteSource, MemorySource, ReaderSource};

/// Bytes fetched per step while scanning for a terminator.
const TERM_SCAN_CHUNK: usize = 4096;

pub struct KStream<'a> {
    source: Box<dyn ByteSource + 'a>,
    pos: Cell<u64>,
    bits: Cell<BitBuffer>,
}

impl fmt::Debug for KStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KStream")
            .field("pos", &self.pos.get())
            .field("bits_left", &self.bits.get().bits_left())
            .finish_non_exhaustive()
    }
}

impl<'a> KStream<'a> {
    /// Wraps any [`ByteSource`].
    pub fn from_source(source: Box<dyn ByteSource + 'a>) -> Self {
        Self {
            source,
            pos: Cell::new(0),
            bits: Cell::new(BitBuffer::default()),
        }
    }

    /// Stream over an in-memory buffer, owned (`Vec<u8>`) or borrowed (`&[u8]`).
    pub fn from_bytes(data: impl Into<Cow<'a, [u8]>>) -> Self {
        let source = MemorySource::new(data);
        debug!("Opening memory stream");
        Self::from_source(Box::new(source))
    }

    /// Stream over a seekable reader. Passing `&mut file` keeps the handle
    /// owned by the caller; the stream only borrows it.
    pub fn from_reader<R: Read + Seek + 'a>(reader: R) -> Self {
        debug!("Opening reader-backed stream");
        Self::from_source(Box::new(ReaderSource::new(reader)))
    }
}

impl KStream<'static> {
    /// Opens the file at `path` and streams over it. The file is closed when
    /// the stream is dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening file stream: {}", path.display());
        let file = File::open(path)?;
        Ok(Self::from_source(Box::new(ReaderSource::new(file))))
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

impl KStream<'_> {
    /// Current byte offset from the start of the stream.
    pub fn pos(&self) -> u64 {
        self.pos.get()
    }

    /// Total size of the stream in bytes.
    pub fn size(&self) -> Result<u64> {
        self.source.size()
    }

    /// True exactly when the cursor sits at the end. No failed read is needed
    /// to observe end of stream.
    pub fn is_eof(&self) -> Result<bool> {
        Ok(self.pos.get() == self.size()?)
    }

    /// Moves the cursor to `pos`. Leftover bits are kept.
    pub fn seek(&self, pos: u64) -> Result<()> {
        let size = self.size()?;
        if pos > size {
            return Err(KsError::OutOfBounds { pos, size });
        }

        self.pos.set(pos);
        Ok(())
    }

    fn remaining(&self) -> Result<u64> {
        Ok(self.size()?.saturating_sub(self.pos.get()))
    }

    /// Reads exactly `buf.len()` bytes at the cursor and advances past them.
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        let pos = self.pos.get();
        let available = self.remaining()?;
        let requested = buf.len() as u64;
        if requested > available {
            return Err(KsError::UnexpectedEndOfStream {
                pos,
                requested,
                available,
            });
        }

        self.source.read_at(pos, buf)?;
        self.pos.set(pos + requested);
        Ok(())
    }

    fn read_array<const N: usize>(&self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// Integers
// ---------------------------------------------------------------------------

impl KStream<'_> {
    pub fn read_u1(&self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_s1(&self) -> Result<i8> {
        Ok(self.read_u1()? as i8)
    }

    pub fn read_u2le(&self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_array::<2>()?))
    }

    pub fn read_u4le(&self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.read_array::<4>()?))
    }

    pub fn read_u8le(&self) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.read_array::<8>()?))
    }

    pub fn read_s2le(&self) -> Result<i16> {
        Ok(LittleEndian::read_i16(&self.read_array::<2>()?))
    }

    pub fn read_s4le(&self) -> Result<i32> {
        Ok(LittleEndian::read_i32(&self.read_array::<4>()?))
    }

    pub fn read_s8le(&self) -> Result<i64> {
        Ok(LittleEndian::read_i64(&self.read_array::<8>()?))
    }

    pub fn read_u2be(&self) -> Result<u16> {
        Ok(BigEndian::read_u16(&self.read_array::<2>()?))
    }

    pub fn read_u4be(&self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_array::<4>()?))
    }

    pub fn read_u8be(&self) -> Result<u64> {
        Ok(BigEndian::read_u64(&self.read_array::<8>()?))
    }

    pub fn read_s2be(&self) -> Result<i16> {
        Ok(BigEndian::read_i16(&self.read_array::<2>()?))
    }

    pub fn read_s4be(&self) -> Result<i32> {
        Ok(BigEndian::read_i32(&self.read_array::<4>()?))
    }

    pub fn read_s8be(&self) -> Result<i64> {
        Ok(BigEndian::read_i64(&self.read_array::<8>()?))
    }
}

// ---------------------------------------------------------------------------
// Floating point
// ---------------------------------------------------------------------------

impl KStream<'_> {
    pub fn read_f4le(&self) -> Result<f32> {
        Ok(LittleEndian::read_f32(&self.read_array::<4>()?))
    }

    pub fn read_f8le(&self) -> Result<f64> {
        Ok(LittleEndian::read_f64(&self.read_array::<8>()?))
    }

    pub fn read_f4be(&self) -> Result<f32> {
        Ok(BigEndian::read_f32(&self.read_array::<4>()?))
    }

    pub fn read_f8be(&self) -> Result<f64> {
        Ok(BigEndian::read_f64(&self.read_array::<8>()?))
    }
}

// ---------------------------------------------------------------------------
// Unaligned bit values
// ---------------------------------------------------------------------------

impl KStream<'_> {
    /// Drops leftover bits so byte-aligned reads can resume. Reads no bytes.
    pub fn align_to_byte(&self) {
        let mut bits = self.bits.get();
        bits.clear();
        self.bits.set(bits);
    }

    /// Reads `n` bits (at most 64) as an unsigned integer, MSB-first.
    ///
    /// Leftover bits from the previous bit read are consumed first; whole bytes
    /// are pulled from the stream as needed and whatever is not returned is
    /// kept for the next call. Byte-aligned reads do not see or clear the
    /// leftover; call [`align_to_byte`](Self::align_to_byte) first.
    pub fn read_bits_int(&self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(KsError::TooManyBits(n));
        }

        let mut bits = self.bits.get();
        let needed = bits.bytes_needed(n);
        let mut fresh = [0u8; 8];
        if needed > 0 {
            self.fill(&mut fresh[..needed])?;
            trace!("Pulled {} bytes for a {}-bit read", needed, n);
        }

        let value = bits.take(n, &fresh[..needed]);
        self.bits.set(bits);

        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Byte arrays
// ---------------------------------------------------------------------------

impl KStream<'_> {
    /// Reads exactly `len` bytes.
    pub fn read_bytes(&self, len: u64) -> Result<Vec<u8>> {
        let available = self.remaining()?;
        if len > available {
            return Err(KsError::UnexpectedEndOfStream {
                pos: self.pos.get(),
                requested: len,
                available,
            });
        }

        let mut buf = vec![0u8; len as usize];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Reads everything from the cursor to the end. Empty at end of stream.
    pub fn read_bytes_full(&self) -> Result<Vec<u8>> {
        let len = self.remaining()?;
        self.read_bytes(len)
    }

    /// Reads up to the first `term` byte.
    ///
    /// * `include` keeps the terminator in the result.
    /// * `consume` leaves the cursor after the terminator instead of on it.
    /// * `eos_error` fails when no terminator is found; otherwise the rest of
    ///   the stream is returned and the cursor ends at the end.
    pub fn read_bytes_term(
        &self,
        term: u8,
        include: bool,
        consume: bool,
        eos_error: bool,
    ) -> Result<Vec<u8>> {
        let size = self.size()?;
        let mut cursor = self.pos.get();
        let mut out = Vec::new();
        let mut chunk = vec![0u8; TERM_SCAN_CHUNK];

        while cursor < size {
            let len = (size - cursor).min(TERM_SCAN_CHUNK as u64) as usize;
            let window = &mut chunk[..len];
            self.source.read_at(cursor, window)?;

            if let Some(i) = window.iter().position(|&b| b == term) {
                out.extend_from_slice(&window[..i]);
                if include {
                    out.push(term);
                }

                let term_pos = cursor + i as u64;
                self.pos.set(if consume { term_pos + 1 } else { term_pos });
                trace!("Terminator {:#04x} found at {}", term, term_pos);

                return Ok(out);
            }

            out.extend_from_slice(window);
            cursor += len as u64;
        }

        self.pos.set(size);
        if eos_error {
            return Err(KsError::UnexpectedEndOfStream {
                pos: size,
                requested: 1,
                available: 0,
            });
        }

        Ok(out)
    }

    /// Reads `expected.len()` bytes and checks them against `expected`.
    pub fn ensure_fixed_contents(&self, expected: &[u8]) -> Result<Vec<u8>> {
        let pos = self.pos.get();
        let actual = self.read_bytes(expected.len() as u64)?;
        if actual != expected {
            return Err(KsError::ValidationNotEqual {
                pos,
                expected: expected.to_vec(),
                actual,
            });
        }

        Ok(actual)
    }

    /// Reads `len` bytes into a new, independent stream positioned at 0.
    /// Used for nested structures with a declared size.
    pub fn substream(&self, len: u64) -> Result<KStream<'static>> {
        let bytes = self.read_bytes(len)?;
        trace!("Substream of {} bytes", bytes.len());
        Ok(KStream::from_bytes(bytes))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl KStream<'_> {
    /// Fails unless `data` holds at least `min_len` bytes.
    pub fn ensure_len(data: &[u8], min_len: usize) -> Result<()> {
        if data.len() < min_len {
            return Err(KsError::UnexpectedEndOfStream {
                pos: 0,
                requested: min_len as u64,
                available: data.len() as u64,
            });
        }

        Ok(())
    }

    /// Euclidean modulo: the result is in `0..b` for any `a`. `b` must be positive.
    pub fn modulo(a: i64, b: i64) -> Result<i64> {
        if b <= 0 {
            return Err(KsError::InvalidArgument(format!(
                "modulo divisor must be positive, got {}",
                b
            )));
        }

        Ok(a.rem_euclid(b))
    }
}
