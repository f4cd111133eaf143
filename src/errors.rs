//! Error types for stream reads, byte transforms and node population.

use std::fmt;

use thiserror::Error;

use crate::node::Endian;
use crate::stream::KStream;

/// Every failure the runtime can report. None of them is recovered internally:
/// they abort the read that raised them and propagate through every enclosing
/// node read up to the caller.
#[derive(Debug, Error)]
pub enum KsError {
    /// A byte or bit read needs more data than remains in the stream.
    #[error("unexpected end of stream at {pos}: requested {requested} bytes, {available} available")]
    UnexpectedEndOfStream {
        pos: u64,
        requested: u64,
        available: u64,
    },

    /// A seek targets a position beyond the end of the stream.
    #[error("seek to {pos} is out of bounds (stream size {size})")]
    OutOfBounds { pos: u64, size: u64 },

    /// Fixed contents did not match the expected bytes.
    #[error("fixed contents mismatch at {pos}: expected {expected:02x?}, got {actual:02x?}")]
    ValidationNotEqual {
        pos: u64,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// A decoded integer has no variant in the named enum.
    #[error("value {value} is not a valid {name}")]
    InvalidEnumValue { name: &'static str, value: i128 },

    /// Compressed input is malformed.
    #[error("decompression failed: {0}")]
    DecompressionError(String),

    /// Bytes are not valid text in the requested encoding.
    #[error("cannot decode bytes as {encoding}: {message}")]
    EncodingError { encoding: String, message: String },

    /// More than 64 bits were requested in a single bit read.
    #[error("cannot read {0} bits into a 64-bit integer")]
    TooManyBits(u32),

    /// An argument outside the domain of a helper (empty XOR key, bad radix...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A node was read without a fixed endianness and does not resolve one itself.
    #[error("{type_name} has no fixed endianness and does not resolve one")]
    EndianUndecided { type_name: &'static str },

    /// A node has no read routine for the resolved endianness.
    #[error("{type_name} cannot be read as {endian}")]
    EndianNotSupported {
        type_name: &'static str,
        endian: Endian,
    },

    /// An error from the underlying reader or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` type alias using the crate's `KsError` type.
pub type Result<T> = std::result::Result<T, KsError>;

/// Flat classification of a [`KsError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    UnexpectedEndOfStream,
    OutOfBounds,
    ValidationNotEqual,
    InvalidEnumValue,
    DecompressionError,
    EncodingError,
    TooManyBits,
    InvalidArgument,
    EndianUndecided,
    EndianNotSupported,
    Io,
}

impl KsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KsError::UnexpectedEndOfStream { .. } => ErrorKind::UnexpectedEndOfStream,
            KsError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            KsError::ValidationNotEqual { .. } => ErrorKind::ValidationNotEqual,
            KsError::InvalidEnumValue { .. } => ErrorKind::InvalidEnumValue,
            KsError::DecompressionError(_) => ErrorKind::DecompressionError,
            KsError::EncodingError { .. } => ErrorKind::EncodingError,
            KsError::TooManyBits(_) => ErrorKind::TooManyBits,
            KsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            KsError::EndianUndecided { .. } => ErrorKind::EndianUndecided,
            KsError::EndianNotSupported { .. } => ErrorKind::EndianNotSupported,
            KsError::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Diagnostic summary of a failed parse: what went wrong and where the stream
/// cursor was when it did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseFailure {
    pub kind: ErrorKind,
    pub pos: u64,
    pub message: String,
}

impl ParseFailure {
    /// Captures `err` together with the current position of `io`.
    pub fn new(err: &KsError, io: &KStream<'_>) -> Self {
        ParseFailure {
            kind: err.kind(),
            pos: io.pos(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parsing failed with {} at stream position {}: {}",
            self.kind, self.pos, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = KsError::OutOfBounds { pos: 5, size: 4 };
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);

        let err = KsError::TooManyBits(65);
        assert_eq!(err.kind(), ErrorKind::TooManyBits);
    }

    #[test]
    fn test_parse_failure_reports_position() {
        let io = KStream::from_bytes(&[0x01, 0x02][..]);
        let err = io.read_u4le().unwrap_err();
        let failure = ParseFailure::new(&err, &io);

        assert_eq!(failure.kind, ErrorKind::UnexpectedEndOfStream);
        assert_eq!(failure.pos, 0);
        assert!(
            failure
                .to_string()
                .starts_with("parsing failed with UnexpectedEndOfStream at stream position 0")
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parse_failure_serializes() {
        let failure = ParseFailure {
            kind: ErrorKind::OutOfBounds,
            pos: 9,
            message: "seek".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "OutOfBounds");
        assert_eq!(json["pos"], 9);
    }
}
