//! Byte transforms applied to a field after it has been read.
//!
//! Every function takes an immutable byte slice and returns a new buffer; the
//! input is never modified. XOR and rotation are reversible: applying the
//! same XOR key twice, or rotating by `k` then by `8 - k`, restores the input.

use std::cmp::Ordering;

use log::trace;

use crate::errors::{KsError, Result};

/// XORs every byte with `key`.
pub fn process_xor_one(data: &[u8], key: u8) -> Vec<u8> {
    data.iter().map(|b| b ^ key).collect()
}

/// XORs byte `i` with `key[i % key.len()]`. Fails on an empty key.
pub fn process_xor_many(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if key.is_empty() {
        return Err(KsError::InvalidArgument(
            "XOR key must not be empty".to_string(),
        ));
    }

    Ok(data
        .iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect())
}

/// Rotates each byte left by `amount` bits, modulo 8. A negative amount
/// rotates right.
pub fn process_rotate_left(data: &[u8], amount: i32) -> Vec<u8> {
    let shift = amount.rem_euclid(8) as u32;
    data.iter().map(|b| b.rotate_left(shift)).collect()
}

/// Removes the trailing run of `pad_byte`.
pub fn bytes_strip_right(data: &[u8], pad_byte: u8) -> Vec<u8> {
    let end = data
        .iter()
        .rposition(|&b| b != pad_byte)
        .map_or(0, |i| i + 1);

    data[..end].to_vec()
}

/// Cuts `data` at the first `term` byte, keeping the terminator if `include`.
/// Without a terminator the whole input is returned.
pub fn bytes_terminate(data: &[u8], term: u8, include: bool) -> Vec<u8> {
    match data.iter().position(|&b| b == term) {
        Some(i) if include => data[..=i].to_vec(),
        Some(i) => data[..i].to_vec(),
        None => data.to_vec(),
    }
}

/// Inflates zlib-framed data.
#[cfg(feature = "zlib")]
pub fn process_zlib(data: &[u8]) -> Result<Vec<u8>> {
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    trace!("Inflating {} bytes", data.len());
    let mut output = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut output)
        .map_err(|e| KsError::DecompressionError(format!("zlib: {}", e)))?;
    trace!("Inflated to {} bytes", output.len());

    Ok(output)
}

/// Byte-wise unsigned comparison; a prefix sorts before the longer buffer.
pub fn byte_array_compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Reverses the byte order.
pub fn reverse(data: &[u8]) -> Vec<u8> {
    let out: Vec<u8> = data.iter().rev().copied().collect();
    trace!("Reversed {} bytes", out.len());
    out
}
