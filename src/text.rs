//! String helpers used by generated code: decoding byte fields into text and
//! integer/string conversions.

use encoding_rs::Encoding;
use log::trace;

use crate::errors::{KsError, Result};

/// Decodes `bytes` as text in the encoding named by `label` (any WHATWG
/// label: "UTF-8", "UTF-16LE", "Shift_JIS", "windows-1251"...). "ASCII" is
/// strict: every byte must be below 0x80.
///
/// Malformed input is an error, never replaced.
pub fn bytes_to_str(bytes: &[u8], label: &str) -> Result<String> {
    if label.eq_ignore_ascii_case("ascii") {
        if let Some(i) = bytes.iter().position(|b| !b.is_ascii()) {
            return Err(KsError::EncodingError {
                encoding: label.to_string(),
                message: format!("byte {:#04x} at offset {} is not ASCII", bytes[i], i),
            });
        }
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }

    let encoding =
        Encoding::for_label(label.as_bytes()).ok_or_else(|| KsError::EncodingError {
            encoding: label.to_string(),
            message: "unknown encoding".to_string(),
        })?;
    trace!("Decoding {} bytes as {}", bytes.len(), encoding.name());

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| KsError::EncodingError {
            encoding: encoding.name().to_string(),
            message: "malformed input".to_string(),
        })
}

/// Reverses a string by characters.
pub fn reverse_str(s: &str) -> String {
    s.chars().rev().collect()
}

/// Formats `value` in `base` (2..=36), lowercase digits, `-` for negatives.
pub fn int_to_str(value: i64, base: u32) -> Result<String> {
    check_base(base)?;

    let mut magnitude = value.unsigned_abs();
    if magnitude == 0 {
        return Ok("0".to_string());
    }

    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % base as u64) as u32;
        // digit < base <= 36
        digits.extend(char::from_digit(digit, base));
        magnitude /= base as u64;
    }
    if value < 0 {
        digits.push('-');
    }

    Ok(digits.into_iter().rev().collect())
}

/// Parses `s` as an integer in `base` (2..=36).
pub fn str_to_int(s: &str, base: u32) -> Result<i64> {
    check_base(base)?;

    i64::from_str_radix(s, base)
        .map_err(|e| KsError::InvalidArgument(format!("cannot parse {:?} in base {}: {}", s, base, e)))
}

fn check_base(base: u32) -> Result<()> {
    if !(2..=36).contains(&base) {
        return Err(KsError::InvalidArgument(format!(
            "base must be in 2..=36, got {}",
            base
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_bytes_to_str_utf8() {
        assert_eq!(bytes_to_str("héllo".as_bytes(), "UTF-8").unwrap(), "héllo");
        assert_eq!(
            bytes_to_str(&[0xC3, 0x28], "utf-8").unwrap_err().kind(),
            ErrorKind::EncodingError
        );
    }

    #[test]
    fn test_bytes_to_str_utf16le() {
        assert_eq!(
            bytes_to_str(&[0x4B, 0x00, 0x53, 0x00], "UTF-16LE").unwrap(),
            "KS"
        );
    }

    #[test]
    fn test_bytes_to_str_ascii() {
        assert_eq!(bytes_to_str(b"Hello\n", "ASCII").unwrap(), "Hello\n");

        let err = bytes_to_str("Hello❤️".as_bytes(), "ASCII").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodingError);
    }

    #[test]
    fn test_bytes_to_str_unknown_encoding() {
        let err = bytes_to_str(b"abc", "no-such-charset").unwrap_err();
        assert!(matches!(err, KsError::EncodingError { .. }));
    }

    #[test]
    fn test_reverse_str() {
        assert_eq!(reverse_str("abc"), "cba");
        assert_eq!(reverse_str(""), "");
    }

    #[test]
    fn test_int_to_str() {
        assert_eq!(int_to_str(255, 16).unwrap(), "ff");
        assert_eq!(int_to_str(-10, 2).unwrap(), "-1010");
        assert_eq!(int_to_str(0, 8).unwrap(), "0");
        assert_eq!(int_to_str(i64::MIN, 16).unwrap(), "-8000000000000000");
        assert_eq!(
            int_to_str(1, 37).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_str_to_int() {
        assert_eq!(str_to_int("ff", 16).unwrap(), 255);
        assert_eq!(str_to_int("-1010", 2).unwrap(), -10);
        assert_eq!(
            str_to_int("12z", 10).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
}
