//! Enum validation for decoded integers.
//!
//! Format enums are plain Rust enums deriving `num_enum::TryFromPrimitive`,
//! so each variant carries its integer value and equality is structural:
//!
//! ```
//! use kaitai_runtime::enums::to_enum;
//! use num_enum::TryFromPrimitive;
//!
//! #[repr(u8)]
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
//! enum Compression {
//!     None = 0,
//!     Zlib = 8,
//! }
//!
//! assert_eq!(to_enum::<Compression>(8).unwrap(), Compression::Zlib);
//! assert!(to_enum::<Compression>(3).is_err());
//! ```

use std::fmt;

use num_enum::TryFromPrimitive;

use crate::errors::{KsError, Result};

/// Maps a decoded integer to its enum variant, or fails with
/// [`KsError::InvalidEnumValue`].
pub fn to_enum<T>(raw: T::Primitive) -> Result<T>
where
    T: TryFromPrimitive,
    T::Primitive: Into<i128>,
{
    T::try_from_primitive(raw).map_err(|_| KsError::InvalidEnumValue {
        name: T::NAME,
        value: raw.into(),
    })
}

/// Variant name for known values, hex of the raw value otherwise. For
/// diagnostics only.
pub fn enum_name_or_value<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
    enum Machine {
        X86 = 0x03,
        Arm = 0x28,
        Amd64 = 0x3E,
    }

    #[repr(i8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
    enum Delta {
        Down = -1,
        Up = 1,
    }

    #[test]
    fn test_to_enum() {
        assert_eq!(to_enum::<Machine>(0x3E).unwrap(), Machine::Amd64);
        assert_eq!(to_enum::<Machine>(0x28).unwrap(), Machine::Arm);
        assert_ne!(to_enum::<Machine>(0x03).unwrap(), Machine::Arm);
        assert_eq!(to_enum::<Delta>(-1).unwrap(), Delta::Down);
        assert_eq!(to_enum::<Delta>(1).unwrap(), Delta::Up);
    }

    #[test]
    fn test_to_enum_invalid() {
        let err = to_enum::<Machine>(0x99).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEnumValue);
        assert!(matches!(
            err,
            KsError::InvalidEnumValue {
                name: "Machine",
                value: 0x99
            }
        ));
    }

    #[test]
    fn test_enum_name_or_value() {
        assert_eq!(enum_name_or_value::<Machine>(0x03), "X86");
        assert_eq!(enum_name_or_value::<Machine>(0x07), "0x7");
    }
}
