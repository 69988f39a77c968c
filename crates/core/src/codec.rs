//! 16-bit value codec.
//!
//! Every setting travels as an unsigned 16-bit little-endian pair. The device
//! firmware stores settings as `uint16_t` and rebuilds them with
//! `(high << 8) | low`, so there is no signed representation on the wire.

use crate::error::{Error, Result};

/// Smallest encodable logical value.
pub const VALUE_MIN: i32 = 0;
/// Largest encodable logical value.
pub const VALUE_MAX: i32 = u16::MAX as i32;

/// Encode a logical value into its `[low, high]` wire pair.
pub fn encode(value: i32) -> Result<[u8; 2]> {
    encode_field("value", value)
}

/// Encode a value, naming `field` in the error if it does not fit.
pub fn encode_field(field: &'static str, value: i32) -> Result<[u8; 2]> {
    let v = u16::try_from(value).map_err(|_| Error::ValueOutOfRange {
        field,
        value: value as i64,
        min: VALUE_MIN as i64,
        max: VALUE_MAX as i64,
    })?;
    Ok(v.to_le_bytes())
}

/// Rebuild a logical value from its wire pair.
pub fn decode(low: u8, high: u8) -> u16 {
    u16::from_le_bytes([low, high])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_little_endian() {
        assert_eq!(encode(0x192F).unwrap(), [0x2F, 0x19]);
        assert_eq!(encode(4320).unwrap(), [0xE0, 0x10]);
    }

    #[test]
    fn small_values_pad_high_byte() {
        assert_eq!(encode(0).unwrap(), [0x00, 0x00]);
        assert_eq!(encode(5).unwrap(), [0x05, 0x00]);
        assert_eq!(encode(127).unwrap(), [0x7F, 0x00]);
        assert_eq!(encode(128).unwrap(), [0x80, 0x00]);
    }

    #[test]
    fn decode_matches_firmware_uint16() {
        assert_eq!(decode(0xEF, 0xBE), 0xBEEF);
        assert_eq!(decode(0x00, 0xF0), 0xF000);
    }

    #[test]
    fn full_range_survives_decode() {
        for v in VALUE_MIN..=VALUE_MAX {
            let [lo, hi] = encode(v).unwrap();
            assert_eq!(decode(lo, hi) as i32, v);
        }
    }

    #[test]
    fn negative_values_rejected() {
        assert!(matches!(
            encode(-1),
            Err(Error::ValueOutOfRange { value: -1, .. })
        ));
        assert!(encode(-128).is_err());
        assert!(encode(i32::MIN).is_err());
    }

    #[test]
    fn oversized_values_rejected() {
        assert!(encode(65536).is_err());
        let err = encode_field("CPI_X", 70000).unwrap_err();
        assert!(err.to_string().contains("CPI_X"));
    }
}
