//! Device EEPROM address map.
//!
//! The loststone keeps everything in one 25LC512 SPI EEPROM (64 KiB):
//!   - settings block at 0x0000, one 16-bit word per setting
//!   - five profile blocks starting at 0x00FF, 40 bytes apart, wrapped to one 256-byte page
//!   - ADNS-9500 firmware staging area at `ADNS_FW_OFFSET` (0xF000 by default)

use crate::error::{Error, Result};
use crate::profile::{PROFILE_COUNT, PROFILE_LEN};

/// Base of the global settings block.
pub const SETTINGS_BASE: u16 = 0x0000;
/// Base of profile A.
pub const PROFILE_BASE: u16 = 0x00FF;
/// Distance between consecutive profiles in bytes.
pub const PROFILE_STRIDE: u16 = (PROFILE_LEN * 2) as u16;
/// Profile addresses wrap within this page mask.
pub const PAGE_MASK: u16 = 0x00FF;
/// Default firmware staging base.
pub const FIRMWARE_BASE: u16 = 0xF000;
/// Size of the device EEPROM.
pub const EEPROM_SIZE: u32 = 0x1_0000;

/// Address of the settings block.
pub fn settings_address() -> u16 {
    SETTINGS_BASE
}

/// Address of profile `index` (0 = A .. 4 = E).
///
/// The result is masked to one page. Profile A therefore sits at 0xFF and B..E
/// wrap round to 0x27, 0x4F, 0x77, 0x9F. The firmware expects exactly these.
pub fn profile_address(index: usize) -> Result<u16> {
    if index >= PROFILE_COUNT {
        return Err(Error::ValueOutOfRange {
            field: "profile_index",
            value: index as i64,
            min: 0,
            max: (PROFILE_COUNT - 1) as i64,
        });
    }
    Ok((PROFILE_BASE + index as u16 * PROFILE_STRIDE) & PAGE_MASK)
}

/// Address of the firmware chunk that starts `bytes_written` bytes into the image.
///
/// Not masked. Fails if the chunk would start past the end of device memory.
pub fn firmware_chunk_address(base: u16, bytes_written: u32) -> Result<u16> {
    let address = u32::from(base) + bytes_written;
    u16::try_from(address).map_err(|_| Error::FirmwareTooLarge {
        base,
        len: bytes_written as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_at_zero() {
        assert_eq!(settings_address(), 0x0000);
    }

    #[test]
    fn profile_addresses_wrap_in_page() {
        let addrs: Vec<u16> = (0..PROFILE_COUNT)
            .map(|i| profile_address(i).unwrap())
            .collect();
        assert_eq!(addrs, vec![0xFF, 0x27, 0x4F, 0x77, 0x9F]);
    }

    #[test]
    fn profile_addresses_fit_one_byte_and_advance_by_stride() {
        for i in 0..PROFILE_COUNT {
            let a = profile_address(i).unwrap();
            assert!(a <= 0xFF);
            if i > 0 {
                let prev = profile_address(i - 1).unwrap();
                assert_eq!(a.wrapping_sub(prev) & PAGE_MASK, PROFILE_STRIDE);
            }
        }
    }

    #[test]
    fn profile_index_out_of_range() {
        assert!(profile_address(5).is_err());
    }

    #[test]
    fn firmware_address_is_unmasked() {
        assert_eq!(firmware_chunk_address(FIRMWARE_BASE, 0).unwrap(), 0xF000);
        assert_eq!(firmware_chunk_address(FIRMWARE_BASE, 59).unwrap(), 0xF03B);
        assert_eq!(firmware_chunk_address(FIRMWARE_BASE, 0x0BFE).unwrap(), 0xFBFE);
        assert_eq!(firmware_chunk_address(FIRMWARE_BASE, 0x0FFF).unwrap(), 0xFFFF);
        assert!(matches!(
            firmware_chunk_address(FIRMWARE_BASE, 0x1000),
            Err(Error::FirmwareTooLarge { base: 0xF000, len: 0x1000 })
        ));
    }
}
