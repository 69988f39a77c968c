//! Safety layer: validates the model and firmware image against what the
//! device firmware can digest before any report is sent.
//!
//! # loststone firmware constraints
//!
//! ## Word values
//! - Every setting is a `uint16_t` in EEPROM. Anything outside 0..=65535
//!   would be truncated on the wire, so it is rejected here.
//!
//! ## Button roles
//! - `BTN_A`..`BTN_G` index a 7-entry press/release handler table in the
//!   firmware. A code above `HIGH_RES` (6) jumps through garbage.
//!
//! ## Profiles
//! - `PROFILE_DEFAULT` / `PROFILE_CURRENT` select one of the five profile
//!   blocks (0..=4).
//!
//! ## Firmware staging
//! - The image is staged at `ADNS_FW_OFFSET` in a 64 KiB EEPROM and must end
//!   inside it.
//! - `ADNS_FW_LEN` tells the firmware how many bytes to upload to the sensor.
//!   A mismatch with the actual image is suspicious but not fatal.
//!
//! All checks happen BEFORE any HID communication.

use crate::address::EEPROM_SIZE;
use crate::codec::{VALUE_MAX, VALUE_MIN};
use crate::error::{Error, Result};
use crate::firmware::FirmwareImage;
use crate::profile::{DeviceModel, PROFILE_COUNT};
use crate::settings::{ButtonRole, SettingId};
use tracing::warn;

/// Bricking risk disclaimer. Include in any user-facing output about device writes.
pub const BRICKING_DISCLAIMER: &str = "\
WARNING: This tool rewrites the loststone's configuration EEPROM and the staged \
ADNS-9500 sensor firmware. Settings and profiles are read back and checked, but \
firmware chunks are not. An interrupted or corrupted firmware upload leaves the \
sensor dead until the firmware is loaded again.";

/// Check one value for a setting.
pub fn validate_value(id: SettingId, value: i32) -> Result<()> {
    if !(VALUE_MIN..=VALUE_MAX).contains(&value) {
        return Err(Error::ValueOutOfRange {
            field: id.name(),
            value: value as i64,
            min: VALUE_MIN as i64,
            max: VALUE_MAX as i64,
        });
    }
    if id.is_button() && ButtonRole::from_code(value).is_none() {
        return Err(Error::ValueOutOfRange {
            field: id.name(),
            value: value as i64,
            min: ButtonRole::Left.code() as i64,
            max: ButtonRole::HighRes.code() as i64,
        });
    }
    if matches!(id, SettingId::ProfileDefault | SettingId::ProfileCurrent)
        && value >= PROFILE_COUNT as i32
    {
        return Err(Error::ValueOutOfRange {
            field: id.name(),
            value: value as i64,
            min: 0,
            max: (PROFILE_COUNT - 1) as i64,
        });
    }
    Ok(())
}

/// Check every settings and profile value.
pub fn validate_model(model: &DeviceModel) -> Result<()> {
    for (id, value) in model.settings().iter() {
        validate_value(id, value)?;
    }
    for profile in model.profiles() {
        for (id, value) in profile.iter() {
            validate_value(id, value)?;
        }
    }
    Ok(())
}

/// Check a firmware image against the staging area the model describes.
pub fn check_firmware(model: &DeviceModel, image: &FirmwareImage) -> Result<()> {
    let base = model.settings().get(SettingId::AdnsFwOffset);
    let declared = model.settings().get(SettingId::AdnsFwLen);

    if base as i64 + image.len() as i64 > EEPROM_SIZE as i64 {
        return Err(Error::FirmwareTooLarge {
            base: base as u16,
            len: image.len(),
        });
    }

    if declared as usize != image.len() {
        warn!(
            declared = declared,
            actual = image.len(),
            "ADNS_FW_LEN does not match firmware image length"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_valid() {
        assert!(validate_model(&DeviceModel::default()).is_ok());
    }

    #[test]
    fn rejects_unencodable_values() {
        assert!(validate_value(SettingId::CpiX, -1).is_err());
        assert!(validate_value(SettingId::CpiX, 65536).is_err());
        assert!(validate_value(SettingId::AdnsCrc, 0xFFFF).is_ok());
    }

    #[test]
    fn rejects_unknown_button_roles() {
        for role in ButtonRole::ALL {
            assert!(validate_value(SettingId::BtnA, role.code()).is_ok());
        }
        assert!(validate_value(SettingId::BtnG, 7).is_err());
        // only BTN_* are constrained to role codes
        assert!(validate_value(SettingId::LedAction, 7).is_ok());
    }

    #[test]
    fn rejects_bad_profile_selection() {
        assert!(validate_value(SettingId::ProfileDefault, 4).is_ok());
        assert!(validate_value(SettingId::ProfileCurrent, 5).is_err());
    }

    #[test]
    fn validates_profiles_too() {
        let model = DeviceModel::builder()
            .profile_setting(crate::profile::ProfileLabel::D, SettingId::BtnC, 9)
            .unwrap()
            .build();
        let err = validate_model(&model).unwrap_err();
        assert!(err.to_string().contains("BTN_C"));
    }

    #[test]
    fn firmware_must_fit_staging_area() {
        let model = DeviceModel::builder()
            .setting(SettingId::AdnsFwOffset, 0xFF00)
            .build();
        let image = FirmwareImage::from_bytes(vec![0; 0x200]);
        assert!(matches!(
            check_firmware(&model, &image),
            Err(Error::FirmwareTooLarge { .. })
        ));
    }

    #[test]
    fn firmware_length_mismatch_is_not_fatal() {
        let model = DeviceModel::default();
        let image = FirmwareImage::from_bytes(vec![0; 10]);
        assert!(check_firmware(&model, &image).is_ok());
    }

    #[test]
    fn bricking_disclaimer_not_empty() {
        assert!(BRICKING_DISCLAIMER.contains("WARNING"));
    }
}
