//! Global settings block.
//!
//! Settings are 16-bit words stored back to back at the start of the device
//! EEPROM. Their position is their identity, so the block is a fixed array
//! indexed by [`SettingId`] in declaration order.

use crate::codec;
use crate::error::Result;
use serde::{Serialize, Serializer};

/// Role a physical button is bound to. Used as the value of `BTN_*` settings.
///
/// The firmware indexes its press/release handler tables with this code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ButtonRole {
    Left = 0x00,
    Middle = 0x01,
    Right = 0x02,
    Forward = 0x03,
    Back = 0x04,
    Z = 0x05,
    HighRes = 0x06,
}

impl ButtonRole {
    pub const ALL: &'static [ButtonRole] = &[
        ButtonRole::Left,
        ButtonRole::Middle,
        ButtonRole::Right,
        ButtonRole::Forward,
        ButtonRole::Back,
        ButtonRole::Z,
        ButtonRole::HighRes,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Configuration-file name of the role.
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Middle => "MIDDLE",
            Self::Right => "RIGHT",
            Self::Forward => "FORWARD",
            Self::Back => "BACK",
            Self::Z => "Z",
            Self::HighRes => "HIGH_RES",
        }
    }

    /// Parse a role name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for ButtonRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Every setting in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingId {
    CpiX,
    CpiY,
    CpiMax,
    CpiMin,
    CpiStep,
    CpiZ,
    CpiH,
    CpiHrX,
    CpiHrY,
    BtnA,
    BtnB,
    BtnC,
    BtnD,
    BtnE,
    BtnF,
    BtnG,
    LedAction,
    Vid,
    Pid,
    Release,
    ProfileDefault,
    ProfileCurrent,
    AdnsCrc,
    AdnsId,
    AdnsFwLen,
    AdnsFwOffset,
}

/// Number of settings in the block.
pub const SETTINGS_LEN: usize = SettingId::ALL.len();

impl SettingId {
    /// Canonical order. This is the order words are laid out in device memory.
    pub const ALL: [SettingId; 26] = [
        SettingId::CpiX,
        SettingId::CpiY,
        SettingId::CpiMax,
        SettingId::CpiMin,
        SettingId::CpiStep,
        SettingId::CpiZ,
        SettingId::CpiH,
        SettingId::CpiHrX,
        SettingId::CpiHrY,
        SettingId::BtnA,
        SettingId::BtnB,
        SettingId::BtnC,
        SettingId::BtnD,
        SettingId::BtnE,
        SettingId::BtnF,
        SettingId::BtnG,
        SettingId::LedAction,
        SettingId::Vid,
        SettingId::Pid,
        SettingId::Release,
        SettingId::ProfileDefault,
        SettingId::ProfileCurrent,
        SettingId::AdnsCrc,
        SettingId::AdnsId,
        SettingId::AdnsFwLen,
        SettingId::AdnsFwOffset,
    ];

    /// Button settings, A..G.
    pub const BUTTONS: [SettingId; 7] = [
        SettingId::BtnA,
        SettingId::BtnB,
        SettingId::BtnC,
        SettingId::BtnD,
        SettingId::BtnE,
        SettingId::BtnF,
        SettingId::BtnG,
    ];

    /// Position of this setting in the block.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in configuration files and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::CpiX => "CPI_X",
            Self::CpiY => "CPI_Y",
            Self::CpiMax => "CPI_MAX",
            Self::CpiMin => "CPI_MIN",
            Self::CpiStep => "CPI_STEP",
            Self::CpiZ => "CPI_Z",
            Self::CpiH => "CPI_H",
            Self::CpiHrX => "CPI_HR_X",
            Self::CpiHrY => "CPI_HR_Y",
            Self::BtnA => "BTN_A",
            Self::BtnB => "BTN_B",
            Self::BtnC => "BTN_C",
            Self::BtnD => "BTN_D",
            Self::BtnE => "BTN_E",
            Self::BtnF => "BTN_F",
            Self::BtnG => "BTN_G",
            Self::LedAction => "LED_ACTION",
            Self::Vid => "VID",
            Self::Pid => "PID",
            Self::Release => "RELEASE",
            Self::ProfileDefault => "PROFILE_DEFAULT",
            Self::ProfileCurrent => "PROFILE_CURRENT",
            Self::AdnsCrc => "ADNS_CRC",
            Self::AdnsId => "ADNS_ID",
            Self::AdnsFwLen => "ADNS_FW_LEN",
            Self::AdnsFwOffset => "ADNS_FW_OFFSET",
        }
    }

    /// Look up a setting by name, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn is_button(self) -> bool {
        Self::BUTTONS.contains(&self)
    }

    /// Factory value written when the configuration does not override it.
    pub fn default_value(self) -> i32 {
        match self {
            Self::CpiX | Self::CpiY => 4320,
            Self::CpiMax => 5040,
            Self::CpiMin => 0,
            Self::CpiStep => 90,
            Self::CpiZ | Self::CpiH => 0,
            Self::CpiHrX | Self::CpiHrY => 360,
            Self::BtnA => ButtonRole::Left.code(),
            Self::BtnB => ButtonRole::Middle.code(),
            Self::BtnC => ButtonRole::Right.code(),
            Self::BtnD => ButtonRole::Z.code(),
            Self::BtnE => ButtonRole::HighRes.code(),
            Self::BtnF => ButtonRole::Forward.code(),
            Self::BtnG => ButtonRole::Back.code(),
            Self::LedAction => 0,
            Self::Vid => 0x192F,
            Self::Pid => 0x0000,
            Self::Release => 0x0000,
            Self::ProfileDefault | Self::ProfileCurrent => 0,
            Self::AdnsCrc => 0xBEEF,
            Self::AdnsId => 0x56,
            Self::AdnsFwLen => 0x0BFE,
            Self::AdnsFwOffset => crate::address::FIRMWARE_BASE as i32,
        }
    }
}

impl std::fmt::Display for SettingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SettingId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Encode `(setting, value)` pairs into consecutive little-endian words.
pub(crate) fn encode_words<I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (SettingId, i32)>,
{
    let mut out = Vec::new();
    for (id, value) in entries {
        out.extend_from_slice(&codec::encode_field(id.name(), value)?);
    }
    Ok(out)
}

/// The full global settings block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    values: [i32; SETTINGS_LEN],
}

impl Default for Settings {
    fn default() -> Self {
        let mut values = [0; SETTINGS_LEN];
        for id in SettingId::ALL {
            values[id.index()] = id.default_value();
        }
        Self { values }
    }
}

impl Settings {
    pub fn get(&self, id: SettingId) -> i32 {
        self.values[id.index()]
    }

    pub fn set(&mut self, id: SettingId, value: i32) {
        self.values[id.index()] = value;
    }

    /// Entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (SettingId, i32)> + '_ {
        SettingId::ALL.iter().map(move |&id| (id, self.values[id.index()]))
    }

    /// Wire payload: one little-endian word per setting.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_words(self.iter())
    }
}

impl Serialize for Settings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(id, v)| (id.name(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_indices() {
        for (i, id) in SettingId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        assert_eq!(SettingId::ALL[0], SettingId::CpiX);
        assert_eq!(SettingId::ALL[SETTINGS_LEN - 1], SettingId::AdnsFwOffset);
    }

    #[test]
    fn names_roundtrip() {
        for id in SettingId::ALL {
            assert_eq!(SettingId::from_name(id.name()), Some(id));
        }
        assert_eq!(SettingId::from_name("cpi_hr_x"), Some(SettingId::CpiHrX));
        assert_eq!(SettingId::from_name("SCROLL_SKIP"), None);
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.get(SettingId::CpiX), 4320);
        assert_eq!(s.get(SettingId::CpiMax), 5040);
        assert_eq!(s.get(SettingId::BtnD), ButtonRole::Z.code());
        assert_eq!(s.get(SettingId::Vid), 0x192F);
        assert_eq!(s.get(SettingId::AdnsCrc), 0xBEEF);
        assert_eq!(s.get(SettingId::AdnsFwOffset), 0xF000);
    }

    #[test]
    fn payload_is_one_word_per_setting() {
        let payload = Settings::default().encode().unwrap();
        assert_eq!(payload.len(), SETTINGS_LEN * 2);
        assert_eq!(payload.len(), 52);
        assert_eq!(&payload[0..2], &[0xE0, 0x10]); // CPI_X = 4320
        let vid = SettingId::Vid.index() * 2;
        assert_eq!(&payload[vid..vid + 2], &[0x2F, 0x19]);
    }

    #[test]
    fn encode_names_offending_setting() {
        let mut s = Settings::default();
        s.set(SettingId::CpiStep, -5);
        let err = s.encode().unwrap_err();
        assert!(err.to_string().contains("CPI_STEP"));
    }

    #[test]
    fn button_role_names() {
        assert_eq!(ButtonRole::from_name("high_res"), Some(ButtonRole::HighRes));
        assert_eq!(ButtonRole::from_name("LEFT"), Some(ButtonRole::Left));
        assert_eq!(ButtonRole::from_name("shoot"), None);
        assert_eq!(ButtonRole::from_code(4), Some(ButtonRole::Back));
        assert_eq!(ButtonRole::from_code(7), None);
    }

    #[test]
    fn serializes_in_wire_order() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.starts_with("{\"CPI_X\":4320,\"CPI_Y\":4320"));
        assert!(json.ends_with("\"ADNS_FW_OFFSET\":61440}"));
    }
}
