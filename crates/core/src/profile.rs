//! Per-profile overrides and the resolved device model.
//!
//! A profile is a copy of the first [`PROFILE_LEN`] settings (CPI_X .. RELEASE)
//! with individual values overridden. The device stores five of them, selected
//! at runtime by the profile buttons.

use crate::error::{Error, Result};
use crate::settings::{encode_words, SettingId, Settings};
use serde::{Serialize, Serializer};

/// Number of settings carried by each profile.
pub const PROFILE_LEN: usize = 20;
/// Number of profiles stored on the device.
pub const PROFILE_COUNT: usize = 5;

/// Profile slot on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProfileLabel {
    A,
    B,
    C,
    D,
    E,
}

impl ProfileLabel {
    pub const ALL: [ProfileLabel; PROFILE_COUNT] = [
        ProfileLabel::A,
        ProfileLabel::B,
        ProfileLabel::C,
        ProfileLabel::D,
        ProfileLabel::E,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Configuration section holding this profile's overrides (`profile_a` ..).
    pub fn section(self) -> &'static str {
        match self {
            Self::A => "profile_a",
            Self::B => "profile_b",
            Self::C => "profile_c",
            Self::D => "profile_d",
            Self::E => "profile_e",
        }
    }
}

impl std::fmt::Display for ProfileLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Whether `id` is part of the per-profile subset.
pub fn in_profile(id: SettingId) -> bool {
    id.index() < PROFILE_LEN
}

/// One profile block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    label: ProfileLabel,
    values: [i32; PROFILE_LEN],
}

impl Profile {
    /// Start from the first [`PROFILE_LEN`] global settings.
    pub fn from_settings(label: ProfileLabel, settings: &Settings) -> Self {
        let mut values = [0; PROFILE_LEN];
        for (id, v) in settings.iter().take(PROFILE_LEN) {
            values[id.index()] = v;
        }
        Self { label, values }
    }

    pub fn label(&self) -> ProfileLabel {
        self.label
    }

    pub fn get(&self, id: SettingId) -> Option<i32> {
        in_profile(id).then(|| self.values[id.index()])
    }

    /// Entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (SettingId, i32)> + '_ {
        SettingId::ALL[..PROFILE_LEN]
            .iter()
            .map(move |&id| (id, self.values[id.index()]))
    }

    /// Wire payload: one little-endian word per entry.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_words(self.iter())
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(id, v)| (id.name(), v)))
    }
}

/// Everything written to the device in one run.
///
/// Built once from defaults plus configuration, then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceModel {
    settings: Settings,
    profiles: [Profile; PROFILE_COUNT],
}

impl Default for DeviceModel {
    fn default() -> Self {
        DeviceModelBuilder::new().build()
    }
}

impl DeviceModel {
    pub fn builder() -> DeviceModelBuilder {
        DeviceModelBuilder::new()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn profiles(&self) -> &[Profile; PROFILE_COUNT] {
        &self.profiles
    }

    pub fn profile(&self, label: ProfileLabel) -> &Profile {
        &self.profiles[label.index()]
    }
}

/// Collects overrides, then derives profiles from the final settings.
#[derive(Debug, Clone, Default)]
pub struct DeviceModelBuilder {
    settings: Settings,
    overrides: Vec<(ProfileLabel, SettingId, i32)>,
}

impl DeviceModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a global setting. Profiles inherit it unless they override it too.
    pub fn setting(mut self, id: SettingId, value: i32) -> Self {
        self.settings.set(id, value);
        self
    }

    /// Override one entry of one profile.
    pub fn profile_setting(mut self, label: ProfileLabel, id: SettingId, value: i32) -> Result<Self> {
        if !in_profile(id) {
            return Err(Error::ConfigInvalid(vec![format!(
                "setting {} cannot be overridden per profile (profile {})",
                id, label
            )]));
        }
        self.overrides.push((label, id, value));
        Ok(self)
    }

    pub fn build(self) -> DeviceModel {
        let settings = self.settings;
        let mut profiles = ProfileLabel::ALL.map(|label| Profile::from_settings(label, &settings));
        for (label, id, value) in self.overrides {
            profiles[label.index()].values[id.index()] = value;
        }
        DeviceModel { settings, profiles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_subset_is_first_twenty() {
        assert!(in_profile(SettingId::CpiX));
        assert!(in_profile(SettingId::Pid));
        assert!(in_profile(SettingId::Release));
        assert!(!in_profile(SettingId::ProfileDefault));
        assert!(!in_profile(SettingId::AdnsFwOffset));
    }

    #[test]
    fn default_profiles_mirror_settings() {
        let model = DeviceModel::default();
        for profile in model.profiles() {
            assert_eq!(profile.iter().count(), PROFILE_LEN);
            for (id, v) in profile.iter() {
                assert_eq!(v, model.settings().get(id));
            }
        }
    }

    #[test]
    fn profiles_inherit_global_overrides() {
        let model = DeviceModel::builder().setting(SettingId::CpiX, 5040).build();
        for profile in model.profiles() {
            assert_eq!(profile.get(SettingId::CpiX), Some(5040));
        }
    }

    #[test]
    fn profile_override_is_local() {
        let model = DeviceModel::builder()
            .profile_setting(ProfileLabel::C, SettingId::CpiY, 1000)
            .unwrap()
            .build();
        assert_eq!(model.profile(ProfileLabel::C).get(SettingId::CpiY), Some(1000));
        assert_eq!(model.profile(ProfileLabel::B).get(SettingId::CpiY), Some(4320));
        assert_eq!(model.settings().get(SettingId::CpiY), 4320);
    }

    #[test]
    fn profile_override_wins_over_later_global() {
        let model = DeviceModel::builder()
            .profile_setting(ProfileLabel::A, SettingId::CpiZ, 7)
            .unwrap()
            .setting(SettingId::CpiZ, 9)
            .build();
        assert_eq!(model.profile(ProfileLabel::A).get(SettingId::CpiZ), Some(7));
        assert_eq!(model.profile(ProfileLabel::E).get(SettingId::CpiZ), Some(9));
    }

    #[test]
    fn profile_rejects_settings_outside_subset() {
        assert!(DeviceModel::builder()
            .profile_setting(ProfileLabel::A, SettingId::ProfileDefault, 1)
            .is_err());
        assert!(DeviceModel::builder()
            .profile_setting(ProfileLabel::A, SettingId::Release, 1)
            .is_ok());
        let p = Profile::from_settings(ProfileLabel::A, &Settings::default());
        assert_eq!(p.get(SettingId::AdnsCrc), None);
    }

    #[test]
    fn profile_payload_is_forty_bytes() {
        let model = DeviceModel::default();
        for profile in model.profiles() {
            assert_eq!(profile.encode().unwrap().len(), 40);
        }
    }

    #[test]
    fn labels() {
        assert_eq!(ProfileLabel::from_index(4), Some(ProfileLabel::E));
        assert_eq!(ProfileLabel::from_index(5), None);
        assert_eq!(ProfileLabel::B.section(), "profile_b");
        assert_eq!(ProfileLabel::D.to_string(), "D");
    }
}
