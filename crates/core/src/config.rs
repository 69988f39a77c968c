//! `loststone.cfg` loading.
//!
//! INI layout:
//!
//! ```ini
//! [config]            ; required: USB ids used to open the device
//! VID = 0x1234
//! PID = 0x0006
//!
//! [settings]          ; required: global settings, any subset
//! CPI_X = 4320
//! BTN_A = 'LEFT'
//!
//! [profile_a]         ; optional, profile_a .. profile_e
//! CPI_X = 5040
//! ```
//!
//! Values are decimal, `0x` hex, or a button role name (quoted or bare).
//! Every problem is collected and reported at once, before any device I/O.

use crate::codec::{VALUE_MAX, VALUE_MIN};
use crate::error::{Error, Result};
use crate::profile::{in_profile, DeviceModel, ProfileLabel};
use crate::safety;
use crate::settings::{ButtonRole, SettingId};
use configparser::ini::Ini;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Section holding host-side device selection.
pub const CONFIG_SECTION: &str = "config";
/// Section holding global settings.
pub const SETTINGS_SECTION: &str = "settings";

/// Default USB vendor ID of the loststone in programming mode.
pub const DEFAULT_VID: u16 = 0x1234;
/// Default USB product ID of the loststone in programming mode.
pub const DEFAULT_PID: u16 = 0x0006;

/// USB identity the host opens the device with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceIds {
    pub vid: u16,
    pub pid: u16,
    pub release: u16,
}

impl Default for DeviceIds {
    fn default() -> Self {
        Self {
            vid: DEFAULT_VID,
            pid: DEFAULT_PID,
            release: 0,
        }
    }
}

/// A fully resolved configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoststoneConfig {
    pub device: DeviceIds,
    pub model: DeviceModel,
}

type Sections = HashMap<String, HashMap<String, Option<String>>>;

impl LoststoneConfig {
    /// Load and resolve a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loading configuration");
        Self::parse(&text)
    }

    /// Resolve configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut ini = Ini::new();
        let sections = ini
            .read(text.to_string())
            .map_err(|e| Error::ConfigInvalid(vec![format!("unable to parse: {e}")]))?;
        resolve(&sections)
    }
}

/// Parse one value: `0x..` hex, decimal, or a button role name.
pub fn parse_value(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        return i64::from_str_radix(hex, 16).ok();
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    let word = s
        .strip_prefix('\'')
        .and_then(|w| w.strip_suffix('\''))
        .unwrap_or(s);
    ButtonRole::from_name(word).map(|r| r.code() as i64)
}

fn resolve(sections: &Sections) -> Result<LoststoneConfig> {
    let mut problems = Vec::new();
    let mut device = DeviceIds::default();
    let mut builder = DeviceModel::builder();

    for name in sorted_keys(sections) {
        let known = name == CONFIG_SECTION
            || name == SETTINGS_SECTION
            || ProfileLabel::ALL.iter().any(|l| l.section() == name);
        if !known {
            warn!(section = %name, "Ignoring unknown configuration section");
        }
    }

    match sections.get(CONFIG_SECTION) {
        None => problems.push(format!("missing section [{CONFIG_SECTION}]")),
        Some(entries) => {
            for (key, value) in entries_of(CONFIG_SECTION, entries, &mut problems) {
                let slot = match key.to_ascii_uppercase().as_str() {
                    "VID" => &mut device.vid,
                    "PID" => &mut device.pid,
                    "RELEASE" => &mut device.release,
                    _ => {
                        problems.push(format!(
                            "attribute {:?} in section [{CONFIG_SECTION}] is not valid",
                            key.to_ascii_uppercase()
                        ));
                        continue;
                    }
                };
                if let Some(v) = word(CONFIG_SECTION, &key, value, &mut problems) {
                    *slot = v as u16;
                }
            }
        }
    }

    match sections.get(SETTINGS_SECTION) {
        None => problems.push(format!("missing section [{SETTINGS_SECTION}]")),
        Some(entries) => {
            for (key, value) in entries_of(SETTINGS_SECTION, entries, &mut problems) {
                let Some(id) = SettingId::from_name(&key) else {
                    problems.push(format!(
                        "attribute {:?} in section [{SETTINGS_SECTION}] is not valid",
                        key.to_ascii_uppercase()
                    ));
                    continue;
                };
                if let Some(v) = word(SETTINGS_SECTION, &key, value, &mut problems) {
                    builder = builder.setting(id, v as i32);
                }
            }
        }
    }

    for label in ProfileLabel::ALL {
        let section = label.section();
        let Some(entries) = sections.get(section) else {
            continue;
        };
        for (key, value) in entries_of(section, entries, &mut problems) {
            let id = match SettingId::from_name(&key) {
                Some(id) if in_profile(id) => id,
                _ => {
                    problems.push(format!(
                        "attribute {:?} in section [{section}] is not valid",
                        key.to_ascii_uppercase()
                    ));
                    continue;
                }
            };
            if let Some(v) = word(section, &key, value, &mut problems) {
                builder = builder.profile_setting(label, id, v as i32)?;
            }
        }
    }

    if !problems.is_empty() {
        return Err(Error::ConfigInvalid(problems));
    }

    let model = builder.build();
    if let Err(e) = safety::validate_model(&model) {
        return Err(Error::ConfigInvalid(vec![e.to_string()]));
    }

    Ok(LoststoneConfig { device, model })
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&String> {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys
}

/// Entries of a section in key order, dropping (and reporting) empty ones.
fn entries_of<'a>(
    section: &str,
    entries: &'a HashMap<String, Option<String>>,
    problems: &mut Vec<String>,
) -> Vec<(String, &'a str)> {
    let mut out = Vec::new();
    for key in sorted_keys(entries) {
        match entries[key].as_deref() {
            Some(v) => out.push((key.clone(), v)),
            None => problems.push(format!(
                "attribute {:?} in section [{section}] has no value",
                key.to_ascii_uppercase()
            )),
        }
    }
    out
}

/// Parse a value and check it fits a 16-bit word.
fn word(section: &str, key: &str, raw: &str, problems: &mut Vec<String>) -> Option<i64> {
    let Some(v) = parse_value(raw) else {
        problems.push(format!(
            "attribute {:?} in section [{section}] has unparsable value {raw:?}",
            key.to_ascii_uppercase()
        ));
        return None;
    };
    if v < VALUE_MIN as i64 || v > VALUE_MAX as i64 {
        problems.push(format!(
            "attribute {:?} in section [{section}] is out of range: {v} (allowed {VALUE_MIN}..={VALUE_MAX})",
            key.to_ascii_uppercase()
        ));
        return None;
    }
    Some(v)
}
