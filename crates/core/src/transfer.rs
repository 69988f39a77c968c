//! End-to-end programming run: optional INIT, settings, five profiles, firmware.
//!
//! A run is planned in full before the first byte goes out, so every encoding
//! error surfaces while the device is still untouched. Execution is one loop
//! over the plan; what differs between settings, profiles and firmware lives
//! in [`TransferKind`].
//!
//! After each write the device needs time to commit the EEPROM page
//! (settle delay). Settings and profile writes are then read back. The
//! firmware answers LOAD_DATA with the bytes it just stored, and these are
//! compared word by word. INIT and firmware chunks are fire-and-forget.

use crate::address::{profile_address, settings_address};
use crate::codec;
use crate::error::{Error, Result};
use crate::firmware::{FirmwareChunker, FirmwareImage};
use crate::profile::{DeviceModel, ProfileLabel, PROFILE_COUNT};
use crate::report::{Action, AddressOrder, Report};
use crate::safety;
use crate::settings::SettingId;
use crate::transport::HidTransport;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Wait after a write, as a multiple of the configured settle unit (in tenths).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelay {
    tenths: u32,
}

impl SettleDelay {
    pub const NONE: Self = Self { tenths: 0 };
    /// One full unit: EEPROM page write plus read-back on the device.
    pub const FULL: Self = Self { tenths: 10 };
    /// A fifth of a unit: page write only.
    pub const FIFTH: Self = Self { tenths: 2 };

    pub fn scale(self, unit: Duration) -> Duration {
        unit * self.tenths / 10
    }
}

/// Per-kind transfer behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferKind {
    pub label: &'static str,
    pub action: Action,
    pub address_order: AddressOrder,
    pub validates_response: bool,
    pub settle: SettleDelay,
}

impl TransferKind {
    /// Erase all device memory. The firmware gives no acknowledgement.
    pub const INIT: Self = Self {
        label: "init",
        action: Action::Init,
        address_order: AddressOrder::LowHigh,
        validates_response: false,
        settle: SettleDelay::NONE,
    };

    pub const SETTINGS: Self = Self {
        label: "settings",
        action: Action::LoadData,
        address_order: AddressOrder::LowHigh,
        validates_response: true,
        settle: SettleDelay::FULL,
    };

    pub const PROFILE: Self = Self {
        label: "profile",
        action: Action::LoadData,
        address_order: AddressOrder::LowHigh,
        validates_response: true,
        settle: SettleDelay::FULL,
    };

    /// Firmware chunks go out high address byte first and are not read back.
    pub const FIRMWARE: Self = Self {
        label: "firmware",
        action: Action::LoadData,
        address_order: AddressOrder::HighLow,
        validates_response: false,
        settle: SettleDelay::FIFTH,
    };
}

/// What a report writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Init,
    Settings,
    Profile(ProfileLabel),
    Firmware { chunk: usize },
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Settings => f.write_str("settings"),
            Self::Profile(label) => write!(f, "profile {label}"),
            Self::Firmware { chunk } => write!(f, "firmware chunk {chunk}"),
        }
    }
}

/// Progress through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    Init,
    Idle,
    SettingsSent,
    /// Number of profiles sent so far.
    ProfilesSent(usize),
    FirmwareSent,
    Done,
}

impl State {
    fn after(target: Target) -> Self {
        match target {
            Target::Init => Self::Idle,
            Target::Settings => Self::SettingsSent,
            Target::Profile(label) => Self::ProfilesSent(label.index() + 1),
            Target::Firmware { .. } => Self::FirmwareSent,
        }
    }
}

/// One planned report.
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: TransferKind,
    pub target: Target,
    pub report: Report,
    /// Words expected back, in payload order. Empty unless the kind validates.
    pub expected: Vec<(SettingId, i32)>,
}

/// A word that did not read back as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMismatch {
    pub target: Target,
    pub setting: SettingId,
    pub expected: i32,
    pub actual: u16,
}

impl std::fmt::Display for ValidationMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: attribute [{}] was not set correctly. Should be [{:X}] is [{:X}]",
            self.target, self.setting, self.expected, self.actual
        )
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub mismatches: Vec<ValidationMismatch>,
    pub reports_sent: usize,
    pub firmware_bytes: usize,
    pub state: State,
}

impl TransferReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// `Err(ValidationFailed)` if any word failed read-back.
    pub fn into_result(self) -> Result<Self> {
        if self.mismatches.is_empty() {
            Ok(self)
        } else {
            Err(Error::ValidationFailed {
                count: self.mismatches.len(),
            })
        }
    }
}

/// Run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Erase device memory before writing.
    pub init: bool,
    /// Length of one settle unit.
    pub settle_unit: Duration,
    /// How long to wait for a read-back.
    pub read_timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            init: false,
            settle_unit: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
        }
    }
}

/// Drives a programming run over one transport.
pub struct Programmer<'a> {
    transport: &'a dyn HidTransport,
    options: TransferOptions,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Programmer<'a> {
    pub fn new(transport: &'a dyn HidTransport, options: TransferOptions) -> Self {
        Self {
            transport,
            options,
            cancel: None,
        }
    }

    /// Stop before the next report once `flag` is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Build every report for a run without touching the device.
    pub fn plan(&self, model: &DeviceModel, firmware: Option<&FirmwareImage>) -> Result<Vec<Step>> {
        safety::validate_model(model)?;

        let mut steps = Vec::new();

        if self.options.init {
            steps.push(init_step()?);
        }

        let kind = TransferKind::SETTINGS;
        let expected: Vec<_> = model.settings().iter().collect();
        steps.push(Step {
            kind,
            target: Target::Settings,
            report: Report::build(
                kind.action,
                settings_address(),
                kind.address_order,
                &model.settings().encode()?,
            )?,
            expected,
        });

        let kind = TransferKind::PROFILE;
        for profile in model.profiles() {
            steps.push(Step {
                kind,
                target: Target::Profile(profile.label()),
                report: Report::build(
                    kind.action,
                    profile_address(profile.label().index())?,
                    kind.address_order,
                    &profile.encode()?,
                )?,
                expected: profile.iter().collect(),
            });
        }

        if let Some(image) = firmware {
            safety::check_firmware(model, image)?;
            let base = codec::encode_field(
                SettingId::AdnsFwOffset.name(),
                model.settings().get(SettingId::AdnsFwOffset),
            )?;
            let chunker = FirmwareChunker::new(image, u16::from_le_bytes(base))?;
            let kind = TransferKind::FIRMWARE;
            for chunk in &chunker {
                steps.push(Step {
                    kind,
                    target: Target::Firmware { chunk: chunk.index },
                    report: Report::build(kind.action, chunk.address, kind.address_order, chunk.payload)?,
                    expected: Vec::new(),
                });
            }
        }

        debug!(
            reports = steps.len(),
            profiles = PROFILE_COUNT,
            firmware_bytes = firmware.map_or(0, |f| f.len()),
            "Transfer planned"
        );
        Ok(steps)
    }

    /// Plan and execute a full run.
    pub fn run(&self, model: &DeviceModel, firmware: Option<&FirmwareImage>) -> Result<TransferReport> {
        let steps = self.plan(model, firmware)?;
        self.execute(&steps)
    }

    /// Send a lone INIT report, clearing all device memory.
    pub fn init(&self) -> Result<()> {
        warn!("Clearing ALL loststone configuration; ADNS firmware must be reloaded afterwards");
        self.execute(&[init_step()?]).map(|_| ())
    }

    /// Send planned steps in order.
    ///
    /// Transport errors abort immediately. Read-back mismatches are collected
    /// and the run continues.
    pub fn execute(&self, steps: &[Step]) -> Result<TransferReport> {
        let mut state = match steps.first() {
            Some(step) if step.target == Target::Init => State::Init,
            _ => State::Idle,
        };
        let mut report = TransferReport {
            mismatches: Vec::new(),
            reports_sent: 0,
            firmware_bytes: 0,
            state,
        };

        for step in steps {
            if self.cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                warn!(state = ?state, next = %step.target, "Transfer cancelled");
                return Err(Error::Cancelled);
            }

            self.send(step)?;
            report.reports_sent += 1;
            if let Target::Firmware { .. } = step.target {
                report.firmware_bytes += step.report.payload_len();
            }

            if step.kind.validates_response {
                let mismatches = self.validate(step)?;
                report.mismatches.extend(mismatches);
            }

            let next = State::after(step.target);
            if next != state {
                info!(from = ?state, to = ?next, "Transfer state");
                state = next;
            }
        }

        state = State::Done;
        info!(
            reports = report.reports_sent,
            firmware_bytes = report.firmware_bytes,
            mismatches = report.mismatches.len(),
            "Transfer complete"
        );
        report.state = state;
        Ok(report)
    }

    fn send(&self, step: &Step) -> Result<()> {
        match step.target {
            Target::Firmware { chunk } if chunk > 0 => {}
            Target::Firmware { .. } => info!("Loading ADNS firmware"),
            target => info!(region = %target, "Loading"),
        }

        let bytes = step.report.as_bytes();
        trace!(
            kind = step.kind.label,
            region = %step.target,
            report_hex = format_args!("{:02X?}", &bytes[..]),
            "HID TX"
        );
        self.transport.write_report(bytes)?;

        let delay = step.kind.settle.scale(self.options.settle_unit);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    fn validate(&self, step: &Step) -> Result<Vec<ValidationMismatch>> {
        debug!(region = %step.target, "Validating");
        let response = self.transport.read_report(self.options.read_timeout)?;
        trace!(response_hex = format_args!("{:02X?}", response), "HID RX");

        let needed = step.expected.len() * 2;
        if response.len() < needed {
            return Err(Error::ShortResponse {
                expected: needed,
                actual: response.len(),
            });
        }

        let mut mismatches = Vec::new();
        for (pair, &(setting, expected)) in response.chunks_exact(2).zip(&step.expected) {
            let actual = codec::decode(pair[0], pair[1]);
            if i32::from(actual) != expected {
                warn!(
                    region = %step.target,
                    setting = %setting,
                    expected = format_args!("0x{expected:X}"),
                    actual = format_args!("0x{actual:X}"),
                    "Read-back mismatch"
                );
                mismatches.push(ValidationMismatch {
                    target: step.target,
                    setting,
                    expected,
                    actual,
                });
            }
        }
        Ok(mismatches)
    }
}

fn init_step() -> Result<Step> {
    let kind = TransferKind::INIT;
    Ok(Step {
        kind,
        target: Target::Init,
        report: Report::build(kind.action, 0, kind.address_order, &[])?,
        expected: Vec::new(),
    })
}
