//! loststone-core: HID wire protocol, settings model, and device programming.
//!
//! This crate provides the host-side logic for provisioning a loststone
//! trackball: settings and per-profile overrides are serialized into 16-bit
//! words, written into the device EEPROM with LOAD_DATA reports and read back
//! for validation; the ADNS-9500 sensor firmware is staged in 59-byte chunks.

pub mod address;
pub mod codec;
pub mod config;
pub mod error;
pub mod firmware;
pub mod profile;
pub mod report;
pub mod safety;
pub mod settings;
pub mod transfer;
pub mod transport;

pub use config::LoststoneConfig;
pub use error::{Error, Result};
pub use profile::DeviceModel;
pub use transfer::{Programmer, TransferOptions, TransferReport};
