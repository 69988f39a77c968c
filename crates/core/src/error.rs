//! Error types for loststone-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected before any device I/O. Holds every problem found.
    #[error("invalid configuration: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),

    /// Value cannot be represented on the wire.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Report payload larger than the report can carry.
    #[error("payload too large: {len} bytes (maximum {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Malformed firmware listing.
    #[error("firmware listing line {line}: {message}")]
    Firmware { line: usize, message: String },

    /// Firmware image would run past the end of the device address space.
    #[error("firmware image of {len} bytes at 0x{base:04X} does not fit in device memory")]
    FirmwareTooLarge { base: u16, len: usize },

    /// Reading a configuration or firmware file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// Read-back timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Read-back buffer shorter than the data being validated.
    #[error("short response: got {actual} bytes, expected at least {expected}")]
    ShortResponse { expected: usize, actual: usize },

    /// One or more fields did not read back as written.
    #[error("{count} field(s) failed read-back validation")]
    ValidationFailed { count: usize },

    /// Transfer stopped between reports on request.
    #[error("transfer cancelled")]
    Cancelled,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
