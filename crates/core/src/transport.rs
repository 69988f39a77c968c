//! HID transport abstraction for device communication.
//!
//! The protocol only needs a blocking write and a blocking read with timeout,
//! so real hidapi handles and the simulated device share this trait.

use crate::error::Result;
use std::time::Duration;

/// Abstraction over raw HID read/write.
pub trait HidTransport: Send {
    /// Write one output report, report ID included.
    fn write_report(&self, data: &[u8]) -> Result<()>;

    /// Block until an input report arrives or `timeout` elapses.
    ///
    /// A timeout is an error (`Error::Timeout`), never an empty buffer.
    fn read_report(&self, timeout: Duration) -> Result<Vec<u8>>;
}
