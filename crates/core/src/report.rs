//! loststone HID report encoding.
//!
//! Every message is one 65-byte output report:
//!
//! ```text
//! [0]      report ID (always 0x00)
//! [1]      action code
//! [2..=3]  target address (byte order depends on the transfer, see AddressOrder)
//! [4]      payload length
//! [5..65]  payload, zero padded
//! ```
//!
//! The firmware sees the report without byte 0, so it reads the action at
//! data[0] and the address at data[1..=2].

use crate::error::{Error, Result};
use serde::Serialize;

/// Report ID used by the device (single unnumbered report).
pub const REPORT_ID: u8 = 0x00;
/// Full report length including the report ID.
pub const REPORT_LEN: usize = 65;
/// Offset of the first payload byte.
pub const HEADER_LEN: usize = 5;
/// Largest payload a report can carry.
pub const MAX_PAYLOAD: usize = REPORT_LEN - HEADER_LEN;

/// Device-side operation selected by byte 1. Values are fixed by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Action {
    Set = 0x01,
    Get = 0x02,
    LoadData = 0x03,
    GetData = 0x04,
    Clear = 0x05,
    Init = 0x06,
}

impl Action {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Set),
            0x02 => Some(Self::Get),
            0x03 => Some(Self::LoadData),
            0x04 => Some(Self::GetData),
            0x05 => Some(Self::Clear),
            0x06 => Some(Self::Init),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Placement of the two address bytes.
///
/// Settings and profiles go out low byte first; firmware chunks go out high
/// byte first. Both orders are what the deployed firmware was written
/// against, so they must not be unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddressOrder {
    LowHigh,
    HighLow,
}

impl AddressOrder {
    fn split(self, address: u16) -> [u8; 2] {
        match self {
            Self::LowHigh => address.to_le_bytes(),
            Self::HighLow => address.to_be_bytes(),
        }
    }

    fn join(self, bytes: [u8; 2]) -> u16 {
        match self {
            Self::LowHigh => u16::from_le_bytes(bytes),
            Self::HighLow => u16::from_be_bytes(bytes),
        }
    }
}

/// One fixed-size output report.
#[derive(Clone, PartialEq, Eq)]
pub struct Report {
    buf: [u8; REPORT_LEN],
}

impl Report {
    /// Assemble a report.
    pub fn build(action: Action, address: u16, order: AddressOrder, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut buf = [0u8; REPORT_LEN];
        buf[0] = REPORT_ID;
        buf[1] = action.code();
        buf[2..4].copy_from_slice(&order.split(address));
        buf[4] = payload.len() as u8;
        buf[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
        Ok(Self { buf })
    }

    /// Raw bytes to hand to the transport.
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.buf
    }

    pub fn action(&self) -> Option<Action> {
        Action::from_byte(self.buf[1])
    }

    /// Target address, interpreted with `order`.
    pub fn address(&self, order: AddressOrder) -> u16 {
        order.join([self.buf[2], self.buf[3]])
    }

    pub fn payload_len(&self) -> usize {
        self.buf[4] as usize
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADER_LEN..HEADER_LEN + self.payload_len()]
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Report")
            .field("action", &self.action())
            .field("address", &format_args!("[{:02X} {:02X}]", self.buf[2], self.buf[3]))
            .field("payload", &format_args!("{:02X?}", self.payload()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_are_fixed() {
        assert_eq!(Action::Set.code(), 1);
        assert_eq!(Action::Get.code(), 2);
        assert_eq!(Action::LoadData.code(), 3);
        assert_eq!(Action::GetData.code(), 4);
        assert_eq!(Action::Clear.code(), 5);
        assert_eq!(Action::Init.code(), 6);
    }

    #[test]
    fn action_from_byte() {
        assert_eq!(Action::from_byte(3), Some(Action::LoadData));
        assert_eq!(Action::from_byte(0), None);
        assert_eq!(Action::from_byte(7), None);
    }

    #[test]
    fn build_low_high_report() {
        let rep = Report::build(Action::LoadData, 0x00FF, AddressOrder::LowHigh, &[0xAA, 0xBB])
            .unwrap();
        let b = rep.as_bytes();
        assert_eq!(b.len(), REPORT_LEN);
        assert_eq!(b[0], REPORT_ID);
        assert_eq!(b[1], 0x03);
        assert_eq!(b[2], 0xFF); // low
        assert_eq!(b[3], 0x00); // high
        assert_eq!(b[4], 2);
        assert_eq!(&b[5..7], &[0xAA, 0xBB]);
        assert!(b[7..].iter().all(|&x| x == 0));
    }

    #[test]
    fn build_high_low_report() {
        let rep = Report::build(Action::LoadData, 0xF03B, AddressOrder::HighLow, &[1]).unwrap();
        assert_eq!(rep.as_bytes()[2], 0xF0);
        assert_eq!(rep.as_bytes()[3], 0x3B);
        assert_eq!(rep.address(AddressOrder::HighLow), 0xF03B);
        assert_eq!(rep.address(AddressOrder::LowHigh), 0x3BF0);
    }

    #[test]
    fn empty_payload() {
        let rep = Report::build(Action::Init, 0, AddressOrder::LowHigh, &[]).unwrap();
        assert_eq!(rep.payload_len(), 0);
        assert!(rep.payload().is_empty());
        assert_eq!(rep.action(), Some(Action::Init));
    }

    #[test]
    fn full_payload_fits() {
        let payload = [0x5A; MAX_PAYLOAD];
        let rep = Report::build(Action::LoadData, 0, AddressOrder::LowHigh, &payload).unwrap();
        assert_eq!(rep.payload_len(), 60);
        assert_eq!(rep.payload(), &payload[..]);
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            Report::build(Action::LoadData, 0, AddressOrder::LowHigh, &payload),
            Err(Error::PayloadTooLarge { len: 61, max: 60 })
        ));
    }
}
