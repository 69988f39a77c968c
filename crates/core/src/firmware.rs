//! ADNS-9500 SROM firmware image and its split into LOAD_DATA reports.
//!
//! The image comes as a text listing, one hex byte per line (the format the
//! sensor vendor ships `adns9500_srom_91.txt` in). It is opaque to the host:
//! the bytes are staged in device EEPROM and the firmware uploads them to the
//! sensor at boot.

use crate::address::{firmware_chunk_address, EEPROM_SIZE};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Bytes carried by each firmware report.
pub const CHUNK_SIZE: usize = 59;

/// A firmware image in upload order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FirmwareImage {
    bytes: Vec<u8>,
}

impl FirmwareImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Parse a listing with one hex byte per line (`0x` prefix optional).
    pub fn parse(text: &str) -> Result<Self> {
        let mut bytes = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let digits = line
                .strip_prefix("0x")
                .or_else(|| line.strip_prefix("0X"))
                .unwrap_or(line);
            let value = u32::from_str_radix(digits, 16).map_err(|e| Error::Firmware {
                line: n + 1,
                message: format!("{line:?} is not a hex byte: {e}"),
            })?;
            let byte = u8::try_from(value).map_err(|_| Error::Firmware {
                line: n + 1,
                message: format!("0x{value:X} does not fit in a byte"),
            })?;
            bytes.push(byte);
        }
        debug!(len = bytes.len(), "Parsed firmware listing");
        Ok(Self { bytes })
    }

    /// Read and parse a listing file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One report's worth of firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareChunk<'a> {
    pub index: usize,
    pub address: u16,
    pub payload: &'a [u8],
}

/// Splits an image into [`CHUNK_SIZE`] pieces staged from `base` upward.
#[derive(Debug, Clone, Copy)]
pub struct FirmwareChunker<'a> {
    data: &'a [u8],
    base: u16,
}

impl<'a> FirmwareChunker<'a> {
    /// Fails if the image would run past the end of device memory.
    pub fn new(image: &'a FirmwareImage, base: u16) -> Result<Self> {
        if u32::from(base) as usize + image.len() > EEPROM_SIZE as usize {
            return Err(Error::FirmwareTooLarge {
                base,
                len: image.len(),
            });
        }
        Ok(Self {
            data: image.as_bytes(),
            base,
        })
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    /// Number of chunks, `ceil(len / CHUNK_SIZE)`.
    pub fn chunk_count(&self) -> usize {
        self.data.len().div_ceil(CHUNK_SIZE)
    }

    /// A fresh pass over the chunks. May be called any number of times.
    pub fn chunks(&self) -> Chunks<'a> {
        Chunks {
            inner: self.data.chunks(CHUNK_SIZE),
            base: self.base,
            written: 0,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &FirmwareChunker<'a> {
    type Item = FirmwareChunk<'a>;
    type IntoIter = Chunks<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks()
    }
}

/// Iterator returned by [`FirmwareChunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    inner: std::slice::Chunks<'a, u8>,
    base: u16,
    written: u32,
    index: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = FirmwareChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let payload = self.inner.next()?;
        // FirmwareChunker::new keeps every chunk inside device memory.
        let address = firmware_chunk_address(self.base, self.written).ok()?;
        let chunk = FirmwareChunk {
            index: self.index,
            address,
            payload,
        };
        self.written += payload.len() as u32;
        self.index += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}
