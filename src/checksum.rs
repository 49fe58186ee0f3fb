//! CRC-32 values and the streaming engine that computes them.
//!
//! # Algorithm
//! Standard CRC-32 (IEEE 802.3): reflected polynomial `0xEDB88320`, initial
//! value `0xFFFFFFFF`, final XOR `0xFFFFFFFF`.  Results are bit-identical to
//! `zlib.crc32`, `cksfv`, 7-Zip and friends.  The empty input hashes to
//! `0x00000000`.
//!
//! # Text form
//! A [`Checksum`] is always written as exactly 8 hex digits.  Parsing accepts
//! either case; display is upper case, so two checksums that differ only in
//! hex-digit case compare equal.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use crc32fast::Hasher;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Read buffer used while streaming a file through the hasher.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Number of hex digits in the text form of a checksum.
pub const HEX_DIGITS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("expected {HEX_DIGITS} hex digits, found {0} characters")]
    InvalidLength(usize),
    #[error("invalid hex digit in {0:?}")]
    InvalidDigit(String),
}

// ── Checksum ─────────────────────────────────────────────────────────────────

/// A 32-bit CRC value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checksum(pub u32);

impl Checksum {
    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Parse exactly 8 hex digits, either case.
    pub fn from_hex(text: &str) -> Result<Self, ChecksumError> {
        if text.len() != HEX_DIGITS {
            return Err(ChecksumError::InvalidLength(text.chars().count()));
        }
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|_| ChecksumError::InvalidDigit(text.to_owned()))?;
        Ok(Checksum(u32::from_be_bytes(bytes)))
    }

    /// Upper-case 8-digit text form.
    pub fn to_hex(self) -> String {
        hex::encode_upper(self.0.to_be_bytes())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl FromStr for Checksum {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Checksum::from_hex(s)
    }
}

impl From<u32> for Checksum {
    fn from(v: u32) -> Self {
        Checksum(v)
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Stream `reader` to EOF and return its CRC-32.
///
/// Memory use is one fixed buffer regardless of input size.  Any read error
/// other than `Interrupted` aborts the computation; no partial checksum is
/// ever returned.
pub fn compute<R: Read>(mut reader: R) -> io::Result<Checksum> {
    let mut hasher = Hasher::new();
    let mut buf    = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0)  => break,
            Ok(n)  => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(Checksum(hasher.finalize()))
}

/// Open `path` read-only and stream it through [`compute`].
pub fn compute_file<P: AsRef<Path>>(path: P) -> io::Result<Checksum> {
    compute(File::open(path)?)
}

/// CRC-32 of an in-memory buffer.
pub fn checksum_bytes(data: &[u8]) -> Checksum {
    Checksum(crc32fast::hash(data))
}
