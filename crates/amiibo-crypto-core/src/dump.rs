//! The 540-byte amiibo record.
//!
//! A [`Dump`] is layout-agnostic storage: whether its payload is currently
//! encrypted is tracked by the caller (see [`crate::codec`]). Accessors are
//! expressed through [`crate::layout`] regions.

use std::fmt;

use crate::error::CryptoError;
use crate::layout::{self, Region, DUMP_LEN, NO_PASSWORD_LEN, UNPADDED_LEN};

/// NXP manufacturer code; the first UID byte of every NTAG215.
pub const NXP_MANUFACTURER_ID: u8 = 0x04;

/// ISO 14443-3 cascade tag folded into BCC0.
pub const CASCADE_TAG: u8 = 0x88;

/// Length of the 7-byte NFC UID (without check bytes).
pub const UID_LEN: usize = 7;

/// First check byte: `CT ^ UID0 ^ UID1 ^ UID2`.
#[must_use]
pub const fn bcc0(uid: &[u8; UID_LEN]) -> u8 {
    CASCADE_TAG ^ uid[0] ^ uid[1] ^ uid[2]
}

/// Second check byte: `UID3 ^ UID4 ^ UID5 ^ UID6`.
#[must_use]
pub const fn bcc1(uid: &[u8; UID_LEN]) -> u8 {
    uid[3] ^ uid[4] ^ uid[5] ^ uid[6]
}

/// A full NTAG215 image in on-tag page order.
#[derive(Clone, PartialEq, Eq)]
pub struct Dump {
    bytes: [u8; DUMP_LEN],
}

impl Dump {
    /// Wrap an exact 540-byte image.
    #[must_use]
    pub const fn from_array(bytes: [u8; DUMP_LEN]) -> Self {
        Self { bytes }
    }

    /// Parse a dump file.
    ///
    /// Accepts 540-byte images, plus 520- and 532-byte images whose missing
    /// trailing pages are zero-filled.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` for any other length.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CryptoError> {
        match data.len() {
            UNPADDED_LEN | NO_PASSWORD_LEN | DUMP_LEN => {
                let mut bytes = [0u8; DUMP_LEN];
                bytes[..data.len()].copy_from_slice(data);
                Ok(Self { bytes })
            }
            other => Err(CryptoError::DecryptionFailed(format!(
                "dump is {other} bytes (expected {UNPADDED_LEN}, {NO_PASSWORD_LEN} or {DUMP_LEN})"
            ))),
        }
    }

    /// Borrow the raw image.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DUMP_LEN] {
        &self.bytes
    }

    /// Mutably borrow the raw image.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; DUMP_LEN] {
        &mut self.bytes
    }

    /// Copy the image out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Borrow one region.
    #[must_use]
    pub fn region(&self, region: &Region) -> &[u8] {
        &self.bytes[region.range()]
    }

    /// Mutably borrow one region.
    pub fn region_mut(&mut self, region: &Region) -> &mut [u8] {
        &mut self.bytes[region.range()]
    }

    // -- UID ----------------------------------------------------------------

    /// The 7-byte UID with check bytes stripped.
    #[must_use]
    pub fn uid(&self) -> [u8; UID_LEN] {
        let b = &self.bytes;
        [b[0], b[1], b[2], b[4], b[5], b[6], b[7]]
    }

    /// Store a UID and recompute BCC0/BCC1.
    pub fn set_uid(&mut self, uid: &[u8; UID_LEN]) {
        let area = self.region_mut(&layout::UID);
        area[0..3].copy_from_slice(&uid[0..3]);
        area[3] = bcc0(uid);
        area[4..8].copy_from_slice(&uid[3..7]);
        area[8] = bcc1(uid);
    }

    /// Whether BCC0 and BCC1 agree with the stored UID.
    #[must_use]
    pub fn uid_checksums_valid(&self) -> bool {
        let uid = self.uid();
        let area = self.region(&layout::UID);
        area[3] == bcc0(&uid) && area[8] == bcc1(&uid)
    }

    /// UID formatted as upper-case hex, no separators.
    #[must_use]
    pub fn uid_hex(&self) -> String {
        self.uid().iter().map(|b| format!("{b:02X}")).collect()
    }

    // -- Header fields ------------------------------------------------------

    /// The big-endian write counter.
    #[must_use]
    pub fn write_counter(&self) -> u16 {
        let r = self.region(&layout::WRITE_COUNTER);
        u16::from_be_bytes([r[0], r[1]])
    }

    /// The 64-bit amiibo identifier.
    #[must_use]
    pub fn amiibo_id(&self) -> u64 {
        let mut id = [0u8; 8];
        id.copy_from_slice(self.region(&layout::AMIIBO_ID));
        u64::from_be_bytes(id)
    }

    /// Whether the data-area marker byte is set.
    #[must_use]
    pub fn has_data_magic(&self) -> bool {
        self.region(&layout::DATA_MAGIC)[0] == 0xA5
    }
}

impl From<[u8; DUMP_LEN]> for Dump {
    fn from(bytes: [u8; DUMP_LEN]) -> Self {
        Self::from_array(bytes)
    }
}

impl AsRef<[u8]> for Dump {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Dump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dump")
            .field("uid", &self.uid_hex())
            .field("amiibo_id", &format_args!("{:016X}", self.amiibo_id()))
            .field("write_counter", &self.write_counter())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
