//! Master key records (`unfixed-info.bin`, `locked-secret.bin`, `key_retail.bin`).
//!
//! Each master key is an 80-byte record:
//!
//! ```text
//! hmac_key (16) | type_string (14) | rfu (1) | magic_size (1) | magic_bytes (16) | xor_pad (32)
//! ```
//!
//! The combined retail file is `data ‖ tag` (160 bytes). Key bytes are zeroized
//! on drop and never printed.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Length of one master key record.
pub const MASTER_KEY_LEN: usize = 80;

/// Length of the combined data + tag key file.
pub const COMBINED_KEYS_LEN: usize = 160;

/// Type string of the data-area master key.
pub const DATA_KEY_TYPE: &[u8] = b"unfixed infos";

/// Type string of the tag-area master key.
pub const TAG_KEY_TYPE: &[u8] = b"locked secret";

/// Largest valid `magic_size`.
const MAX_MAGIC_SIZE: u8 = 16;

// ---------------------------------------------------------------------------
// MasterKey
// ---------------------------------------------------------------------------

/// Which derivation a master key serves, as declared by its type string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRole {
    /// Derives the payload cipher key and the data HMAC key.
    Data,
    /// Derives the tag HMAC key.
    Tag,
}

/// One parsed 80-byte key-derivation seed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    hmac_key: [u8; 16],
    type_string: [u8; 14],
    magic_size: u8,
    magic_bytes: [u8; 16],
    xor_pad: [u8; 32],
}

impl MasterKey {
    /// Parse an 80-byte master key record.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyMaterialMalformed` if the input is not 80 bytes
    /// or declares more than 16 magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != MASTER_KEY_LEN {
            return Err(CryptoError::KeyMaterialMalformed(format!(
                "master key is {} bytes (expected {MASTER_KEY_LEN})",
                bytes.len()
            )));
        }

        let magic_size = bytes[0x1F];
        if magic_size > MAX_MAGIC_SIZE {
            return Err(CryptoError::KeyMaterialMalformed(format!(
                "magic size {magic_size} exceeds {MAX_MAGIC_SIZE}"
            )));
        }

        let mut key = Self {
            hmac_key: [0; 16],
            type_string: [0; 14],
            magic_size,
            magic_bytes: [0; 16],
            xor_pad: [0; 32],
        };
        key.hmac_key.copy_from_slice(&bytes[0x00..0x10]);
        key.type_string.copy_from_slice(&bytes[0x10..0x1E]);
        key.magic_bytes.copy_from_slice(&bytes[0x20..0x30]);
        key.xor_pad.copy_from_slice(&bytes[0x30..0x50]);
        Ok(key)
    }

    /// The type string without its NUL terminator.
    #[must_use]
    pub fn type_name(&self) -> &[u8] {
        let end = self
            .type_string
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.type_string.len());
        &self.type_string[..end]
    }

    /// Role declared by the type string, if recognised.
    #[must_use]
    pub fn role(&self) -> Option<KeyRole> {
        match self.type_name() {
            DATA_KEY_TYPE => Some(KeyRole::Data),
            TAG_KEY_TYPE => Some(KeyRole::Tag),
            _ => None,
        }
    }

    /// Type string up to and including the first NUL (all 14 bytes if none).
    pub(crate) fn type_prefix(&self) -> &[u8] {
        let end = self
            .type_string
            .iter()
            .position(|&b| b == 0)
            .map_or(self.type_string.len(), |p| p.saturating_add(1));
        &self.type_string[..end]
    }

    pub(crate) const fn hmac_key(&self) -> &[u8; 16] {
        &self.hmac_key
    }

    pub(crate) fn magic(&self) -> &[u8] {
        &self.magic_bytes[..self.magic_size()]
    }

    pub(crate) fn magic_size(&self) -> usize {
        usize::from(self.magic_size)
    }

    pub(crate) const fn xor_pad(&self) -> &[u8; 32] {
        &self.xor_pad
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MasterKey({}, ***)",
            String::from_utf8_lossy(self.type_name())
        )
    }
}

// ---------------------------------------------------------------------------
// AmiiboKeys
// ---------------------------------------------------------------------------

/// The pair of master keys needed to open and seal a dump.
#[derive(Clone, Debug)]
pub struct AmiiboKeys {
    data: MasterKey,
    tag: MasterKey,
}

impl AmiiboKeys {
    /// Pair two already-parsed master keys.
    #[must_use]
    pub const fn new(data: MasterKey, tag: MasterKey) -> Self {
        Self { data, tag }
    }

    /// Parse a combined 160-byte `key_retail.bin` (data key first).
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyMaterialMalformed` on a length mismatch or a
    /// malformed half.
    pub fn from_combined(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != COMBINED_KEYS_LEN {
            return Err(CryptoError::KeyMaterialMalformed(format!(
                "combined key file is {} bytes (expected {COMBINED_KEYS_LEN})",
                bytes.len()
            )));
        }
        let (data, tag) = bytes.split_at(MASTER_KEY_LEN);
        Ok(Self {
            data: MasterKey::from_bytes(data)?,
            tag: MasterKey::from_bytes(tag)?,
        })
    }

    /// Parse the separate `unfixed-info.bin` and `locked-secret.bin` files.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyMaterialMalformed` if either file is malformed.
    pub fn from_separate(unfixed_info: &[u8], locked_secret: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            data: MasterKey::from_bytes(unfixed_info)?,
            tag: MasterKey::from_bytes(locked_secret)?,
        })
    }

    /// The data-area master key.
    #[must_use]
    pub const fn data(&self) -> &MasterKey {
        &self.data
    }

    /// The tag-area master key.
    #[must_use]
    pub const fn tag(&self) -> &MasterKey {
        &self.tag
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
