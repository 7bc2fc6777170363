//! NTAG215 amiibo binary layout — the single source of truth for offsets.
//!
//! This module provides:
//! - [`REGIONS`] — every byte of the 540-byte dump, in page order
//! - [`PAYLOAD_FIELDS`] — the sub-layout of the decrypted data area
//! - the range lists consumed by the key derivation, cipher, and HMAC code
//!
//! # Dump Layout (on-tag page order)
//!
//! ```text
//! 0x000 UID0-2 BCC0 UID3-6 BCC1 | int | lock | CC
//! 0x010 A5 | write counter (BE) | version | settings (enc, 32 B)
//! 0x034 tag HMAC (32 B)
//! 0x054 model info (12 B) | keygen salt (32 B)
//! 0x080 data HMAC (32 B)
//! 0x0A0 application area (enc, 360 B)
//! 0x208 dynamic lock | CFG0 | CFG1 | PWD | PACK
//! ```
//!
//! No other module hard-codes an offset; everything is expressed in terms of
//! the [`Region`] constants below.

use std::ops::Range;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Full NTAG215 image size: 135 pages of 4 bytes.
pub const DUMP_LEN: usize = 540;

/// Image size without the dynamic lock and configuration pages.
pub const UNPADDED_LEN: usize = 520;

/// Image size with configuration pages but without PWD/PACK.
pub const NO_PASSWORD_LEN: usize = 532;

/// Size of each HMAC slot.
pub const HMAC_LEN: usize = 32;

/// Size of the keygen salt.
pub const SALT_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a region is stored on the tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionKind {
    /// Stored in the clear on the tag.
    Plain,
    /// Covered by the AES-CTR payload cipher.
    Encrypted,
    /// HMAC-SHA256 slot.
    Signature,
}

/// A named, fixed byte range of the dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Stable identifier.
    pub name: &'static str,
    /// Absolute byte offset into the 540-byte dump.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
    /// Storage class.
    pub kind: RegionKind,
}

impl Region {
    const fn new(name: &'static str, offset: usize, len: usize, kind: RegionKind) -> Self {
        Self {
            name,
            offset,
            len,
            kind,
        }
    }

    /// Exclusive end offset.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset.saturating_add(self.len)
    }

    /// Byte range suitable for slicing.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Whether `offset` falls inside this region.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

// ---------------------------------------------------------------------------
// Top-level regions
// ---------------------------------------------------------------------------

/// UID0-2, BCC0, UID3-6, BCC1.
pub const UID: Region = Region::new("uid", 0x000, 9, RegionKind::Plain);
/// Manufacturer "internal" byte.
pub const INTERNAL: Region = Region::new("internal", 0x009, 1, RegionKind::Plain);
/// Static lock bytes.
pub const STATIC_LOCK: Region = Region::new("staticLock", 0x00A, 2, RegionKind::Plain);
/// NDEF capability container.
pub const CAPABILITY_CONTAINER: Region =
    Region::new("capabilityContainer", 0x00C, 4, RegionKind::Plain);
/// Constant `0xA5` marking an initialised amiibo.
pub const DATA_MAGIC: Region = Region::new("dataMagic", 0x010, 1, RegionKind::Plain);
/// Big-endian write counter; the per-write nonce fed to key derivation.
pub const WRITE_COUNTER: Region = Region::new("writeCounter", 0x011, 2, RegionKind::Plain);
/// Data format version.
pub const FORMAT_VERSION: Region = Region::new("formatVersion", 0x013, 1, RegionKind::Plain);
/// Encrypted settings block (flags, dates, nickname).
pub const SETTINGS: Region = Region::new("settings", 0x014, 32, RegionKind::Encrypted);
/// HMAC over the UID and model info.
pub const TAG_HMAC: Region = Region::new("tagHmac", 0x034, HMAC_LEN, RegionKind::Signature);
/// Character / variant / series identification.
pub const MODEL_INFO: Region = Region::new("modelInfo", 0x054, 12, RegionKind::Plain);
/// Random salt fed to key derivation.
pub const KEYGEN_SALT: Region = Region::new("keygenSalt", 0x060, SALT_LEN, RegionKind::Plain);
/// HMAC over the whole decrypted record.
pub const DATA_HMAC: Region = Region::new("dataHmac", 0x080, HMAC_LEN, RegionKind::Signature);
/// Encrypted owner Mii, application header, and application data.
pub const APP_AREA: Region = Region::new("appArea", 0x0A0, 360, RegionKind::Encrypted);
/// Dynamic lock bytes + RFUI.
pub const DYNAMIC_LOCK: Region = Region::new("dynamicLock", 0x208, 4, RegionKind::Plain);
/// Configuration page 0 (MIRROR, AUTH0).
pub const CFG0: Region = Region::new("cfg0", 0x20C, 4, RegionKind::Plain);
/// Configuration page 1 (ACCESS).
pub const CFG1: Region = Region::new("cfg1", 0x210, 4, RegionKind::Plain);
/// 32-bit tag password.
pub const PASSWORD: Region = Region::new("password", 0x214, 4, RegionKind::Plain);
/// Password acknowledge + RFUI.
pub const PACK: Region = Region::new("pack", 0x218, 4, RegionKind::Plain);

/// Every region of the dump in ascending offset order.
///
/// The table tiles `0..DUMP_LEN` with no gaps and no overlaps.
pub const REGIONS: [Region; 18] = [
    UID,
    INTERNAL,
    STATIC_LOCK,
    CAPABILITY_CONTAINER,
    DATA_MAGIC,
    WRITE_COUNTER,
    FORMAT_VERSION,
    SETTINGS,
    TAG_HMAC,
    MODEL_INFO,
    KEYGEN_SALT,
    DATA_HMAC,
    APP_AREA,
    DYNAMIC_LOCK,
    CFG0,
    CFG1,
    PASSWORD,
    PACK,
];

// ---------------------------------------------------------------------------
// Decrypted payload sub-layout
// ---------------------------------------------------------------------------

/// Settings flags (bit 4: owner/nickname registered, bit 5: app data present).
pub const SETTINGS_FLAGS: Region = Region::new("settingsFlags", 0x014, 1, RegionKind::Encrypted);
/// Owner console region / country code.
pub const COUNTRY_CODE: Region = Region::new("countryCode", 0x015, 1, RegionKind::Encrypted);
/// Counter bumped on each CRC update (u16 BE).
pub const CRC_COUNTER: Region = Region::new("crcCounter", 0x016, 2, RegionKind::Encrypted);
/// Packed initial registration date (u16 BE).
pub const SETUP_DATE: Region = Region::new("setupDate", 0x018, 2, RegionKind::Encrypted);
/// Packed last write date (u16 BE).
pub const LAST_WRITE_DATE: Region = Region::new("lastWriteDate", 0x01A, 2, RegionKind::Encrypted);
/// Settings CRC32.
pub const SETTINGS_CRC: Region = Region::new("settingsCrc", 0x01C, 4, RegionKind::Encrypted);
/// Amiibo nickname, 10 UTF-16BE code units.
pub const NICKNAME: Region = Region::new("nickname", 0x020, 20, RegionKind::Encrypted);
/// 64-bit amiibo identifier (BE) at the start of the model info.
pub const AMIIBO_ID: Region = Region::new("amiiboId", 0x054, 8, RegionKind::Plain);
/// Owner Mii record.
pub const OWNER_MII: Region = Region::new("ownerMii", 0x0A0, 96, RegionKind::Encrypted);
/// Owner Mii name, 10 UTF-16LE code units.
pub const OWNER_NAME: Region = Region::new("ownerName", 0x0BA, 20, RegionKind::Encrypted);
/// Title id of the application that owns the app data (u64 BE).
pub const TITLE_ID: Region = Region::new("titleId", 0x100, 8, RegionKind::Encrypted);
/// Application data write counter (u16 BE).
pub const APP_WRITE_COUNTER: Region =
    Region::new("appWriteCounter", 0x108, 2, RegionKind::Encrypted);
/// Application id (u32 BE).
pub const APP_ID: Region = Region::new("appId", 0x10A, 4, RegionKind::Encrypted);
/// Application-specific memory.
pub const APP_DATA: Region = Region::new("appData", 0x130, 216, RegionKind::Encrypted);

/// Named sub-fields of the decrypted record.
pub const PAYLOAD_FIELDS: [Region; 14] = [
    SETTINGS_FLAGS,
    COUNTRY_CODE,
    CRC_COUNTER,
    SETUP_DATE,
    LAST_WRITE_DATE,
    SETTINGS_CRC,
    NICKNAME,
    AMIIBO_ID,
    OWNER_MII,
    OWNER_NAME,
    TITLE_ID,
    APP_WRITE_COUNTER,
    APP_ID,
    APP_DATA,
];

// ---------------------------------------------------------------------------
// Crypto coverage
// ---------------------------------------------------------------------------

/// UID bytes as stored in pages 0-1 (excludes BCC1); fed to KDF and HMACs.
pub const UID_PAGES: Range<usize> = 0x000..0x008;

/// Model info + keygen salt; covered by both HMACs.
pub const MODEL_AND_SALT: Range<usize> = 0x054..0x080;

/// Segments encrypted by one continuous keystream, in keystream order.
pub const ENCRYPTED_SEGMENTS: [Region; 2] = [SETTINGS, APP_AREA];

/// Total keystream length.
pub const ENCRYPTED_LEN: usize = 0x188;

/// Inputs to the tag HMAC, in hashing order.
pub const TAG_HMAC_INPUT: [Range<usize>; 2] = [UID_PAGES, MODEL_AND_SALT];

/// Inputs to the data HMAC that precede the tag HMAC value.
///
/// The full message is these ranges, then the freshly computed tag HMAC,
/// then [`TAG_HMAC_INPUT`].
pub const DATA_HMAC_PREFIX: [Range<usize>; 2] = [0x011..0x034, 0x0A0..0x208];

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find a top-level region or payload field by name.
#[must_use]
pub fn region(name: &str) -> Option<&'static Region> {
    REGIONS
        .iter()
        .chain(PAYLOAD_FIELDS.iter())
        .find(|r| r.name == name)
}

/// Find the top-level region containing `offset`.
#[must_use]
pub fn region_at(offset: usize) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.contains(offset))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
