//! HMAC-SHA256 integrity tags.
//!
//! This module provides:
//! - [`tag_hmac`] — the tag HMAC over the UID pages, model info and salt
//! - [`data_hmac`] — the data HMAC over the plaintext record
//! - [`check`] / [`verify`] — constant-time comparison against stored values
//! - [`sign`] — write both HMACs into a plaintext dump
//!
//! # Message Layout
//!
//! ```text
//! tag  = HMAC(tag.hmac_key,  dump[0x000..0x008] ‖ dump[0x054..0x080])
//! data = HMAC(data.hmac_key, dump[0x011..0x034] ‖ dump[0x0A0..0x208]
//!                            ‖ tag ‖ dump[0x000..0x008] ‖ dump[0x054..0x080])
//! ```
//!
//! The data HMAC embeds the freshly computed tag HMAC, not the stored one,
//! so the tag HMAC must always be produced first. Both are computed over
//! plaintext.

use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::dump::Dump;
use crate::error::CryptoError;
use crate::kdf::DerivedKeys;
use crate::layout::{self, DATA_HMAC_PREFIX, HMAC_LEN, TAG_HMAC_INPUT};

/// Outcome of comparing both stored HMACs against recomputed values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntegrityStatus {
    /// Both HMACs matched.
    Verified,
    /// At least one HMAC differed. Each flag is `true` when that HMAC matched.
    #[serde(rename_all = "camelCase")]
    Mismatch {
        /// Tag HMAC matched.
        tag_ok: bool,
        /// Data HMAC matched.
        data_ok: bool,
    },
}

impl IntegrityStatus {
    /// Whether both HMACs matched.
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }

    /// Convert to a `Result`, mapping a mismatch to
    /// `CryptoError::IntegrityMismatch`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::IntegrityMismatch` unless verified.
    pub fn into_result(self) -> Result<(), CryptoError> {
        match self {
            Self::Verified => Ok(()),
            Self::Mismatch { tag_ok, data_ok } => Err(CryptoError::IntegrityMismatch {
                tag: tag_ok,
                data: data_ok,
            }),
        }
    }
}

/// Constant-time byte comparison.
///
/// Returns `true` iff both slices have equal length and identical contents.
/// HMAC lengths are public, so the early length check leaks nothing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn finish(ctx: hmac::Context) -> [u8; HMAC_LEN] {
    let mut out = [0u8; HMAC_LEN];
    out.copy_from_slice(ctx.sign().as_ref());
    out
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute the tag HMAC of a dump.
///
/// Only plaintext-on-tag bytes are covered, so the result is the same
/// whether `dump` is currently encrypted or not.
#[must_use]
pub fn tag_hmac(tag_keys: &DerivedKeys, dump: &Dump) -> [u8; HMAC_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, tag_keys.hmac_key());
    let mut ctx = hmac::Context::with_key(&key);
    for range in TAG_HMAC_INPUT {
        ctx.update(&dump.as_bytes()[range]);
    }
    finish(ctx)
}

/// Compute the data HMAC of a plaintext dump, given its tag HMAC.
#[must_use]
pub fn data_hmac(data_keys: &DerivedKeys, dump: &Dump, tag_hmac: &[u8; HMAC_LEN]) -> [u8; HMAC_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, data_keys.hmac_key());
    let mut ctx = hmac::Context::with_key(&key);
    for range in DATA_HMAC_PREFIX {
        ctx.update(&dump.as_bytes()[range]);
    }
    ctx.update(tag_hmac);
    for range in TAG_HMAC_INPUT {
        ctx.update(&dump.as_bytes()[range]);
    }
    finish(ctx)
}

// ---------------------------------------------------------------------------
// Verification and signing
// ---------------------------------------------------------------------------

/// Compare the stored HMACs of a plaintext dump against recomputed values.
#[must_use]
pub fn check(tag_keys: &DerivedKeys, data_keys: &DerivedKeys, dump: &Dump) -> IntegrityStatus {
    let tag = tag_hmac(tag_keys, dump);
    let data = data_hmac(data_keys, dump, &tag);

    let tag_ok = constant_time_eq(&tag, dump.region(&layout::TAG_HMAC));
    let data_ok = constant_time_eq(&data, dump.region(&layout::DATA_HMAC));
    if tag_ok && data_ok {
        IntegrityStatus::Verified
    } else {
        IntegrityStatus::Mismatch { tag_ok, data_ok }
    }
}

/// Verify both stored HMACs of a plaintext dump.
///
/// # Errors
///
/// Returns `CryptoError::IntegrityMismatch` naming which HMAC(s) matched.
pub fn verify(tag_keys: &DerivedKeys, data_keys: &DerivedKeys, dump: &Dump) -> Result<(), CryptoError> {
    check(tag_keys, data_keys, dump).into_result()
}

/// Recompute both HMACs of a plaintext dump and store them.
///
/// The tag HMAC is written first; the data HMAC depends on it.
pub fn sign(tag_keys: &DerivedKeys, data_keys: &DerivedKeys, dump: &mut Dump) {
    let tag = tag_hmac(tag_keys, dump);
    dump.region_mut(&layout::TAG_HMAC).copy_from_slice(&tag);
    let data = data_hmac(data_keys, dump, &tag);
    dump.region_mut(&layout::DATA_HMAC).copy_from_slice(&data);
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
