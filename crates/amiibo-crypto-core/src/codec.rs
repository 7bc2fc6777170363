//! Whole-dump open/seal pipeline.
//!
//! This module provides:
//! - [`unlock`] — derive, decrypt, and check a sealed dump
//! - [`lock`] — sign and encrypt a plaintext dump
//! - [`DumpKeys`] — both derived key sets for one dump state, reusable while
//!   the seed input is unchanged
//!
//! # Pipeline
//!
//! ```text
//! unlock: SeedInput ─▶ derive(tag), derive(data) ─▶ AES-CTR ─▶ check HMACs
//! lock:   SeedInput ─▶ derive(tag), derive(data) ─▶ sign HMACs ─▶ AES-CTR
//! ```
//!
//! Key derivation only reads plaintext-on-tag bytes, so the same
//! [`DumpKeys`] serve both directions.

use crate::cipher;
use crate::dump::Dump;
use crate::error::CryptoError;
use crate::integrity::{self, IntegrityStatus};
use crate::kdf::{self, DerivedKeys, SeedInput};
use crate::keys::AmiiboKeys;

/// Tag and data keys derived for one [`SeedInput`].
#[derive(Clone, Debug)]
pub struct DumpKeys {
    tag: DerivedKeys,
    data: DerivedKeys,
    input: SeedInput,
}

impl DumpKeys {
    /// Derive both key sets for the current state of `dump`.
    #[must_use]
    pub fn derive(keys: &AmiiboKeys, dump: &Dump) -> Self {
        let input = SeedInput::from_dump(dump);
        Self {
            tag: kdf::derive(keys.tag(), &input),
            data: kdf::derive(keys.data(), &input),
            input,
        }
    }

    /// Whether these keys are still valid for `dump`, i.e. its counter, UID
    /// pages and salt are unchanged since derivation.
    #[must_use]
    pub fn matches(&self, dump: &Dump) -> bool {
        self.input == SeedInput::from_dump(dump)
    }

    /// Keys derived from the tag master key.
    #[must_use]
    pub const fn tag(&self) -> &DerivedKeys {
        &self.tag
    }

    /// Keys derived from the data master key.
    #[must_use]
    pub const fn data(&self) -> &DerivedKeys {
        &self.data
    }

    /// The seed input these keys were derived from.
    #[must_use]
    pub const fn input(&self) -> &SeedInput {
        &self.input
    }

    /// Decrypt `sealed` and check its HMACs.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` if the cipher cannot run.
    pub fn open(&self, sealed: &Dump) -> Result<(Dump, IntegrityStatus), CryptoError> {
        let mut plain = sealed.clone();
        cipher::apply_payload(&self.data, &mut plain)?;
        let status = integrity::check(&self.tag, &self.data, &plain);
        Ok((plain, status))
    }

    /// Write fresh HMACs into `plain` and return its encrypted copy.
    ///
    /// `plain` keeps the new HMACs, so a later [`integrity::check`] on it
    /// reports `Verified`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::DecryptionFailed` if the keys no longer match
    /// `plain` or the cipher cannot run.
    pub fn seal(&self, plain: &mut Dump) -> Result<Dump, CryptoError> {
        if !self.matches(plain) {
            return Err(CryptoError::DecryptionFailed(
                "derived keys are stale for this dump".into(),
            ));
        }
        integrity::sign(&self.tag, &self.data, plain);
        let mut sealed = plain.clone();
        cipher::apply_payload(&self.data, &mut sealed)?;
        Ok(sealed)
    }
}

// ---------------------------------------------------------------------------
// One-shot helpers
// ---------------------------------------------------------------------------

/// Decrypt a sealed dump and report whether both HMACs matched.
///
/// A mismatch is not an error here: the plaintext is still returned so the
/// caller can inspect or repair it.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the cipher cannot run.
pub fn unlock(keys: &AmiiboKeys, sealed: &Dump) -> Result<(Dump, IntegrityStatus), CryptoError> {
    DumpKeys::derive(keys, sealed).open(sealed)
}

/// Decrypt a sealed dump, rejecting it unless both HMACs match.
///
/// # Errors
///
/// Returns `CryptoError::IntegrityMismatch` on a mismatch, or
/// `CryptoError::DecryptionFailed` if the cipher cannot run.
pub fn unlock_verified(keys: &AmiiboKeys, sealed: &Dump) -> Result<Dump, CryptoError> {
    let (plain, status) = unlock(keys, sealed)?;
    status.into_result()?;
    Ok(plain)
}

/// Sign and encrypt a plaintext dump, returning the sealed image.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the cipher cannot run.
pub fn lock(keys: &AmiiboKeys, plain: &Dump) -> Result<Dump, CryptoError> {
    let mut working = plain.clone();
    DumpKeys::derive(keys, &working).seal(&mut working)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MASTER_KEY_LEN;
    use crate::layout::{self, DUMP_LEN};

    fn keys() -> AmiiboKeys {
        let mut data = [0x13u8; MASTER_KEY_LEN];
        data[0x10..0x1E].copy_from_slice(b"unfixed infos\0");
        data[0x1F] = 14;
        let mut tag = [0x37u8; MASTER_KEY_LEN];
        tag[0x10..0x1E].copy_from_slice(b"locked secret\0");
        tag[0x1F] = 16;
        AmiiboKeys::from_separate(&data, &tag).expect("valid keys")
    }

    fn plain() -> Dump {
        let mut bytes = [0u8; DUMP_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = (i as u8) ^ 0x5A;
        }
        let mut dump = Dump::from_array(bytes);
        dump.set_uid(&[0x04, 1, 2, 3, 4, 5, 6]);
        dump
    }

    #[test]
    fn lock_then_unlock_verifies() {
        let sealed = lock(&keys(), &plain()).expect("lock");
        let (opened, status) = unlock(&keys(), &sealed).expect("unlock");
        assert_eq!(status, IntegrityStatus::Verified);

        let mut expected = plain();
        let dk = DumpKeys::derive(&keys(), &expected);
        integrity::sign(dk.tag(), dk.data(), &mut expected);
        assert_eq!(opened, expected);
    }

    #[test]
    fn lock_encrypts_payload_only() {
        let before = plain();
        let sealed = lock(&keys(), &before).expect("lock");
        assert_ne!(
            sealed.region(&layout::APP_AREA),
            before.region(&layout::APP_AREA)
        );
        assert_eq!(sealed.region(&layout::UID), before.region(&layout::UID));
        assert_eq!(
            sealed.region(&layout::KEYGEN_SALT),
            before.region(&layout::KEYGEN_SALT)
        );
    }

    #[test]
    fn seal_is_idempotent() {
        let dk = DumpKeys::derive(&keys(), &plain());
        let mut working = plain();
        let first = dk.seal(&mut working).expect("first seal");
        let second = dk.seal(&mut working).expect("second seal");
        assert_eq!(first, second);
    }

    #[test]
    fn stale_keys_are_rejected() {
        let dk = DumpKeys::derive(&keys(), &plain());
        let mut changed = plain();
        changed.as_bytes_mut()[0x012] ^= 0x01;
        assert!(!dk.matches(&changed));
        assert!(dk.seal(&mut changed).is_err());
    }

    #[test]
    fn payload_edit_is_detected() {
        let mut sealed = lock(&keys(), &plain()).expect("lock");
        sealed.as_bytes_mut()[0x150] ^= 0x20;
        let (_, status) = unlock(&keys(), &sealed).expect("unlock");
        assert_eq!(
            status,
            IntegrityStatus::Mismatch {
                tag_ok: true,
                data_ok: false
            }
        );
        assert!(matches!(
            unlock_verified(&keys(), &sealed),
            Err(CryptoError::IntegrityMismatch {
                tag: true,
                data: false
            })
        ));
    }
}
