//! AES-128-CTR payload cipher.
//!
//! This module provides:
//! - [`apply`] — transform a buffer, returning a new one
//! - [`apply_in_place`] — transform a buffer in place
//! - [`apply_payload`] — transform the encrypted regions of a [`Dump`]
//!
//! CTR mode is an involution: the same call encrypts and decrypts. The
//! counter block starts at the derived IV and increments as one 128-bit
//! big-endian integer. The payload keystream runs continuously across both
//! encrypted regions (settings, then application area) with no restart.

use aes::cipher::{KeyIvInit, StreamCipher};

use crate::dump::Dump;
use crate::error::CryptoError;
use crate::kdf::DerivedKeys;
use crate::layout::ENCRYPTED_SEGMENTS;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

fn keystream(keys: &DerivedKeys) -> Result<Aes128Ctr, CryptoError> {
    Aes128Ctr::new_from_slices(keys.aes_key(), keys.aes_iv())
        .map_err(|_| CryptoError::DecryptionFailed("invalid AES-CTR key or IV length".into()))
}

/// Encrypt or decrypt `data` under `keys`, returning the transformed copy.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the keystream cannot be
/// produced for the buffer length.
pub fn apply(keys: &DerivedKeys, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut out = data.to_vec();
    apply_in_place(keys, &mut out)?;
    Ok(out)
}

/// Encrypt or decrypt `data` in place.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the keystream cannot be
/// produced for the buffer length.
pub fn apply_in_place(keys: &DerivedKeys, data: &mut [u8]) -> Result<(), CryptoError> {
    keystream(keys)?
        .try_apply_keystream(data)
        .map_err(|_| CryptoError::DecryptionFailed("AES-CTR keystream exhausted".into()))
}

/// Encrypt or decrypt the settings and application regions of `dump`.
///
/// Bytes outside those regions are untouched.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if the keystream cannot be
/// produced.
pub fn apply_payload(keys: &DerivedKeys, dump: &mut Dump) -> Result<(), CryptoError> {
    let mut stream = keystream(keys)?;
    for segment in &ENCRYPTED_SEGMENTS {
        stream
            .try_apply_keystream(dump.region_mut(segment))
            .map_err(|_| CryptoError::DecryptionFailed("AES-CTR keystream exhausted".into()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
