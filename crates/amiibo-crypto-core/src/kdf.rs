//! Per-dump key derivation (HMAC-SHA256 DRBG).
//!
//! This module provides:
//! - [`derive`] — expand a [`MasterKey`] + [`SeedInput`] into [`DerivedKeys`]
//! - [`SeedInput`] — the plaintext dump bytes that individualise the keys
//! - [`DerivedKeys`] — AES-128 key, AES-CTR IV, and HMAC key (48 bytes total)
//!
//! # Seed Construction
//!
//! ```text
//! base (64 B)  = counter (2) ‖ 00×14 ‖ uid (8) ‖ uid (8) ‖ salt (32)
//! seed         = type_string..=NUL ‖ base[..16-magic_size] ‖ magic_bytes
//!                ‖ base[16..32] ‖ (base[32..64] ⊕ xor_pad)
//! block[i]     = HMAC-SHA256(hmac_key, u16_be(i) ‖ seed)
//! output       = (block[0] ‖ block[1])[..48]
//! ```
//!
//! Any change to the counter, UID pages, or salt produces unrelated keys.

use std::fmt;

use ring::hmac;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::dump::Dump;
use crate::keys::MasterKey;
use crate::layout::{self, SALT_LEN};

/// Length of each derived key in bytes.
pub const KEY_LEN: usize = 16;

/// Total DRBG output consumed per derivation.
const OUTPUT_LEN: usize = 48;

/// HMAC-SHA256 output size.
const BLOCK_LEN: usize = 32;

/// Size of the intermediate base seed.
const BASE_SEED_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Dump bytes that feed key derivation.
///
/// Everything here is stored in the clear, so the same input is read from a
/// sealed or an unsealed dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedInput {
    /// Big-endian write counter.
    pub write_counter: [u8; 2],
    /// UID pages: UID0-2, BCC0, UID3-6.
    pub uid: [u8; 8],
    /// Keygen salt.
    pub salt: [u8; SALT_LEN],
}

impl SeedInput {
    /// Read the seed input from a dump through the layout map.
    #[must_use]
    pub fn from_dump(dump: &Dump) -> Self {
        let bytes = dump.as_bytes();
        let mut input = Self {
            write_counter: [0; 2],
            uid: [0; 8],
            salt: [0; SALT_LEN],
        };
        input
            .write_counter
            .copy_from_slice(dump.region(&layout::WRITE_COUNTER));
        input.uid.copy_from_slice(&bytes[layout::UID_PAGES]);
        input.salt.copy_from_slice(dump.region(&layout::KEYGEN_SALT));
        input
    }

    fn base_seed(&self) -> [u8; BASE_SEED_LEN] {
        let mut base = [0u8; BASE_SEED_LEN];
        base[0x00..0x02].copy_from_slice(&self.write_counter);
        base[0x10..0x18].copy_from_slice(&self.uid);
        base[0x18..0x20].copy_from_slice(&self.uid);
        base[0x20..0x40].copy_from_slice(&self.salt);
        base
    }
}

/// Keys derived for one dump state and one master key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeys {
    aes_key: [u8; KEY_LEN],
    aes_iv: [u8; KEY_LEN],
    hmac_key: [u8; KEY_LEN],
}

impl DerivedKeys {
    /// AES-128 key for the payload cipher.
    #[must_use]
    pub const fn aes_key(&self) -> &[u8; KEY_LEN] {
        &self.aes_key
    }

    /// Initial CTR counter block.
    #[must_use]
    pub const fn aes_iv(&self) -> &[u8; KEY_LEN] {
        &self.aes_iv
    }

    /// HMAC-SHA256 key for the integrity tag.
    #[must_use]
    pub const fn hmac_key(&self) -> &[u8; KEY_LEN] {
        &self.hmac_key
    }
}

impl fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKeys(***)")
    }
}

// ---------------------------------------------------------------------------
// Core KDF
// ---------------------------------------------------------------------------

/// Derive the cipher and HMAC keys for `input` under `master`.
///
/// Pure and deterministic. The prepared seed and the raw DRBG output are
/// zeroized before returning.
#[must_use]
pub fn derive(master: &MasterKey, input: &SeedInput) -> DerivedKeys {
    let mut seed = prepare_seed(master, input);
    let mut output = [0u8; OUTPUT_LEN];
    drbg(master.hmac_key(), &seed, &mut output);
    seed.zeroize();

    let mut keys = DerivedKeys {
        aes_key: [0; KEY_LEN],
        aes_iv: [0; KEY_LEN],
        hmac_key: [0; KEY_LEN],
    };
    keys.aes_key.copy_from_slice(&output[0x00..0x10]);
    keys.aes_iv.copy_from_slice(&output[0x10..0x20]);
    keys.hmac_key.copy_from_slice(&output[0x20..0x30]);
    output.zeroize();
    keys
}

/// Build the DRBG seed for `master` from the dump's base seed.
fn prepare_seed(master: &MasterKey, input: &SeedInput) -> Vec<u8> {
    let mut base = input.base_seed();
    let leading = KEY_LEN.saturating_sub(master.magic_size());

    let mut seed = Vec::with_capacity(BASE_SEED_LEN.saturating_add(BLOCK_LEN));
    seed.extend_from_slice(master.type_prefix());
    seed.extend_from_slice(&base[..leading]);
    seed.extend_from_slice(master.magic());
    seed.extend_from_slice(&base[0x10..0x20]);
    seed.extend(
        base[0x20..0x40]
            .iter()
            .zip(master.xor_pad())
            .map(|(b, pad)| b ^ pad),
    );
    base.zeroize();
    seed
}

/// Fill `out` with `HMAC(key, u16_be(i) ‖ seed)` blocks, i = 0, 1, ...
fn drbg(key: &[u8], seed: &[u8], out: &mut [u8]) {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    for (counter, chunk) in (0u16..).zip(out.chunks_mut(BLOCK_LEN)) {
        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(&counter.to_be_bytes());
        ctx.update(seed);
        let block = ctx.sign();
        chunk.copy_from_slice(&block.as_ref()[..chunk.len()]);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
