#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Golden-file Known-Answer Tests.
//!
//! `tests/fixtures/` holds synthetic master keys and a 540-byte record sealed
//! by an independent reference implementation. `sample_plain.bin` is the same
//! record before encryption, with both HMACs already written. Every value
//! below was produced by that implementation, not by this crate.

use amiibo_crypto_core::integrity::{self, IntegrityStatus};
use amiibo_crypto_core::kdf::{derive, SeedInput};
use amiibo_crypto_core::layout;
use amiibo_crypto_core::{cipher, lock, unlock, AmiiboKeys, Dump, DumpKeys};

const KEYS: &[u8] = include_bytes!("fixtures/test_keys.bin");
const SEALED: &[u8] = include_bytes!("fixtures/sample_dump.bin");
const PLAIN: &[u8] = include_bytes!("fixtures/sample_plain.bin");

fn from_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn keys() -> AmiiboKeys {
    AmiiboKeys::from_combined(KEYS).expect("fixture keys should parse")
}

fn sealed() -> Dump {
    Dump::from_bytes(SEALED).expect("fixture dump should parse")
}

fn plain() -> Dump {
    Dump::from_bytes(PLAIN).expect("fixture plaintext should parse")
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn data_key_derivation() {
    let derived = derive(keys().data(), &SeedInput::from_dump(&sealed()));
    assert_eq!(
        derived.aes_key().as_slice(),
        from_hex("5c377f6dfcd0c0970557695d0848fdbc")
    );
    assert_eq!(
        derived.aes_iv().as_slice(),
        from_hex("5f0985ecc30d58d88c0acd8743c62d5e")
    );
    assert_eq!(
        derived.hmac_key().as_slice(),
        from_hex("a2a2b4c647c591e634d1f83b1882e0bc")
    );
}

#[test]
fn tag_key_derivation() {
    let derived = derive(keys().tag(), &SeedInput::from_dump(&sealed()));
    assert_eq!(
        derived.aes_key().as_slice(),
        from_hex("26f6e6c306a4fa0f6e7cae123d130562")
    );
    assert_eq!(
        derived.aes_iv().as_slice(),
        from_hex("b8c5371883e61956288a0366139a7b61")
    );
    assert_eq!(
        derived.hmac_key().as_slice(),
        from_hex("7852ffd13ce007e2bcab44a673f3d33b")
    );
}

#[test]
fn seed_input_is_the_same_sealed_or_plain() {
    assert_eq!(
        SeedInput::from_dump(&sealed()),
        SeedInput::from_dump(&plain())
    );
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

/// AES-128 of the all-zero block under the all-zero key (FIPS-197 style),
/// followed by the block for counter 1.
#[test]
fn ctr_keystream_zero_key_zero_iv() {
    use aes::cipher::{KeyIvInit, StreamCipher};
    let mut buf = [0u8; 32];
    let mut ctr = ctr::Ctr128BE::<aes::Aes128>::new(&[0u8; 16].into(), &[0u8; 16].into());
    ctr.apply_keystream(&mut buf);
    assert_eq!(
        buf.as_slice(),
        from_hex("66e94bd4ef8a2c3b884cfa59ca342b2e58e2fccefa7e3061367f1d57a4e7455a")
    );
}

#[test]
fn first_encrypted_block_matches_reference() {
    let dk = DumpKeys::derive(&keys(), &plain());
    let mut encrypted = plain();
    cipher::apply_payload(dk.data(), &mut encrypted).unwrap();
    assert_eq!(
        &encrypted.as_bytes()[0x14..0x24],
        from_hex("ccdfd101230ffc2cb8134f38a534e52d").as_slice()
    );
    assert_eq!(encrypted, sealed());
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

#[test]
fn hmacs_match_reference() {
    let dk = DumpKeys::derive(&keys(), &plain());
    let tag = integrity::tag_hmac(dk.tag(), &plain());
    assert_eq!(
        tag.as_slice(),
        from_hex("e9a68c148e7399cfdc9ac3474333beb598d8d2936ff9edc62da073d9a6b9b576")
    );
    let data = integrity::data_hmac(dk.data(), &plain(), &tag);
    assert_eq!(
        data.as_slice(),
        from_hex("2166eb876ecc7a40e5f7dc43f433f308a5df7d19dd702fb09ff6f9da59b175b3")
    );
    assert_eq!(plain().region(&layout::TAG_HMAC), tag.as_slice());
    assert_eq!(plain().region(&layout::DATA_HMAC), data.as_slice());
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn unlock_reproduces_reference_plaintext() {
    let (opened, status) = unlock(&keys(), &sealed()).expect("unlock should succeed");
    assert_eq!(status, IntegrityStatus::Verified);
    assert_eq!(opened, plain());
}

#[test]
fn lock_reproduces_reference_dump() {
    let resealed = lock(&keys(), &plain()).expect("lock should succeed");
    assert_eq!(resealed.as_bytes(), sealed().as_bytes());
}

#[test]
fn lock_recomputes_cleared_hmacs() {
    let mut stripped = plain();
    stripped.region_mut(&layout::TAG_HMAC).fill(0);
    stripped.region_mut(&layout::DATA_HMAC).fill(0);
    assert_eq!(lock(&keys(), &stripped).unwrap(), sealed());
}

#[test]
fn decrypted_fields_read_back() {
    let (opened, _) = unlock(&keys(), &sealed()).unwrap();

    let nickname: Vec<u16> = opened
        .region(&layout::NICKNAME)
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    assert_eq!(String::from_utf16(&nickname).unwrap(), "Mario");

    let owner: Vec<u16> = opened
        .region(&layout::OWNER_NAME)
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    assert_eq!(String::from_utf16(&owner).unwrap(), "Player");

    assert_eq!(opened.amiibo_id(), 0x0000_0000_0034_0102);
    assert_eq!(opened.write_counter(), 7);
    assert_eq!(opened.uid_hex(), "04A1B2C3D4E5F6");
    assert!(opened.uid_checksums_valid());
    assert!(opened.has_data_magic());
    assert_eq!(
        opened.region(&layout::APP_ID),
        from_hex("34f80200").as_slice()
    );
}

#[test]
fn truncated_dump_still_verifies() {
    let short = Dump::from_bytes(&SEALED[..layout::UNPADDED_LEN]).unwrap();
    let (_, status) = unlock(&keys(), &short).unwrap();
    // Config pages are outside both HMACs.
    assert_eq!(status, IntegrityStatus::Verified);
}
