//! `amiibo-crypto-core` — Pure codec primitives for NTAG215 amiibo dumps.
//!
//! This crate is I/O-free: it parses key material handed to it as bytes,
//! derives per-dump keys, runs the AES-128-CTR payload cipher and the two
//! HMAC-SHA256 integrity tags, and describes the fixed 540-byte layout.
//! File handling, sessions and typed field access live in `amiibo-editor`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod layout;

pub mod dump;
pub mod keys;

pub mod kdf;

pub mod cipher;
pub mod integrity;

pub mod codec;

pub use codec::{lock, unlock, unlock_verified, DumpKeys};
pub use dump::{bcc0, bcc1, Dump, CASCADE_TAG, NXP_MANUFACTURER_ID, UID_LEN};
pub use error::CryptoError;
pub use integrity::IntegrityStatus;
pub use kdf::{derive, DerivedKeys, SeedInput};
pub use keys::{AmiiboKeys, KeyRole, MasterKey, COMBINED_KEYS_LEN, MASTER_KEY_LEN};
pub use layout::{Region, RegionKind, DUMP_LEN};
