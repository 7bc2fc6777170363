//! `amiibo-editor` — Editing logic for amiibo dumps.
//!
//! Loads key files, opens dumps into plaintext sessions, exposes typed field
//! access and templates, shuffles serial numbers, and re-seals records for
//! saving. All cryptography is delegated to `amiibo-crypto-core`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod config;
pub mod error;
pub mod keystore;

pub mod field;
pub mod session;

pub mod randomize;
pub mod template;

pub mod hexview;

pub use config::{EditorConfig, RegionFormat};
pub use error::EditorError;
pub use field::{
    builtin_fields, Charset, Endian, FieldDescriptor, FieldEncoding, FieldValue,
    APP_DATA_INITIALIZED, USER_DATA_INITIALIZED,
};
pub use hexview::{column_headings, hex_rows, HexRow};
pub use keystore::KeyStore;
pub use randomize::{randomize, randomize_with};
pub use session::{SaveOptions, Session};
pub use template::{apply, apply_value, capture, ApplyReport, SkippedField, Template};
