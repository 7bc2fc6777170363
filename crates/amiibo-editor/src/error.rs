//! Editor error types for `amiibo-editor`.

use amiibo_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by key loading, sessions, field access and templates.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Codec operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// No key files were given, or a key file does not exist.
    #[error("key material missing: {0}")]
    KeyMaterialMissing(String),

    /// A field descriptor reaches outside the 540-byte record.
    #[error("field {signature} at 0x{offset:03X}+{length} lies outside the record")]
    LayoutViolation {
        /// Signature of the offending descriptor.
        signature: String,
        /// Declared byte offset.
        offset: usize,
        /// Declared byte length.
        length: usize,
    },

    /// Stored bytes cannot be decoded with the field's encoding.
    #[error("cannot decode field {signature}: {reason}")]
    FieldDecode {
        /// Signature of the field.
        signature: String,
        /// What went wrong.
        reason: String,
    },

    /// A value cannot be encoded into the field's byte range.
    #[error("cannot encode field {signature}: {reason}")]
    FieldEncode {
        /// Signature of the field.
        signature: String,
        /// What went wrong.
        reason: String,
    },

    /// Template file could not be parsed or written.
    #[error("template error: {0}")]
    Template(String),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for EditorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Template(err.to_string())
    }
}
