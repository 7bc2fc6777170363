//! Cryptographic error types for `amiibo-crypto-core`.

use thiserror::Error;

/// Errors produced by key parsing, decryption, and integrity checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key file bytes do not form a valid master key (wrong length, bad magic size).
    #[error("key material malformed: {0}")]
    KeyMaterialMalformed(String),

    /// The dump or derived key material is structurally unusable.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// One or both stored HMACs do not match the recomputed values.
    ///
    /// The fields are `true` when the corresponding tag matched.
    #[error("integrity mismatch (tag HMAC ok: {tag}, data HMAC ok: {data})")]
    IntegrityMismatch {
        /// Whether the tag HMAC (UID + model info) matched.
        tag: bool,
        /// Whether the data HMAC (full record) matched.
        data: bool,
    },
}
