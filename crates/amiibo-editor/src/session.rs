//! Editing sessions over one decrypted record.
//!
//! A [`Session`] owns the plaintext of a single dump. Field reads and writes
//! act on that plaintext only; encryption and HMACs are recomputed by
//! [`Session::seal`]. Derived keys are cached together with the seed input
//! they came from and re-derived whenever the UID pages, write counter or
//! salt have changed since.
//!
//! ```text
//! open ─▶ read / write / randomize ─▶ seal ─▶ 540 bytes
//!   │                                   ▲
//!   └────────────── verify ─────────────┘
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use amiibo_crypto_core::{AmiiboKeys, Dump, DumpKeys, IntegrityStatus, UID_LEN};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::error::EditorError;
use crate::field::{FieldDescriptor, FieldValue};
use crate::randomize;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Options for [`Session::save_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Give the tag a fresh random UID before sealing.
    pub shuffle_serial: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            shuffle_serial: true,
        }
    }
}

/// One opened record.
///
/// The plaintext is zeroized on drop. `Debug` shows only the header
/// summary, never payload bytes.
pub struct Session {
    keys: Arc<AmiiboKeys>,
    plain: Dump,
    derived: Option<DumpKeys>,
    integrity: IntegrityStatus,
    sealed: bool,
}

impl Session {
    /// Decrypt `bytes` and check its integrity tags.
    ///
    /// An integrity mismatch does not fail the open; it is reported by
    /// [`Session::integrity`].
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Crypto`] wrapping `DecryptionFailed` if `bytes`
    /// is not a 520, 532 or 540-byte image.
    pub fn open(bytes: &[u8], keys: Arc<AmiiboKeys>) -> Result<Self, EditorError> {
        let sealed = Dump::from_bytes(bytes)?;
        let derived = DumpKeys::derive(&keys, &sealed);
        debug!(uid = %sealed.uid_hex(), "derived dump keys");

        let (plain, integrity) = derived.open(&sealed)?;
        match integrity {
            IntegrityStatus::Verified => debug!(uid = %plain.uid_hex(), "dump unlocked"),
            IntegrityStatus::Mismatch { tag_ok, data_ok } => {
                warn!(uid = %plain.uid_hex(), tag_ok, data_ok, "dump integrity mismatch");
            }
        }

        Ok(Self {
            keys,
            plain,
            derived: Some(derived),
            integrity,
            sealed: true,
        })
    }

    /// Like [`Session::open`], but reject records whose HMACs do not match.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Crypto`] wrapping `IntegrityMismatch` on a
    /// mismatch, plus any error from [`Session::open`].
    pub fn open_verified(bytes: &[u8], keys: Arc<AmiiboKeys>) -> Result<Self, EditorError> {
        let session = Self::open(bytes, keys)?;
        session.integrity.into_result()?;
        Ok(session)
    }

    /// Read and open a dump file.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Io`] if the file cannot be read, plus any error
    /// from [`Session::open`].
    pub fn load_file(path: &Path, keys: Arc<AmiiboKeys>) -> Result<Self, EditorError> {
        let bytes = fs::read(path)?;
        info!(path = %path.display(), len = bytes.len(), "loading dump");
        Self::open(&bytes, keys)
    }

    // -- Accessors ----------------------------------------------------------

    /// The plaintext record.
    #[must_use]
    pub const fn dump(&self) -> &Dump {
        &self.plain
    }

    /// Shared master keys.
    #[must_use]
    pub const fn keys(&self) -> &Arc<AmiiboKeys> {
        &self.keys
    }

    /// Integrity status of the plaintext as of the last open, verify or seal.
    ///
    /// Field edits do not change it; call [`Session::verify`] to re-check.
    #[must_use]
    pub const fn integrity(&self) -> IntegrityStatus {
        self.integrity
    }

    /// Whether the plaintext is unchanged since it was opened or last sealed.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    // -- Fields -------------------------------------------------------------

    /// Decode one field from the plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LayoutViolation`] or [`EditorError::FieldDecode`].
    pub fn read(&self, descriptor: &FieldDescriptor) -> Result<FieldValue, EditorError> {
        descriptor.decode(self.plain.as_bytes())
    }

    /// Encode one field into the plaintext.
    ///
    /// Nothing changes if an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LayoutViolation`] or [`EditorError::FieldEncode`].
    pub fn write(&mut self, descriptor: &FieldDescriptor, value: &FieldValue) -> Result<(), EditorError> {
        descriptor.encode(value, self.plain.as_bytes_mut())?;
        self.sealed = false;
        Ok(())
    }

    /// Store a new UID with fresh check bytes.
    pub(crate) fn set_uid(&mut self, uid: &[u8; UID_LEN]) {
        self.plain.set_uid(uid);
        self.derived = None;
        self.sealed = false;
    }

    // -- Sealing ------------------------------------------------------------

    /// Re-check the current plaintext against its stored HMACs.
    #[must_use]
    pub fn verify(&mut self) -> IntegrityStatus {
        let derived = current_keys(&mut self.derived, &self.keys, &self.plain);
        self.integrity =
            amiibo_crypto_core::integrity::check(derived.tag(), derived.data(), &self.plain);
        self.integrity
    }

    /// Write fresh HMACs into the plaintext and return the encrypted image.
    ///
    /// Idempotent: sealing twice without edits yields identical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Crypto`] if the cipher cannot run.
    pub fn seal(&mut self) -> Result<Vec<u8>, EditorError> {
        let derived = current_keys(&mut self.derived, &self.keys, &self.plain);
        let sealed = derived.seal(&mut self.plain)?;
        self.integrity = IntegrityStatus::Verified;
        self.sealed = true;
        debug!(uid = %self.plain.uid_hex(), "dump sealed");
        Ok(sealed.to_vec())
    }

    /// Seal and write the record to `path`.
    ///
    /// With `shuffle_serial`, a fresh random UID is assigned first. The file
    /// is written to a temporary sibling and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Io`] on a filesystem failure, plus any error
    /// from [`Session::seal`].
    pub fn save_file(&mut self, path: &Path, options: &SaveOptions) -> Result<(), EditorError> {
        if options.shuffle_serial {
            randomize::randomize(self);
        }
        let bytes = self.seal()?;

        write_atomic(path, &bytes)?;

        info!(path = %path.display(), uid = %self.plain.uid_hex(), "dump saved");
        Ok(())
    }
}

/// Write `bytes` to a hidden `.{name}.tmp` sibling, then rename it over
/// `path`. The temporary file is removed if either step fails.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        )
    })?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let written = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

/// Cached keys for `plain`, re-derived if its seed input changed.
fn current_keys<'a>(
    cache: &'a mut Option<DumpKeys>,
    keys: &AmiiboKeys,
    plain: &Dump,
) -> &'a DumpKeys {
    if cache.as_ref().is_some_and(|k| !k.matches(plain)) {
        *cache = None;
    }
    cache.get_or_insert_with(|| {
        debug!(uid = %plain.uid_hex(), "re-deriving dump keys");
        DumpKeys::derive(keys, plain)
    })
}

impl Drop for Session {
    fn drop(&mut self) {
        self.plain.as_bytes_mut().zeroize();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("dump", &self.plain)
            .field("integrity", &self.integrity)
            .field("sealed", &self.sealed)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
