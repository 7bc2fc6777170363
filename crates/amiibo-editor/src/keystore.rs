//! Key file loading.
//!
//! Reads master key files from disk and hands the bytes to
//! [`amiibo_crypto_core::AmiiboKeys`]. No file handles are retained; the
//! returned keys are meant to be wrapped in an `Arc` and shared read-only by
//! every session.
//!
//! Accepted layouts:
//!
//! - one path: a combined 160-byte `key_retail.bin` (data key first)
//! - two paths: `unfixed-info.bin` and `locked-secret.bin` in either order,
//!   classified by their type strings, falling back to argument order when
//!   a type string is unrecognised; two files declaring the same role are
//!   rejected

use std::fs;
use std::path::{Path, PathBuf};

use amiibo_crypto_core::{AmiiboKeys, CryptoError, KeyRole, MasterKey};
use tracing::{debug, info};

use crate::error::EditorError;

/// Combined key file name.
pub const RETAIL_KEY_FILE: &str = "key_retail.bin";

/// Data-area key file name.
pub const DATA_KEY_FILE: &str = "unfixed-info.bin";

/// Tag-area key file name.
pub const TAG_KEY_FILE: &str = "locked-secret.bin";

/// Loads [`AmiiboKeys`] from key files.
pub struct KeyStore;

impl KeyStore {
    /// Load keys from one combined file or two separate files.
    ///
    /// # Errors
    ///
    /// - [`EditorError::KeyMaterialMissing`] if `paths` is empty, has more than
    ///   two entries, or names a file that does not exist
    /// - [`EditorError::Crypto`] wrapping `KeyMaterialMalformed` on a length or
    ///   magic-size error, or when both files declare the same role
    /// - [`EditorError::Io`] if a present file cannot be read
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<AmiiboKeys, EditorError> {
        let keys = match paths {
            [] => {
                return Err(EditorError::KeyMaterialMissing(
                    "no key files given".into(),
                ))
            }
            [combined] => AmiiboKeys::from_combined(&read_key_file(combined.as_ref())?)?,
            [first, second] => {
                let first = MasterKey::from_bytes(&read_key_file(first.as_ref())?)?;
                let second = MasterKey::from_bytes(&read_key_file(second.as_ref())?)?;
                pair(first, second)?
            }
            more => {
                return Err(EditorError::KeyMaterialMissing(format!(
                    "expected 1 or 2 key files, got {}",
                    more.len()
                )))
            }
        };
        info!(files = paths.len(), "master keys loaded");
        Ok(keys)
    }

    /// Load keys from a resources directory, preferring `key_retail.bin` over
    /// the `unfixed-info.bin` + `locked-secret.bin` pair.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::KeyMaterialMissing`] if neither layout is
    /// present, plus any error from [`KeyStore::load`].
    pub fn load_from_dir(dir: &Path) -> Result<AmiiboKeys, EditorError> {
        let paths = default_key_paths(dir).ok_or_else(|| {
            EditorError::KeyMaterialMissing(format!(
                "no {RETAIL_KEY_FILE} or {DATA_KEY_FILE} + {TAG_KEY_FILE} in {}",
                dir.display()
            ))
        })?;
        Self::load(&paths)
    }
}

/// Key files present in `dir`, in load order.
#[must_use]
pub fn default_key_paths(dir: &Path) -> Option<Vec<PathBuf>> {
    let retail = dir.join(RETAIL_KEY_FILE);
    if retail.is_file() {
        return Some(vec![retail]);
    }
    let data = dir.join(DATA_KEY_FILE);
    let tag = dir.join(TAG_KEY_FILE);
    (data.is_file() && tag.is_file()).then(|| vec![data, tag])
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, EditorError> {
    if !path.exists() {
        return Err(EditorError::KeyMaterialMissing(path.display().to_string()));
    }
    debug!(path = %path.display(), "reading key file");
    Ok(fs::read(path)?)
}

/// Order two master keys as (data, tag) by their declared role.
fn pair(first: MasterKey, second: MasterKey) -> Result<AmiiboKeys, CryptoError> {
    match (first.role(), second.role()) {
        (Some(a), Some(b)) if a == b => Err(CryptoError::KeyMaterialMalformed(format!(
            "both key files declare role {a:?}"
        ))),
        (Some(KeyRole::Tag), _) | (_, Some(KeyRole::Data)) => Ok(AmiiboKeys::new(second, first)),
        _ => Ok(AmiiboKeys::new(first, second)),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
