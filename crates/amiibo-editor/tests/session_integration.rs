#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end editing against the golden fixtures shared with
//! `amiibo-crypto-core`.

use std::path::PathBuf;
use std::sync::Arc;

use amiibo_crypto_core::layout;
use amiibo_crypto_core::{AmiiboKeys, CryptoError, IntegrityStatus};
use amiibo_editor::field::find;
use amiibo_editor::{
    apply, builtin_fields, capture, hex_rows, randomize, EditorError, FieldValue, KeyStore,
    SaveOptions, Session, Template, APP_DATA_INITIALIZED, USER_DATA_INITIALIZED,
};
use tempfile::TempDir;

const KEYS: &[u8] = include_bytes!("../../amiibo-crypto-core/tests/fixtures/test_keys.bin");
const SEALED: &[u8] = include_bytes!("../../amiibo-crypto-core/tests/fixtures/sample_dump.bin");

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../amiibo-crypto-core/tests/fixtures")
}

fn keys() -> Arc<AmiiboKeys> {
    Arc::new(AmiiboKeys::from_combined(KEYS).unwrap())
}

fn open() -> Session {
    Session::open(SEALED, keys()).unwrap()
}

fn read(session: &Session, signature: &str) -> FieldValue {
    session
        .read(find(&builtin_fields(), signature).unwrap())
        .unwrap()
}

#[test]
fn builtin_fields_decode_fixture() {
    let s = open();
    assert_eq!(s.integrity(), IntegrityStatus::Verified);
    assert_eq!(read(&s, "nickname"), FieldValue::Text("Mario".into()));
    assert_eq!(read(&s, "ownerName"), FieldValue::Text("Player".into()));
    assert_eq!(read(&s, "amiiboId"), FieldValue::Unsigned(0x0034_0102));
    assert_eq!(read(&s, "titleId"), FieldValue::Unsigned(0x0100_6A80_0016_E000));
    assert_eq!(read(&s, "appId"), FieldValue::Unsigned(0x34F8_0200));
    assert_eq!(read(&s, "appWriteCounter"), FieldValue::Unsigned(12));
    assert_eq!(read(&s, "countryCode"), FieldValue::Unsigned(0x31));
    assert_eq!(read(&s, "settingsCrc"), FieldValue::Unsigned(0xDEAD_BEEF));
    assert_eq!(read(&s, USER_DATA_INITIALIZED), FieldValue::Flag(true));
    assert_eq!(read(&s, APP_DATA_INITIALIZED), FieldValue::Flag(true));
}

#[test]
fn unedited_seal_reproduces_fixture() {
    let mut s = open();
    assert_eq!(s.seal().unwrap(), SEALED);
}

#[test]
fn nickname_edit_touches_only_its_range() {
    let fields = builtin_fields();
    let nickname = find(&fields, "nickname").unwrap();
    let mut s = open();
    let before = s.dump().clone();

    s.write(nickname, &FieldValue::Text("Luigi".into())).unwrap();
    let resealed = s.seal().unwrap();

    let reopened = Session::open(&resealed, keys()).unwrap();
    assert_eq!(reopened.integrity(), IntegrityStatus::Verified);
    assert_eq!(read(&reopened, "nickname"), FieldValue::Text("Luigi".into()));

    let after = reopened.dump().as_bytes();
    for (offset, (a, b)) in before.as_bytes().iter().zip(after.iter()).enumerate() {
        let expected_change = nickname.range().unwrap().contains(&offset)
            || layout::TAG_HMAC.contains(offset)
            || layout::DATA_HMAC.contains(offset);
        if !expected_change {
            assert_eq!(a, b, "byte 0x{offset:03X} changed");
        }
    }
}

#[test]
fn template_capture_and_partial_apply() {
    let fields = builtin_fields();
    let source = open();
    let (captured, skipped) = capture(&source, &fields, "fixture");
    assert!(skipped.is_empty());
    assert_eq!(captured.values.len(), fields.len());

    let mut template = Template::new("partial");
    template
        .values
        .insert("nickname".into(), FieldValue::Text("Peach".into()));
    template
        .values
        .insert("ownerName".into(), FieldValue::Text("WayTooLongOwnerName".into()));
    template
        .values
        .insert("doesNotExist".into(), FieldValue::Flag(true));
    template
        .values
        .insert(APP_DATA_INITIALIZED.into(), FieldValue::Flag(false));

    let mut target = open();
    let report = apply(&mut target, &fields, &template);
    assert_eq!(report.applied, vec![APP_DATA_INITIALIZED.to_string(), "nickname".into()]);
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.signature.as_str()).collect();
    assert_eq!(skipped, vec!["doesNotExist", "ownerName"]);

    assert_eq!(read(&target, "nickname"), FieldValue::Text("Peach".into()));
    assert_eq!(read(&target, "ownerName"), FieldValue::Text("Player".into()));
    assert_eq!(read(&target, APP_DATA_INITIALIZED), FieldValue::Flag(false));
    assert_eq!(read(&target, USER_DATA_INITIALIZED), FieldValue::Flag(true));

    // Re-applying the captured template restores the original record.
    let report = apply(&mut target, &fields, &captured);
    assert!(report.skipped.is_empty());
    assert_eq!(target.seal().unwrap(), SEALED);
}

#[test]
fn randomized_seal_is_stable_and_verifies() {
    let mut s = open();
    let uid = randomize(&mut s);
    let first = s.seal().unwrap();
    let second = s.seal().unwrap();
    assert_eq!(first, second);
    assert_ne!(first.as_slice(), SEALED);

    let reopened = Session::open_verified(&first, keys()).unwrap();
    assert_eq!(reopened.dump().uid(), uid);
    assert_eq!(read(&reopened, "nickname"), FieldValue::Text("Mario".into()));
}

#[test]
fn files_roundtrip_through_disk() {
    let keys = Arc::new(KeyStore::load(&[fixture_dir().join("test_keys.bin")]).unwrap());
    let mut s =
        Session::load_file(&fixture_dir().join("sample_dump.bin"), Arc::clone(&keys)).unwrap();

    let dir = TempDir::new().unwrap();
    let plain_copy = dir.path().join("copy.bin");
    s.save_file(&plain_copy, &SaveOptions { shuffle_serial: false })
        .unwrap();
    assert_eq!(std::fs::read(&plain_copy).unwrap(), SEALED);
    assert!(!dir.path().join(".copy.bin.tmp").exists());

    let shuffled = dir.path().join("shuffled.bin");
    s.save_file(&shuffled, &SaveOptions::default()).unwrap();
    let reopened = Session::load_file(&shuffled, keys).unwrap();
    assert!(reopened.integrity().is_verified());
    assert_ne!(reopened.dump().uid_hex(), "04A1B2C3D4E5F6");
    assert!(reopened.dump().uid_checksums_valid());
}

#[test]
fn wrong_keys_report_mismatch() {
    let mut other = KEYS.to_vec();
    other[0] ^= 0xFF;
    let keys = Arc::new(AmiiboKeys::from_combined(&other).unwrap());
    let s = Session::open(SEALED, Arc::clone(&keys)).unwrap();
    assert!(!s.integrity().is_verified());
    assert!(matches!(
        Session::open_verified(SEALED, keys),
        Err(EditorError::Crypto(_))
    ));
}

#[test]
fn corrupted_data_hmac_is_reported() {
    let mut bytes = SEALED.to_vec();
    bytes[layout::DATA_HMAC.offset] ^= 0x01;

    let s = Session::open(&bytes, keys()).unwrap();
    assert_eq!(
        s.integrity(),
        IntegrityStatus::Mismatch {
            tag_ok: true,
            data_ok: false
        }
    );
    assert!(matches!(
        Session::open_verified(&bytes, keys()),
        Err(EditorError::Crypto(CryptoError::IntegrityMismatch { .. }))
    ));
}

#[test]
fn corrupted_tag_hmac_is_reported() {
    let mut bytes = SEALED.to_vec();
    bytes[layout::TAG_HMAC.offset] ^= 0x01;

    let mut s = Session::open(&bytes, keys()).unwrap();
    assert!(matches!(
        s.integrity(),
        IntegrityStatus::Mismatch { tag_ok: false, .. }
    ));
    assert!(Session::open_verified(&bytes, keys()).is_err());

    // Resealing rewrites both slots from the untouched plaintext.
    assert_eq!(s.seal().unwrap(), SEALED);
    assert!(s.integrity().is_verified());
}

#[test]
fn hex_view_of_fixture() {
    let rows = hex_rows(SEALED);
    assert_eq!(rows.len(), 34);
    assert_eq!(rows[0].cells[..4], ["04", "A1", "B2", "9F"]);
    assert_eq!(rows[33].label, "0x21");
}
