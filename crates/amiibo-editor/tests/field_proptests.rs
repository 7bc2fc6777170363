#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use amiibo_crypto_core::layout::DUMP_LEN;
use amiibo_editor::{builtin_fields, Charset, FieldDescriptor, FieldEncoding, FieldValue};
use proptest::prelude::*;

fn record() -> impl Strategy<Value = [u8; DUMP_LEN]> {
    proptest::collection::vec(any::<u8>(), DUMP_LEN).prop_map(|v| {
        let mut out = [0u8; DUMP_LEN];
        out.copy_from_slice(&v);
        out
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Writing any built-in integer field leaves every byte outside its
    /// range untouched, and reads back what was written.
    #[test]
    fn unsigned_write_stays_in_range(
        original in record(),
        index in 0usize..16,
        raw in any::<u64>(),
    ) {
        let fields = builtin_fields();
        let field = &fields[index % fields.len()];
        prop_assume!(matches!(field.encoding, FieldEncoding::Unsigned { .. }));

        let bits = u32::try_from(field.length * 8).unwrap();
        let value = if bits >= 64 { raw } else { raw & ((1u64 << bits) - 1) };

        let mut edited = original;
        field.encode(&FieldValue::Unsigned(value), &mut edited).unwrap();
        prop_assert_eq!(field.decode(&edited).unwrap(), FieldValue::Unsigned(value));

        let range = field.range().unwrap();
        for offset in 0..DUMP_LEN {
            if !range.contains(&offset) {
                prop_assert_eq!(original[offset], edited[offset]);
            }
        }
    }

    /// Raw and text writes through arbitrary in-bounds descriptors leave
    /// every byte outside the descriptor untouched.
    #[test]
    fn raw_and_text_writes_stay_in_range(
        original in record(),
        (offset, length) in (0usize..DUMP_LEN).prop_flat_map(|o| (Just(o), 1..=DUMP_LEN - o)),
        fill in any::<u8>(),
        text in "[A-Za-z0-9 ]{0,12}",
        charset in prop_oneof![Just(Charset::Utf8), Just(Charset::Utf16Le), Just(Charset::Utf16Be)],
    ) {
        let raw = FieldDescriptor::new("raw", offset, length, FieldEncoding::Raw);
        let mut edited = original;
        raw.encode(&FieldValue::Bytes(vec![fill; length]), &mut edited).unwrap();
        prop_assert!(edited[offset..offset + length].iter().all(|&b| b == fill));
        prop_assert_eq!(&original[..offset], &edited[..offset]);
        prop_assert_eq!(&original[offset + length..], &edited[offset + length..]);

        let field = FieldDescriptor::new("text", offset, length, FieldEncoding::Text { charset });
        let mut edited = original;
        // Text that does not fit is rejected; either way nothing leaks out.
        let _ = field.encode(&FieldValue::Text(text), &mut edited);
        prop_assert_eq!(&original[..offset], &edited[..offset]);
        prop_assert_eq!(&original[offset + length..], &edited[offset + length..]);
    }

    /// Oversized values are rejected without modifying the record.
    #[test]
    fn rejected_write_is_a_no_op(original in record(), text in "[a-z]{11,20}") {
        let fields = builtin_fields();
        let nickname = amiibo_editor::field::find(&fields, "nickname").unwrap();

        let mut edited = original;
        prop_assert!(nickname.encode(&FieldValue::Text(text), &mut edited).is_err());
        prop_assert_eq!(original, edited);
    }

    /// Toggling one settings flag never disturbs the other bits.
    #[test]
    fn flag_toggle_isolated(original in record(), set in any::<bool>()) {
        let fields = builtin_fields();
        let flag = amiibo_editor::field::find(&fields, amiibo_editor::APP_DATA_INITIALIZED).unwrap();
        let offset = flag.offset;

        let mut edited = original;
        flag.encode(&FieldValue::Flag(set), &mut edited).unwrap();
        prop_assert_eq!(flag.decode(&edited).unwrap(), FieldValue::Flag(set));
        prop_assert_eq!(original[offset] & !0x20, edited[offset] & !0x20);
        prop_assert_eq!(&original[..offset], &edited[..offset]);
        prop_assert_eq!(&original[offset + 1..], &edited[offset + 1..]);
    }
}
