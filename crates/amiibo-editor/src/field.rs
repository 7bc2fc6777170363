//! Typed field overlay on top of the plaintext record.
//!
//! This module provides:
//! - [`FieldDescriptor`] — `(signature, offset, length, encoding)` naming one
//!   byte range of the 540-byte record
//! - [`FieldEncoding`] — how the range is interpreted
//! - [`FieldValue`] — the closed set of decoded values
//! - [`builtin_fields`] — descriptors for the well-known payload fields
//!
//! Encoding never touches bytes outside `[offset, offset + length)`, and a
//! failed encode leaves the record unchanged.

use amiibo_crypto_core::layout::{self, Region, DUMP_LEN};
use serde::{Deserialize, Serialize};

use crate::error::EditorError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Byte order of an unsigned integer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Endian {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// Character encoding of a fixed-width, NUL-padded text field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Charset {
    /// UTF-16, little-endian code units (owner name).
    Utf16Le,
    /// UTF-16, big-endian code units (nickname).
    Utf16Be,
    /// UTF-8.
    Utf8,
}

/// How a field's bytes are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldEncoding {
    /// Opaque bytes.
    Raw,
    /// Unsigned integer of 1 to 8 bytes.
    Unsigned {
        /// Byte order.
        endian: Endian,
    },
    /// Text padded with NULs to the field length.
    Text {
        /// Character encoding.
        charset: Charset,
    },
    /// One bit within the range: byte `bit / 8`, bit `bit % 8` (LSB = 0).
    Flag {
        /// Bit index from the start of the range.
        bit: u16,
    },
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    /// Raw bytes, serialized as upper-case hex.
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    /// Unsigned integer.
    Unsigned(u64),
    /// Text with padding stripped.
    Text(String),
    /// Single bit.
    Flag(bool),
}

/// A named, typed byte range of the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Stable key used by templates.
    pub signature: String,
    /// Absolute byte offset into the record.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
    /// Interpretation of the bytes.
    pub encoding: FieldEncoding,
}

impl FieldDescriptor {
    /// Build a descriptor.
    #[must_use]
    pub fn new(
        signature: impl Into<String>,
        offset: usize,
        length: usize,
        encoding: FieldEncoding,
    ) -> Self {
        Self {
            signature: signature.into(),
            offset,
            length,
            encoding,
        }
    }

    /// Build a descriptor covering a layout region, named after it.
    #[must_use]
    pub fn from_region(region: &Region, encoding: FieldEncoding) -> Self {
        Self::new(region.name, region.offset, region.len, encoding)
    }

    /// The checked byte range of this field.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LayoutViolation`] if the range is empty or
    /// reaches past the end of the record.
    pub fn range(&self) -> Result<std::ops::Range<usize>, EditorError> {
        match self.offset.checked_add(self.length) {
            Some(end) if self.length > 0 && end <= DUMP_LEN => Ok(self.offset..end),
            _ => Err(EditorError::LayoutViolation {
                signature: self.signature.clone(),
                offset: self.offset,
                length: self.length,
            }),
        }
    }

    /// Decode this field from a plaintext record.
    ///
    /// # Errors
    ///
    /// - [`EditorError::LayoutViolation`] if the range is out of bounds
    /// - [`EditorError::FieldDecode`] if the bytes do not fit the encoding
    pub fn decode(&self, record: &[u8; DUMP_LEN]) -> Result<FieldValue, EditorError> {
        let bytes = &record[self.range()?];
        match self.encoding {
            FieldEncoding::Raw => Ok(FieldValue::Bytes(bytes.to_vec())),
            FieldEncoding::Unsigned { endian } => {
                let mut buf = [0u8; 8];
                let pad = 8usize
                    .checked_sub(bytes.len())
                    .ok_or_else(|| self.decode_error("integer wider than 8 bytes"))?;
                let value = match endian {
                    Endian::Big => {
                        buf[pad..].copy_from_slice(bytes);
                        u64::from_be_bytes(buf)
                    }
                    Endian::Little => {
                        buf[..bytes.len()].copy_from_slice(bytes);
                        u64::from_le_bytes(buf)
                    }
                };
                Ok(FieldValue::Unsigned(value))
            }
            FieldEncoding::Text { charset } => decode_text(bytes, charset)
                .map(FieldValue::Text)
                .map_err(|reason| self.decode_error(reason)),
            FieldEncoding::Flag { bit } => {
                let (index, mask) = self.bit_position(bit).map_err(|r| self.decode_error(r))?;
                Ok(FieldValue::Flag(bytes[index] & mask != 0))
            }
        }
    }

    /// Encode `value` into a plaintext record.
    ///
    /// Only this field's range is written, and only after the whole value
    /// has been encoded successfully.
    ///
    /// # Errors
    ///
    /// - [`EditorError::LayoutViolation`] if the range is out of bounds
    /// - [`EditorError::FieldEncode`] if the value does not fit the encoding
    pub fn encode(&self, value: &FieldValue, record: &mut [u8; DUMP_LEN]) -> Result<(), EditorError> {
        let range = self.range()?;
        let mut staged = record[range.clone()].to_vec();

        match (self.encoding, value) {
            (FieldEncoding::Raw, FieldValue::Bytes(bytes)) => {
                if bytes.len() != self.length {
                    return Err(self.encode_error(format!(
                        "expected {} bytes, got {}",
                        self.length,
                        bytes.len()
                    )));
                }
                staged.copy_from_slice(bytes);
            }
            (FieldEncoding::Unsigned { endian }, FieldValue::Unsigned(n)) => {
                let pad = 8usize
                    .checked_sub(self.length)
                    .ok_or_else(|| self.encode_error("integer wider than 8 bytes"))?;
                match endian {
                    Endian::Big => {
                        let be = n.to_be_bytes();
                        if be[..pad].iter().any(|&b| b != 0) {
                            return Err(self.overflow_error(*n));
                        }
                        staged.copy_from_slice(&be[pad..]);
                    }
                    Endian::Little => {
                        let le = n.to_le_bytes();
                        if le[self.length..].iter().any(|&b| b != 0) {
                            return Err(self.overflow_error(*n));
                        }
                        staged.copy_from_slice(&le[..self.length]);
                    }
                }
            }
            (FieldEncoding::Text { charset }, FieldValue::Text(text)) => {
                let encoded = encode_text(text, charset);
                if encoded.len() > self.length {
                    return Err(self.encode_error(format!(
                        "text needs {} bytes, field holds {}",
                        encoded.len(),
                        self.length
                    )));
                }
                staged.fill(0);
                staged[..encoded.len()].copy_from_slice(&encoded);
            }
            (FieldEncoding::Flag { bit }, FieldValue::Flag(set)) => {
                let (index, mask) = self.bit_position(bit).map_err(|r| self.encode_error(r))?;
                if *set {
                    staged[index] |= mask;
                } else {
                    staged[index] &= !mask;
                }
            }
            (encoding, value) => {
                return Err(self.encode_error(format!(
                    "{} value does not match {encoding:?} encoding",
                    value.kind()
                )))
            }
        }

        record[range].copy_from_slice(&staged);
        Ok(())
    }

    fn bit_position(&self, bit: u16) -> Result<(usize, u8), String> {
        let index = usize::from(bit >> 3);
        if index >= self.length {
            return Err(format!("bit {bit} outside a {}-byte field", self.length));
        }
        Ok((index, 1u8 << (bit & 7)))
    }

    fn decode_error(&self, reason: impl Into<String>) -> EditorError {
        EditorError::FieldDecode {
            signature: self.signature.clone(),
            reason: reason.into(),
        }
    }

    fn encode_error(&self, reason: impl Into<String>) -> EditorError {
        EditorError::FieldEncode {
            signature: self.signature.clone(),
            reason: reason.into(),
        }
    }

    fn overflow_error(&self, n: u64) -> EditorError {
        self.encode_error(format!("{n} does not fit in {} bytes", self.length))
    }
}

impl FieldValue {
    /// Short name of the variant, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Unsigned(_) => "unsigned",
            Self::Text(_) => "text",
            Self::Flag(_) => "flag",
        }
    }
}

// ---------------------------------------------------------------------------
// Text codecs
// ---------------------------------------------------------------------------

fn decode_text(bytes: &[u8], charset: Charset) -> Result<String, String> {
    match charset {
        Charset::Utf8 => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            String::from_utf8(bytes[..end].to_vec()).map_err(|e| e.to_string())
        }
        Charset::Utf16Le | Charset::Utf16Be => {
            if bytes.len() % 2 != 0 {
                return Err(format!("odd length {} for UTF-16", bytes.len()));
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| match charset {
                    Charset::Utf16Be => u16::from_be_bytes([c[0], c[1]]),
                    _ => u16::from_le_bytes([c[0], c[1]]),
                })
                .take_while(|&u| u != 0)
                .collect();
            String::from_utf16(&units).map_err(|e| e.to_string())
        }
    }
}

fn encode_text(text: &str, charset: Charset) -> Vec<u8> {
    match charset {
        Charset::Utf8 => text.as_bytes().to_vec(),
        Charset::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
    }
}

mod hex_bytes {
    use data_encoding::{HEXUPPER, HEXUPPER_PERMISSIVE};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&HEXUPPER.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        HEXUPPER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Built-in descriptors
// ---------------------------------------------------------------------------

/// Settings flag bit: owner Mii and nickname have been registered.
pub const USER_DATA_INITIALIZED: &str = "userDataInitialized";

/// Settings flag bit: a game has claimed the application area.
pub const APP_DATA_INITIALIZED: &str = "appDataInitialized";

/// Descriptors for the well-known payload fields of the layout map.
#[must_use]
pub fn builtin_fields() -> Vec<FieldDescriptor> {
    const BE: FieldEncoding = FieldEncoding::Unsigned {
        endian: Endian::Big,
    };
    let mut fields: Vec<FieldDescriptor> = layout::PAYLOAD_FIELDS
        .iter()
        .map(|region| {
            let encoding = match region.name {
                "nickname" => FieldEncoding::Text {
                    charset: Charset::Utf16Be,
                },
                "ownerName" => FieldEncoding::Text {
                    charset: Charset::Utf16Le,
                },
                "ownerMii" | "appData" => FieldEncoding::Raw,
                _ => BE,
            };
            FieldDescriptor::from_region(region, encoding)
        })
        .collect();

    for (signature, bit) in [(USER_DATA_INITIALIZED, 4), (APP_DATA_INITIALIZED, 5)] {
        fields.push(FieldDescriptor::new(
            signature,
            layout::SETTINGS_FLAGS.offset,
            layout::SETTINGS_FLAGS.len,
            FieldEncoding::Flag { bit },
        ));
    }
    fields
}

/// Find a descriptor by signature; the first match wins.
#[must_use]
pub fn find<'a>(descriptors: &'a [FieldDescriptor], signature: &str) -> Option<&'a FieldDescriptor> {
    descriptors.iter().find(|d| d.signature == signature)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
