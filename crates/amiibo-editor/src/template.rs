//! Field templates: named snapshots of field values.
//!
//! This module provides:
//! - [`Template`] — name + signature → value map, persisted as JSON
//! - [`capture`] — read a set of descriptors from a session into a template
//! - [`apply`] — write a template back, field by field
//! - [`apply_value`] — write a single signature/value pair
//!
//! Applying never aborts halfway: unknown signatures and values that do not
//! fit their field are listed in [`ApplyReport::skipped`], and every other
//! field is still written.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EditorError;
use crate::field::{self, FieldDescriptor, FieldValue};
use crate::session::{self, Session};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named set of field values keyed by descriptor signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Display name.
    pub name: String,
    /// Field values by signature.
    #[serde(default)]
    pub values: BTreeMap<String, FieldValue>,
}

/// A field that was not captured or applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedField {
    /// Descriptor signature.
    pub signature: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Per-field outcome of [`apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Signatures written successfully.
    pub applied: Vec<String>,
    /// Signatures that were not written.
    pub skipped: Vec<SkippedField>,
}

impl Template {
    /// An empty template.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Parse a template from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Template`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Template`] if serialization fails.
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a template file.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Io`] if the file cannot be read, or
    /// [`EditorError::Template`] on malformed JSON.
    pub fn load(path: &Path) -> Result<Self, EditorError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Write a template file via a hidden `.{name}.tmp` sibling and rename.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Io`] on a filesystem failure; no temporary
    /// file is left behind.
    pub fn save(&self, path: &Path) -> Result<(), EditorError> {
        let json = self.to_json()?;
        session::write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capture / apply
// ---------------------------------------------------------------------------

/// Read every descriptor in `descriptors` into a new template.
///
/// When several descriptors share a signature, the first one wins. Fields
/// that fail to decode are left out and returned alongside the template.
#[must_use]
pub fn capture(
    session: &Session,
    descriptors: &[FieldDescriptor],
    name: impl Into<String>,
) -> (Template, Vec<SkippedField>) {
    let mut template = Template::new(name);
    let mut skipped = Vec::new();

    for descriptor in descriptors {
        if template.values.contains_key(&descriptor.signature) {
            continue;
        }
        match session.read(descriptor) {
            Ok(value) => {
                template.values.insert(descriptor.signature.clone(), value);
            }
            Err(err) => skipped.push(SkippedField {
                signature: descriptor.signature.clone(),
                reason: err.to_string(),
            }),
        }
    }

    debug!(
        template = %template.name,
        captured = template.values.len(),
        skipped = skipped.len(),
        "template captured"
    );
    (template, skipped)
}

/// Write every value of `template` into the session.
///
/// Signatures are resolved against `descriptors` (first match wins).
#[must_use]
pub fn apply(session: &mut Session, descriptors: &[FieldDescriptor], template: &Template) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (signature, value) in &template.values {
        match apply_value(session, descriptors, signature, value) {
            Ok(()) => report.applied.push(signature.clone()),
            Err(err) => {
                warn!(template = %template.name, %signature, %err, "template field skipped");
                report.skipped.push(SkippedField {
                    signature: signature.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// Write a single value by signature.
///
/// # Errors
///
/// Returns [`EditorError::Template`] if no descriptor has `signature`, plus
/// any error from [`Session::write`].
pub fn apply_value(
    session: &mut Session,
    descriptors: &[FieldDescriptor],
    signature: &str,
    value: &FieldValue,
) -> Result<(), EditorError> {
    let descriptor = field::find(descriptors, signature)
        .ok_or_else(|| EditorError::Template(format!("unknown signature {signature}")))?;
    session.write(descriptor, value)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
