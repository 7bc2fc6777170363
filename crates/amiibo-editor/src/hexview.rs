//! Tabular hex view of a record.
//!
//! Rows hold 16 upper-case byte cells and are labelled by row index
//! (`0x0`, `0x1`, ... `0x21`), not by byte offset. The final row may be
//! shorter than 16 cells.

use data_encoding::HEXUPPER;
use serde::Serialize;

/// Bytes per row.
pub const ROW_WIDTH: usize = 16;

/// One row of the hex table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HexRow {
    /// Row index as `0x{index:X}`.
    pub label: String,
    /// Two-digit upper-case hex cells.
    pub cells: Vec<String>,
}

/// Split `bytes` into labelled rows of [`ROW_WIDTH`] cells.
#[must_use]
pub fn hex_rows(bytes: &[u8]) -> Vec<HexRow> {
    bytes
        .chunks(ROW_WIDTH)
        .enumerate()
        .map(|(index, chunk)| HexRow {
            label: format!("0x{index:X}"),
            cells: chunk
                .iter()
                .map(|b| HEXUPPER.encode(std::slice::from_ref(b)))
                .collect(),
        })
        .collect()
}

/// Column headings: an empty label column, then `0` to `F`.
#[must_use]
pub fn column_headings() -> Vec<String> {
    std::iter::once(String::new())
        .chain((0..ROW_WIDTH).map(|i| format!("{i:X}")))
        .collect()
}
