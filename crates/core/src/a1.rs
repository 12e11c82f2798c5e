//! A1-style cell and range references.
//!
//! Rows and columns are 1-based, as in any spreadsheet: `B1` is row 1, column 2.

use std::fmt;

/// A single cell position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Converts a 1-based column number to its letters (1 → `A`, 27 → `AA`).
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// A rectangular block of cells, inclusive on both corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self { start, end }
    }

    /// Columns `first_col..=last_col` of a single row.
    pub fn row(row: u32, first_col: u32, last_col: u32) -> Self {
        Self::new(CellRef::new(row, first_col), CellRef::new(row, last_col))
    }

    /// Columns `first_col..=last_col` of rows `first_row..=last_row`.
    pub fn rows(first_row: u32, last_row: u32, first_col: u32, last_col: u32) -> Self {
        Self::new(
            CellRef::new(first_row, first_col),
            CellRef::new(last_row, last_col),
        )
    }

    pub fn height(&self) -> u32 {
        self.end.row.saturating_sub(self.start.row) + 1
    }

    pub fn width(&self) -> u32 {
        self.end.col.saturating_sub(self.start.col) + 1
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
