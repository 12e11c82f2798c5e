//! Tabular document collaborator.

use super::ServiceResult;
use crate::a1::{CellRef, RangeRef};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value held by one cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// A formula such as `=HYPERLINK("…", "…")`, kept as written.
    Formula(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Display text of the cell, as a reader of the document would see it. A `HYPERLINK`
    /// formula shows its label; [`Display`](fmt::Display) gives the formula as stored.
    pub fn display(&self) -> String {
        match self {
            CellValue::Formula(formula) => hyperlink_label(formula)
                .map(str::to_string)
                .unwrap_or_else(|| formula.clone()),
            other => other.to_string(),
        }
    }
}

/// Label of a `=HYPERLINK("<url>", "<label>")` formula.
fn hyperlink_label(formula: &str) -> Option<&str> {
    let args = formula
        .trim()
        .strip_prefix("=HYPERLINK(")?
        .strip_suffix(')')?;
    let (_, label) = args.rsplit_once(',')?;
    label.trim().strip_prefix('"')?.strip_suffix('"')
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) | CellValue::Formula(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

/// Handle to a tabular document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Spreadsheet-like document service.
///
/// Each document has a single sheet. Rows and columns are 1-based.
pub trait TabularStore: Send + Sync {
    /// Creates an empty document at the store's root.
    fn create_document(&self, title: &str) -> ServiceResult<DocumentRef>;

    fn open(&self, document_id: &str) -> ServiceResult<DocumentRef>;

    /// Reads a block of cells. Cells past the end of the data read as [`CellValue::Empty`]; the
    /// result always has `range.height()` rows of `range.width()` cells.
    fn read_range(&self, document_id: &str, range: RangeRef) -> ServiceResult<Vec<Vec<CellValue>>>;

    /// Writes `rows` with their top-left corner at `start`.
    fn write_range(
        &self,
        document_id: &str,
        start: CellRef,
        rows: &[Vec<CellValue>],
    ) -> ServiceResult<()>;

    /// Writes `row` immediately below the last row holding any content and returns its number.
    fn append_row(&self, document_id: &str, row: &[CellValue]) -> ServiceResult<u32>;

    /// Number of the last row holding any content, `0` for an empty document.
    fn last_row(&self, document_id: &str) -> ServiceResult<u32>;

    fn set_formula(&self, document_id: &str, cell: CellRef, formula: &str) -> ServiceResult<()>;

    fn read_cell(&self, document_id: &str, cell: CellRef) -> ServiceResult<CellValue> {
        let rows = self.read_range(document_id, RangeRef::new(cell, cell))?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }

    fn write_cell(&self, document_id: &str, cell: CellRef, value: CellValue) -> ServiceResult<()> {
        self.write_range(document_id, cell, &[vec![value]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyperlink_formula_displays_its_label() {
        let cell = CellValue::Formula(
            "=HYPERLINK(\"https://calendar.google.com/calendar/event?eid=abc\", \"View Event\")"
                .into(),
        );
        assert_eq!(cell.display(), "View Event");
        assert!(cell.to_string().starts_with("=HYPERLINK("));

        assert_eq!(CellValue::Formula("=SUM(A1:A3)".into()).display(), "=SUM(A1:A3)");
        assert_eq!(CellValue::Number(Decimal::new(30_000, 0)).display(), "30000");
        assert_eq!(CellValue::Empty.display(), "");
    }
}
