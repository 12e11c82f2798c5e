//! Visits: the append-only log rows of a patient document.
//!
//! A visit occupies one six-column row at or below row 11:
//!
//! ```text
//!   A             B       C       D            E                           F
//!   date & time   notes   price   amount paid  =HYPERLINK(event, label)    diagnosis
//! ```
//!
//! Rows are only ever appended. Nothing here rewrites or deletes a persisted visit.

use crate::a1::{CellRef, RangeRef};
use crate::constants::{
    DIAGNOSIS_PENDING, EVENT_PLACEHOLDER, LOG_EVENT_COLUMN, LOG_FIRST_DATA_ROW, LOG_HEADER_ROW,
    LOG_WIDTH,
};
use crate::error::{PortalError, PortalResult};
use crate::models::Patient;
use crate::services::{CellValue, TabularStore};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub scheduled_at: NaiveDateTime,
    pub notes: String,
    pub price: Decimal,
    /// Blank until the visit is reconciled.
    pub amount_paid: Option<Decimal>,
    /// Display formula pointing at the calendar event, as stored in the log.
    pub event_reference: String,
    pub diagnosis: String,
}

impl Visit {
    /// A freshly booked visit: nothing paid yet, diagnosis pending.
    pub fn booked(
        scheduled_at: NaiveDateTime,
        notes: impl Into<String>,
        price: Decimal,
        event_reference: impl Into<String>,
    ) -> Self {
        Self {
            scheduled_at,
            notes: notes.into(),
            price,
            amount_paid: None,
            event_reference: event_reference.into(),
            diagnosis: DIAGNOSIS_PENDING.to_string(),
        }
    }

    /// The row as first appended, with a placeholder where the event formula goes.
    fn to_row(&self) -> Vec<CellValue> {
        vec![
            CellValue::DateTime(self.scheduled_at),
            CellValue::Text(self.notes.clone()),
            CellValue::Number(self.price),
            self.amount_paid.map(CellValue::Number).unwrap_or_default(),
            CellValue::Text(EVENT_PLACEHOLDER.to_string()),
            CellValue::Text(self.diagnosis.clone()),
        ]
    }

    fn from_row(document_id: &str, row: u32, cells: &[CellValue]) -> PortalResult<Self> {
        let malformed = |reason: String| PortalError::MalformedRow {
            document_id: document_id.to_string(),
            row,
            reason,
        };
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();

        let scheduled_at = match cell(0) {
            CellValue::DateTime(dt) => dt,
            CellValue::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            CellValue::Text(s) => parse_datetime(&s)
                .ok_or_else(|| malformed(format!("unreadable appointment time {s:?}")))?,
            other => return Err(malformed(format!("unreadable appointment time {other:?}"))),
        };

        let price = parse_amount(&cell(2))
            .map_err(|s| malformed(format!("unreadable price {s:?}")))?
            .ok_or_else(|| malformed("missing price".into()))?;

        let amount_paid =
            parse_amount(&cell(3)).map_err(|s| malformed(format!("unreadable amount paid {s:?}")))?;

        Ok(Self {
            scheduled_at,
            notes: cell(1).display(),
            price,
            amount_paid,
            event_reference: cell(4).to_string(),
            diagnosis: cell(5).display(),
        })
    }

    /// Appends this visit below the last row of `patient`'s log and installs the event formula.
    ///
    /// Returns the row written. The log header must already be in place; the append is refused
    /// otherwise so that visit data can never land in the header block.
    pub fn append_to(&self, store: &dyn TabularStore, patient: &Patient) -> PortalResult<u32> {
        let document_id = patient.id().ok_or(PortalError::AssetsNotProvisioned)?;
        self.append_to_document(store, document_id)
    }

    pub(crate) fn append_to_document(
        &self,
        store: &dyn TabularStore,
        document_id: &str,
    ) -> PortalResult<u32> {
        let last = store.last_row(document_id)?;
        if last < LOG_HEADER_ROW {
            return Err(PortalError::InvalidInput(format!(
                "document {document_id} has no visit log header at row {LOG_HEADER_ROW}"
            )));
        }

        let row = store.append_row(document_id, &self.to_row())?;
        let event_cell = CellRef::new(row, LOG_EVENT_COLUMN);
        if self.event_reference.is_empty() {
            store.write_cell(document_id, event_cell, CellValue::Empty)?;
        } else {
            store.set_formula(document_id, event_cell, &self.event_reference)?;
        }

        Ok(row)
    }

    /// The most recently appended visit of `patient`, if any.
    pub fn latest_for(store: &dyn TabularStore, patient: &Patient) -> PortalResult<Option<Self>> {
        let document_id = patient.id().ok_or(PortalError::AssetsNotProvisioned)?;
        Self::latest_in(store, document_id)
    }

    pub(crate) fn latest_in(store: &dyn TabularStore, document_id: &str) -> PortalResult<Option<Self>> {
        let last = store.last_row(document_id)?;
        if last < LOG_FIRST_DATA_ROW {
            return Ok(None);
        }

        let cells = store
            .read_range(document_id, RangeRef::row(last, 1, LOG_WIDTH))?
            .into_iter()
            .next()
            .unwrap_or_default();
        Self::from_row(document_id, last, &cells).map(Some)
    }

    /// Raw cells of every log row, oldest first.
    pub fn log_rows(store: &dyn TabularStore, document_id: &str) -> PortalResult<Vec<Vec<CellValue>>> {
        let last = store.last_row(document_id)?;
        if last < LOG_FIRST_DATA_ROW {
            return Ok(Vec::new());
        }
        Ok(store.read_range(
            document_id,
            RangeRef::rows(LOG_FIRST_DATA_ROW, last, 1, LOG_WIDTH),
        )?)
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// `Ok(None)` for a blank cell, `Err(text)` for something that is not a number.
fn parse_amount(cell: &CellValue) -> Result<Option<Decimal>, String> {
    match cell {
        CellValue::Number(n) => Ok(Some(*n)),
        c if c.is_empty() => Ok(None),
        CellValue::Text(s) => Decimal::from_str(s.trim())
            .map(Some)
            .map_err(|_| s.clone()),
        other => Err(other.display()),
    }
}
