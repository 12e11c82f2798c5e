//! The master index: one row per patient in a single practice-wide document, used for search.
//!
//! Columns, from row 2 on: name, government id, folder link, document link, document id,
//! creation date. Row 1 holds the column titles.

use crate::a1::{CellRef, RangeRef};
use crate::config::CoreConfig;
use crate::constants::{
    INDEX_FIRST_DATA_ROW, INDEX_FOLDER_COLUMN, INDEX_FOLDER_LINK_LABEL, INDEX_FOLDER_PLACEHOLDER,
    INDEX_HEADER_TITLES, INDEX_SHEET_COLUMN, INDEX_SHEET_LINK_LABEL, INDEX_SHEET_PLACEHOLDER,
    INDEX_WIDTH,
};
use crate::error::{PortalError, PortalResult};
use crate::links::{encode_data, hyperlink_formula};
use crate::models::{Patient, Visit};
use crate::services::{CellValue, TabularStore};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// One master index row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexEntry {
    pub row: u32,
    pub name: String,
    pub gov_id: String,
    pub document_id: String,
    pub created: Option<NaiveDate>,
}

/// A search hit, shaped for the results view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub name: String,
    pub gov_id: String,
    /// `yyyy-MM-dd`, or `N/A` when the index holds no date.
    pub date_created: String,
    /// Relative link to the patient's detail page.
    pub details_link: String,
}

#[derive(Clone)]
pub struct MasterIndex {
    cfg: Arc<CoreConfig>,
    tabular: Arc<dyn TabularStore>,
}

impl MasterIndex {
    pub fn new(cfg: Arc<CoreConfig>, tabular: Arc<dyn TabularStore>) -> Self {
        Self { cfg, tabular }
    }

    fn document_id(&self) -> &str {
        self.cfg.master_sheet_id()
    }

    /// Writes the column titles into row 1 if the index is still empty.
    pub fn ensure_header(&self) -> PortalResult<()> {
        let id = self.document_id();
        if self.tabular.last_row(id)? > 0 {
            return Ok(());
        }
        let titles: Vec<CellValue> = INDEX_HEADER_TITLES
            .iter()
            .map(|t| CellValue::from(*t))
            .collect();
        self.tabular.write_range(id, CellRef::new(1, 1), &[titles])?;
        Ok(())
    }

    /// Records a provisioned patient. Returns the row written.
    pub fn append(&self, patient: &Patient, created: NaiveDate) -> PortalResult<u32> {
        let (Some(folder), Some(document)) = (&patient.folder, &patient.document) else {
            return Err(PortalError::AssetsNotProvisioned);
        };
        self.ensure_header()?;

        let id = self.document_id();
        let row = self.tabular.append_row(
            id,
            &[
                CellValue::from(patient.name.as_str()),
                CellValue::from(patient.gov_id.as_str()),
                CellValue::from(INDEX_FOLDER_PLACEHOLDER),
                CellValue::from(INDEX_SHEET_PLACEHOLDER),
                CellValue::from(document.id.as_str()),
                CellValue::Date(created),
            ],
        )?;
        self.tabular.set_formula(
            id,
            CellRef::new(row, INDEX_FOLDER_COLUMN),
            &hyperlink_formula(&folder.url, INDEX_FOLDER_LINK_LABEL),
        )?;
        self.tabular.set_formula(
            id,
            CellRef::new(row, INDEX_SHEET_COLUMN),
            &hyperlink_formula(&document.url, INDEX_SHEET_LINK_LABEL),
        )?;

        tracing::info!("master index row {row} added for document {}", document.id);
        Ok(row)
    }

    /// Every indexed patient, in index order.
    pub fn entries(&self) -> PortalResult<Vec<IndexEntry>> {
        let id = self.document_id();
        let last = self.tabular.last_row(id)?;
        if last < INDEX_FIRST_DATA_ROW {
            return Ok(Vec::new());
        }

        let rows = self
            .tabular
            .read_range(id, RangeRef::rows(INDEX_FIRST_DATA_ROW, last, 1, INDEX_WIDTH))?;
        Ok(rows
            .into_iter()
            .zip(INDEX_FIRST_DATA_ROW..)
            .map(|(cells, row)| {
                let text = |idx: usize| cells.get(idx).map(CellValue::display).unwrap_or_default();
                IndexEntry {
                    row,
                    name: text(0),
                    gov_id: text(1),
                    document_id: text(4),
                    created: match cells.get(5) {
                        Some(CellValue::Date(d)) => Some(*d),
                        Some(CellValue::DateTime(dt)) => Some(dt.date()),
                        _ => None,
                    },
                }
            })
            .collect())
    }

    /// Finds patients whose name or government id contains `term`, or whose visit log contains
    /// `diagnosis_keyword`, both case-insensitively.
    ///
    /// A row satisfying either criterion is returned, even when both were supplied. Blank
    /// criteria are ignored; with neither, nothing matches. Patients whose log cannot be read are
    /// logged and treated as not matching the keyword.
    pub fn search(
        &self,
        term: Option<&str>,
        diagnosis_keyword: Option<&str>,
    ) -> PortalResult<Vec<SearchMatch>> {
        let term = normalise(term);
        let keyword = normalise(diagnosis_keyword);
        if term.is_none() && keyword.is_none() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for entry in self.entries()? {
            let general = term.as_deref().is_some_and(|t| {
                entry.name.to_lowercase().contains(t) || entry.gov_id.to_lowercase().contains(t)
            });
            let diagnosis = !general
                && keyword
                    .as_deref()
                    .is_some_and(|k| self.log_mentions(&entry, k));

            if general || diagnosis {
                matches.push(SearchMatch {
                    details_link: format!(
                        "?page=PatientDetail&data={}",
                        encode_data(&serde_json::json!({ "patientId": entry.document_id }))?
                    ),
                    date_created: entry
                        .created
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "N/A".to_string()),
                    name: entry.name,
                    gov_id: entry.gov_id,
                });
            }
        }
        Ok(matches)
    }

    fn log_mentions(&self, entry: &IndexEntry, keyword: &str) -> bool {
        if entry.document_id.is_empty() {
            return false;
        }
        match Visit::log_rows(self.tabular.as_ref(), &entry.document_id) {
            Ok(rows) => rows
                .iter()
                .flatten()
                .any(|cell| cell.display().to_lowercase().contains(keyword)),
            Err(e) => {
                tracing::warn!(
                    "skipping patient {} (index row {}) in keyword search: {e}",
                    entry.name,
                    entry.row
                );
                false
            }
        }
    }
}

fn normalise(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LocalBackend;
    use crate::constants::{LOG_HEADER_ROW, LOG_HEADER_TITLES};
    use crate::services::Folder;

    struct Fixture {
        backend: Arc<LocalBackend>,
        index: MasterIndex,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(LocalBackend::new());
        backend
            .ensure_document("master", "Master Index")
            .expect("master document");
        let cfg = CoreConfig::new("https://x/", "master", "md@example.com", "UTC")
            .expect("config should be valid");
        let index = MasterIndex::new(Arc::new(cfg), backend.clone());
        Fixture { backend, index }
    }

    fn created() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 29).expect("valid date")
    }

    /// Indexes a patient whose log holds one visit with the given notes.
    fn add_patient(f: &Fixture, name: &str, gov_id: &str, notes: &str) -> String {
        let doc = f
            .backend
            .create_document(&format!("{name} - Visit Log"))
            .expect("create document");
        let titles: Vec<CellValue> = LOG_HEADER_TITLES
            .iter()
            .map(|t| CellValue::from(*t))
            .collect();
        f.backend
            .write_range(&doc.id, CellRef::new(LOG_HEADER_ROW, 1), &[titles])
            .expect("log header");
        f.backend
            .append_row(
                &doc.id,
                &["2025-12-30T14:00".into(), notes.into(), "30000".into()],
            )
            .expect("visit row");

        let patient = Patient {
            name: name.into(),
            gov_id: gov_id.into(),
            phone: "555".into(),
            email: String::new(),
            folder: Some(Folder {
                id: format!("f-{gov_id}"),
                name: name.into(),
                url: format!("local://folders/f-{gov_id}"),
            }),
            document: Some(doc.clone()),
            latest_visit: None,
        };
        f.index.append(&patient, created()).expect("index append");
        doc.id
    }

    #[test]
    fn append_writes_header_once_and_link_formulas() {
        let f = fixture();
        let doc = add_patient(&f, "Ada Lovelace", "G-1", "checkup");
        add_patient(&f, "Alan Turing", "G-2", "checkup");

        let header = f.backend.read_cell("master", CellRef::new(1, 1)).expect("read");
        assert_eq!(header, CellValue::from("Name"));
        assert_eq!(f.backend.last_row("master").expect("last row"), 3);

        let folder = f.backend.read_cell("master", CellRef::new(2, 3)).expect("read");
        assert_eq!(
            folder,
            CellValue::Formula("=HYPERLINK(\"local://folders/f-G-1\", \"View Folder\")".into())
        );
        let sheet = f.backend.read_cell("master", CellRef::new(2, 4)).expect("read");
        assert!(matches!(sheet, CellValue::Formula(ref s) if s.ends_with("\"View Patient Sheet\")")));

        let entries = f.index.entries().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].document_id, doc);
        assert_eq!(entries[0].created, Some(created()));
    }

    #[test]
    fn unprovisioned_patient_is_not_indexed() {
        let f = fixture();
        let patient = Patient {
            name: "Ada".into(),
            gov_id: "G".into(),
            phone: "1".into(),
            email: String::new(),
            folder: None,
            document: None,
            latest_visit: None,
        };
        assert!(matches!(
            f.index.append(&patient, created()),
            Err(PortalError::AssetsNotProvisioned)
        ));
        assert_eq!(f.backend.last_row("master").expect("last row"), 0);
    }

    #[test]
    fn term_matches_name_or_gov_id_case_insensitively() {
        let f = fixture();
        let doc = add_patient(&f, "Ada Lovelace", "GOV-1815", "checkup");
        add_patient(&f, "Alan Turing", "GOV-1912", "checkup");

        let hits = f.index.search(Some("LOVE"), None).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Ada Lovelace");
        assert_eq!(hits[0].date_created, "2025-12-29");
        assert_eq!(
            hits[0].details_link,
            format!("?page=PatientDetail&data=%7B%22patientId%22%3A%22{doc}%22%7D")
        );

        assert_eq!(f.index.search(Some("gov-19"), None).expect("search").len(), 1);
    }

    #[test]
    fn either_criterion_is_enough() {
        let f = fixture();
        add_patient(&f, "Ada Lovelace", "G-1", "routine checkup");
        add_patient(&f, "Alan Turing", "G-2", "Suspected INFLUENZA");

        let hits = f
            .index
            .search(Some("lovelace"), Some("influenza"))
            .expect("search");
        let names: Vec<&str> = hits.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Alan Turing"]);
    }

    #[test]
    fn keyword_ignores_link_formula_text() {
        let f = fixture();
        let doc = add_patient(&f, "Ada Lovelace", "G-1", "checkup");
        f.backend
            .set_formula(
                &doc,
                CellRef::new(LOG_HEADER_ROW + 1, 5),
                "=HYPERLINK(\"https://calendar.google.com/calendar/event?eid=ZXZ0\", \"View Event\")",
            )
            .expect("event link");

        for keyword in ["calendar", "google", "hyperlink", "eid="] {
            assert!(
                f.index.search(None, Some(keyword)).expect("search").is_empty(),
                "{keyword} should not match"
            );
        }
        assert_eq!(
            f.index.search(None, Some("view event")).expect("search").len(),
            1
        );
    }

    #[test]
    fn blank_criteria_match_nothing() {
        let f = fixture();
        add_patient(&f, "Ada Lovelace", "G-1", "checkup");
        assert!(f.index.search(None, None).expect("search").is_empty());
        assert!(f.index.search(Some("  "), Some("")).expect("search").is_empty());
    }

    #[test]
    fn unreadable_candidate_is_skipped() {
        let f = fixture();
        let broken = add_patient(&f, "Ada Lovelace", "G-1", "influenza");
        add_patient(&f, "Alan Turing", "G-2", "influenza");
        f.backend.fail_reads_for(&broken);

        let hits = f.index.search(None, Some("influenza")).expect("search");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Alan Turing");
    }

    #[test]
    fn missing_date_reads_as_not_available() {
        let f = fixture();
        f.index.ensure_header().expect("header");
        f.backend
            .append_row(
                "master",
                &["Grace".into(), "G-3".into(), "".into(), "".into(), "d".into()],
            )
            .expect("append");
        let hits = f.index.search(Some("grace"), None).expect("search");
        assert_eq!(hits[0].date_created, "N/A");
    }
}
