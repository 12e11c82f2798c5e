//! In-process backend for every storage collaborator.
//!
//! `LocalBackend` keeps documents, folders and calendar events in memory. When opened with a
//! snapshot path, every mutating call writes the whole state back to that JSON file before
//! returning, so a restarted process sees the same records.
//!
//! Each trait call takes the state lock once, which makes a single call atomic. Nothing spans
//! calls: two requests appending to the same document may interleave, as with a shared remote
//! store.

use crate::a1::{CellRef, RangeRef};
use crate::services::{
    CalendarEvent, CalendarService, CellValue, DocumentRef, FileStore, Folder, NewEvent,
    ServiceError, ServiceResult, TabularStore,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DOCUMENT_URL_PREFIX: &str = "local://documents/";
const FOLDER_URL_PREFIX: &str = "local://folders/";
const EVENT_ID_SUFFIX: &str = "@local";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LocalDocument {
    meta: DocumentRef,
    rows: Vec<Vec<CellValue>>,
}

impl LocalDocument {
    fn last_row(&self) -> u32 {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|idx| idx as u32 + 1)
            .unwrap_or(0)
    }

    fn put(&mut self, cell: CellRef, value: CellValue) {
        let (r, c) = ((cell.row - 1) as usize, (cell.col - 1) as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let row = &mut self.rows[r];
        if row.len() <= c {
            row.resize_with(c + 1, CellValue::default);
        }
        row[c] = value;
    }

    fn get(&self, cell: CellRef) -> CellValue {
        self.rows
            .get((cell.row - 1) as usize)
            .and_then(|row| row.get((cell.col - 1) as usize))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FolderEntry {
    folder: Folder,
    parent: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalState {
    documents: BTreeMap<String, LocalDocument>,
    folders: Vec<FolderEntry>,
    /// document id → folder id
    placements: BTreeMap<String, String>,
    /// calendar id → events
    calendars: BTreeMap<String, Vec<CalendarEvent>>,
}

impl LocalState {
    fn document(&self, id: &str) -> ServiceResult<&LocalDocument> {
        self.documents
            .get(id)
            .ok_or_else(|| ServiceError::DocumentNotFound(id.to_string()))
    }

    fn document_mut(&mut self, id: &str) -> ServiceResult<&mut LocalDocument> {
        self.documents
            .get_mut(id)
            .ok_or_else(|| ServiceError::DocumentNotFound(id.to_string()))
    }

    fn folder(&self, id: &str) -> ServiceResult<&Folder> {
        self.folders
            .iter()
            .map(|entry| &entry.folder)
            .find(|folder| folder.id == id)
            .ok_or_else(|| ServiceError::FolderNotFound(id.to_string()))
    }
}

/// Injected failures, never persisted.
#[derive(Debug, Default)]
struct Faults {
    unreadable_documents: HashSet<String>,
    calendar_unavailable: bool,
}

/// Local implementation of [`TabularStore`], [`CalendarService`] and [`FileStore`].
#[derive(Debug, Default)]
pub struct LocalBackend {
    state: Mutex<LocalState>,
    faults: Mutex<Faults>,
    snapshot: Option<PathBuf>,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LocalBackend {
    /// A purely in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend persisted to `path`. The file is loaded if it exists and created on the first
    /// mutation otherwise.
    pub fn open(path: impl Into<PathBuf>) -> ServiceResult<Self> {
        let path = path.into();
        let state = if path.is_file() {
            let raw = fs::read(&path).map_err(ServiceError::SnapshotRead)?;
            serde_json::from_slice(&raw).map_err(ServiceError::SnapshotFormat)?
        } else {
            LocalState::default()
        };

        tracing::info!("local backend snapshot at {}", path.display());

        Ok(Self {
            state: Mutex::new(state),
            faults: Mutex::new(Faults::default()),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    /// Returns the document with this exact id, creating it empty if it does not exist yet.
    ///
    /// Used at startup to provision the master index under its configured id.
    pub fn ensure_document(&self, id: &str, title: &str) -> ServiceResult<DocumentRef> {
        self.mutate(|state| {
            let doc = state
                .documents
                .entry(id.to_string())
                .or_insert_with(|| LocalDocument {
                    meta: DocumentRef {
                        id: id.to_string(),
                        title: title.to_string(),
                        url: format!("{DOCUMENT_URL_PREFIX}{id}"),
                    },
                    rows: Vec::new(),
                });
            Ok(doc.meta.clone())
        })
    }

    pub fn document_count(&self) -> usize {
        lock(&self.state).documents.len()
    }

    pub fn folder_count(&self) -> usize {
        lock(&self.state).folders.len()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.state).calendars.values().map(Vec::len).sum()
    }

    /// All document ids, sorted.
    pub fn document_ids(&self) -> Vec<String> {
        lock(&self.state).documents.keys().cloned().collect()
    }

    /// Makes every read of `document_id` fail until the backend is dropped.
    pub fn fail_reads_for(&self, document_id: &str) {
        lock(&self.faults)
            .unreadable_documents
            .insert(document_id.to_string());
    }

    pub fn set_calendar_available(&self, available: bool) {
        lock(&self.faults).calendar_unavailable = !available;
    }

    fn check_readable(&self, document_id: &str) -> ServiceResult<()> {
        if lock(&self.faults).unreadable_documents.contains(document_id) {
            return Err(ServiceError::Unavailable {
                service: "tabular",
                message: format!("document {document_id} cannot be read"),
            });
        }
        Ok(())
    }

    fn check_calendar(&self) -> ServiceResult<()> {
        if lock(&self.faults).calendar_unavailable {
            return Err(ServiceError::Unavailable {
                service: "calendar",
                message: "calendar service is not responding".into(),
            });
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&LocalState) -> ServiceResult<T>) -> ServiceResult<T> {
        f(&lock(&self.state))
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut LocalState) -> ServiceResult<T>) -> ServiceResult<T> {
        let mut state = lock(&self.state);
        let out = f(&mut state)?;
        if let Some(path) = &self.snapshot {
            persist(path, &state)?;
        }
        Ok(out)
    }
}

fn persist(path: &Path, state: &LocalState) -> ServiceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(ServiceError::SnapshotWrite)?;
    }
    let raw = serde_json::to_vec_pretty(state).map_err(ServiceError::SnapshotFormat)?;
    fs::write(path, raw).map_err(ServiceError::SnapshotWrite)
}

impl TabularStore for LocalBackend {
    fn create_document(&self, title: &str) -> ServiceResult<DocumentRef> {
        self.mutate(|state| {
            let id = new_id();
            let meta = DocumentRef {
                id: id.clone(),
                title: title.to_string(),
                url: format!("{DOCUMENT_URL_PREFIX}{id}"),
            };
            state.documents.insert(
                id,
                LocalDocument {
                    meta: meta.clone(),
                    rows: Vec::new(),
                },
            );
            Ok(meta)
        })
    }

    fn open(&self, document_id: &str) -> ServiceResult<DocumentRef> {
        self.check_readable(document_id)?;
        self.read(|state| Ok(state.document(document_id)?.meta.clone()))
    }

    fn read_range(&self, document_id: &str, range: RangeRef) -> ServiceResult<Vec<Vec<CellValue>>> {
        self.check_readable(document_id)?;
        self.read(|state| {
            let doc = state.document(document_id)?;
            Ok((range.start.row..=range.end.row)
                .map(|row| {
                    (range.start.col..=range.end.col)
                        .map(|col| doc.get(CellRef::new(row, col)))
                        .collect()
                })
                .collect())
        })
    }

    fn write_range(
        &self,
        document_id: &str,
        start: CellRef,
        rows: &[Vec<CellValue>],
    ) -> ServiceResult<()> {
        if start.row == 0 || start.col == 0 {
            return Err(ServiceError::OutOfBounds {
                document_id: document_id.to_string(),
                range: format!("R{}C{}", start.row, start.col),
            });
        }
        self.mutate(|state| {
            let doc = state.document_mut(document_id)?;
            for (dr, row) in rows.iter().enumerate() {
                for (dc, value) in row.iter().enumerate() {
                    doc.put(
                        CellRef::new(start.row + dr as u32, start.col + dc as u32),
                        value.clone(),
                    );
                }
            }
            Ok(())
        })
    }

    fn append_row(&self, document_id: &str, row: &[CellValue]) -> ServiceResult<u32> {
        self.mutate(|state| {
            let doc = state.document_mut(document_id)?;
            let target = doc.last_row() + 1;
            for (dc, value) in row.iter().enumerate() {
                doc.put(CellRef::new(target, dc as u32 + 1), value.clone());
            }
            Ok(target)
        })
    }

    fn last_row(&self, document_id: &str) -> ServiceResult<u32> {
        self.check_readable(document_id)?;
        self.read(|state| Ok(state.document(document_id)?.last_row()))
    }

    fn set_formula(&self, document_id: &str, cell: CellRef, formula: &str) -> ServiceResult<()> {
        if cell.row == 0 || cell.col == 0 {
            return Err(ServiceError::OutOfBounds {
                document_id: document_id.to_string(),
                range: cell.to_string(),
            });
        }
        self.mutate(|state| {
            state
                .document_mut(document_id)?
                .put(cell, CellValue::Formula(formula.to_string()));
            Ok(())
        })
    }
}

impl CalendarService for LocalBackend {
    fn create_event(&self, calendar_id: &str, event: NewEvent) -> ServiceResult<CalendarEvent> {
        self.check_calendar()?;
        self.mutate(|state| {
            let created = CalendarEvent {
                id: format!("{}{EVENT_ID_SUFFIX}", new_id()),
                title: event.title,
                description: event.description,
                start: event.start,
                end: event.end,
                html_link: None,
            };
            state
                .calendars
                .entry(calendar_id.to_string())
                .or_default()
                .push(created.clone());
            Ok(created)
        })
    }

    fn get_event(&self, calendar_id: &str, event_id: &str) -> ServiceResult<CalendarEvent> {
        self.check_calendar()?;
        self.read(|state| {
            let events = state
                .calendars
                .get(calendar_id)
                .ok_or_else(|| ServiceError::CalendarNotFound(calendar_id.to_string()))?;
            events
                .iter()
                .find(|e| e.id == event_id)
                .cloned()
                .ok_or_else(|| ServiceError::EventNotFound(event_id.to_string()))
        })
    }

    fn events_between(
        &self,
        calendar_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ServiceResult<Vec<CalendarEvent>> {
        self.check_calendar()?;
        self.read(|state| {
            let mut found: Vec<CalendarEvent> = state
                .calendars
                .get(calendar_id)
                .map(|events| {
                    events
                        .iter()
                        .filter(|e| e.start < end && e.end > start)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            found.sort_by_key(|e| e.start);
            Ok(found)
        })
    }
}

impl FileStore for LocalBackend {
    fn find_folders_by_name(&self, name: &str) -> ServiceResult<Vec<Folder>> {
        self.read(|state| {
            Ok(state
                .folders
                .iter()
                .filter(|entry| entry.folder.name == name)
                .map(|entry| entry.folder.clone())
                .collect())
        })
    }

    fn create_folder(&self, parent: Option<&str>, name: &str) -> ServiceResult<Folder> {
        self.mutate(|state| {
            if let Some(parent_id) = parent {
                state.folder(parent_id)?;
            }
            let id = new_id();
            let folder = Folder {
                url: format!("{FOLDER_URL_PREFIX}{id}"),
                id,
                name: name.to_string(),
            };
            state.folders.push(FolderEntry {
                folder: folder.clone(),
                parent: parent.map(str::to_string),
            });
            Ok(folder)
        })
    }

    fn move_document(&self, document_id: &str, folder_id: &str) -> ServiceResult<()> {
        self.mutate(|state| {
            state.document(document_id)?;
            state.folder(folder_id)?;
            state
                .placements
                .insert(document_id.to_string(), folder_id.to_string());
            Ok(())
        })
    }

    fn parent_folder(&self, document_id: &str) -> ServiceResult<Option<Folder>> {
        self.read(|state| {
            state.document(document_id)?;
            match state.placements.get(document_id) {
                Some(folder_id) => Ok(Some(state.folder(folder_id)?.clone())),
                None => Ok(None),
            }
        })
    }
}
