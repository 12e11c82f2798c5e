//! Collaborator boundaries.
//!
//! The tabular-document engine, the scheduling calendar and the hierarchical file store are
//! external services. Core code only talks to them through the traits in this module, bundled
//! together in [`Services`] and handed to the dispatcher at startup.
//!
//! Every call is attempted once. Nothing here retries or compensates.

pub mod calendar;
pub mod files;
pub mod tabular;

pub use calendar::{CalendarEvent, CalendarService, NewEvent};
pub use files::{FileStore, Folder};
pub use tabular::{CellValue, DocumentRef, TabularStore};

use chrono::NaiveDateTime;
use std::sync::Arc;

/// Failures reported by a collaborator service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("folder not found: {0}")]
    FolderNotFound(String),
    #[error("calendar not found: {0}")]
    CalendarNotFound(String),
    #[error("event not found: {0}")]
    EventNotFound(String),
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },
    #[error("range {range} is outside document {document_id}")]
    OutOfBounds { document_id: String, range: String },
    #[error("failed to read local snapshot: {0}")]
    SnapshotRead(std::io::Error),
    #[error("failed to write local snapshot: {0}")]
    SnapshotWrite(std::io::Error),
    #[error("failed to (de)serialize local snapshot: {0}")]
    SnapshotFormat(serde_json::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Supplies the address of the user the host has authenticated.
pub trait IdentityProvider: Send + Sync {
    fn active_user_email(&self) -> String;
}

/// A fixed identity, for hosts that authenticate outside this process.
#[derive(Clone, Debug)]
pub struct StaticIdentity(pub String);

impl IdentityProvider for StaticIdentity {
    fn active_user_email(&self) -> String {
        self.0.clone()
    }
}

/// Wall-clock source in the practice's local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock stuck at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// All collaborators a request may touch.
#[derive(Clone)]
pub struct Services {
    pub tabular: Arc<dyn TabularStore>,
    pub calendar: Arc<dyn CalendarService>,
    pub files: Arc<dyn FileStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Bundles a backend that implements every storage collaborator.
    pub fn from_backend<B>(
        backend: Arc<B>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        B: TabularStore + CalendarService + FileStore + 'static,
    {
        Self {
            tabular: backend.clone(),
            calendar: backend.clone(),
            files: backend,
            identity,
            clock,
        }
    }
}
