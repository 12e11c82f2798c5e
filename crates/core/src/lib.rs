//! # MDSolo Core
//!
//! Core logic for the MDSolo practice portal.
//!
//! This crate contains:
//! - Page dispatch: controller registry, view descriptors, template rendering and envelopes
//! - The patient and visit model stored in tabular documents
//! - The master index and patient search
//! - Collaborator traits for the document store, calendar and file store, plus a local backend
//!
//! **No transport concerns**: HTTP serving and the command line live in `api-rest` and `cli`.

pub mod a1;
pub mod backends;
pub mod config;
pub mod constants;
pub mod controllers;
pub mod dispatch;
pub mod error;
pub mod links;
pub mod master_index;
pub mod models;
pub mod response;
pub mod services;

pub use backends::LocalBackend;
pub use config::CoreConfig;
pub use controllers::default_registry;
pub use dispatch::{ControllerRegistry, Dispatcher, RequestContext, TeraRenderer, ViewRenderer};
pub use error::{PortalError, PortalResult};
pub use master_index::{MasterIndex, SearchMatch};
pub use models::{IntakeFields, IntakeOutcome, Patient, PatientService, Visit};
pub use response::{Document, Envelope, ResponseMetadata, ViewDescriptor};
pub use services::{
    Clock, FixedClock, IdentityProvider, Services, StaticIdentity, SystemClock,
};
