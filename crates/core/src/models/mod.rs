//! Entity models: patients and their visits.

pub mod patient;
pub mod visit;

pub use patient::{IntakeFields, IntakeOutcome, Patient, PatientService, ValidationError};
pub use visit::Visit;
