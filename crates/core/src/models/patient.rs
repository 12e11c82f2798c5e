//! Patient records and the service that provisions them.
//!
//! A patient owns one folder under the practice root and one tabular document inside it. The
//! document's header block (rows 1 to 5) holds the demographics; the visit log starts below it.

use crate::a1::{CellRef, RangeRef};
use crate::config::CoreConfig;
use crate::constants::{
    HTTP_CODE_UNPROCESSABLE_ENTITY, LOG_HEADER_ROW, LOG_HEADER_TITLES, PATIENT_EMAIL_CELL,
    PATIENT_FOLDER_CELL, PATIENT_FOLDER_LINK_LABEL, PATIENT_GOV_ID_CELL, PATIENT_HEADER_LABELS,
    PATIENT_NAME_CELL, PATIENT_PHONE_CELL,
};
use crate::error::{PortalError, PortalResult};
use crate::links::hyperlink_formula;
use crate::models::Visit;
use crate::response::ViewDescriptor;
use crate::services::{CellValue, DocumentRef, FileStore, Folder, Services, TabularStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// View re-shown when an intake is rejected.
pub const NEW_PATIENT_VIEW: &str = "NewPatientForm";

/// Raw intake form fields, as posted by the new-patient form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeFields {
    pub patient_name: String,
    pub patient_gov_id: String,
    pub patient_phone: String,
    pub patient_email: String,
}

/// An intake that failed validation. The message is shown to the user as-is.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub name: String,
    pub gov_id: String,
    pub phone: String,
    pub email: String,
    /// Folder holding the patient document.
    pub folder: Option<Folder>,
    pub document: Option<DocumentRef>,
    pub latest_visit: Option<Visit>,
}

impl Patient {
    /// Validates intake fields and builds an unprovisioned patient. Touches no collaborator.
    pub fn new_intake(fields: &IntakeFields) -> Result<Self, ValidationError> {
        let name = fields.patient_name.trim();
        let gov_id = fields.patient_gov_id.trim();
        let phone = fields.patient_phone.trim();

        if name.is_empty() {
            return Err(ValidationError("Error: Patient name cannot be empty.".into()));
        }
        if gov_id.is_empty() {
            return Err(ValidationError("Error: patient Gov Id cannot be empty.".into()));
        }
        if phone.is_empty() {
            return Err(ValidationError("Error: patient Phone cannot be empty.".into()));
        }

        Ok(Self {
            name: name.to_string(),
            gov_id: gov_id.to_string(),
            phone: phone.to_string(),
            email: fields.patient_email.trim().to_string(),
            folder: None,
            document: None,
            latest_visit: None,
        })
    }

    /// Rebuilds a patient from their document: header cells, owning folder and latest visit.
    pub fn rehydrate(
        tabular: &dyn TabularStore,
        files: &dyn FileStore,
        document_id: &str,
    ) -> PortalResult<Self> {
        let document = tabular.open(document_id)?;
        let header = tabular.read_range(
            document_id,
            RangeRef::rows(PATIENT_NAME_CELL.row, PATIENT_EMAIL_CELL.row, 2, 2),
        )?;
        let value = |row: u32| {
            header
                .get((row - PATIENT_NAME_CELL.row) as usize)
                .and_then(|cells| cells.first())
                .map(CellValue::display)
                .unwrap_or_default()
        };

        let folder = files.parent_folder(document_id)?;
        let latest_visit = Visit::latest_in(tabular, document_id)?;

        Ok(Self {
            name: value(PATIENT_NAME_CELL.row),
            phone: value(PATIENT_PHONE_CELL.row),
            gov_id: value(PATIENT_GOV_ID_CELL.row),
            email: value(PATIENT_EMAIL_CELL.row),
            folder,
            document: Some(document),
            latest_visit,
        })
    }

    /// Id of the patient document, once provisioned.
    pub fn id(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.id.as_str())
    }

    pub fn is_provisioned(&self) -> bool {
        self.document.is_some()
    }

    /// Creates the patient folder under `root`, the patient document inside it, and writes the
    /// demographic header and visit log titles.
    ///
    /// # Errors
    ///
    /// Returns `AssetAlreadyProvisioned` if this patient already has a document. Collaborator
    /// failures are returned as they occur; steps already completed are not undone.
    pub fn create_assets(&mut self, services: &Services, root: &Folder) -> PortalResult<()> {
        if let Some(doc) = &self.document {
            return Err(PortalError::AssetAlreadyProvisioned(doc.id.clone()));
        }

        let millis = services.clock.now().and_utc().timestamp_millis();
        let folder_name = format!("{}_{millis}", folder_safe_name(&self.name));
        let folder = services.files.create_folder(Some(&root.id), &folder_name)?;

        let document = services
            .tabular
            .create_document(&format!("{} - Visit Log", self.name))?;
        services.files.move_document(&document.id, &folder.id)?;

        tracing::info!(
            "provisioned folder {} and document {} for a new patient",
            folder.id,
            document.id
        );

        self.folder = Some(folder);
        self.document = Some(document);
        self.write_header(services.tabular.as_ref())
    }

    fn write_header(&self, tabular: &dyn TabularStore) -> PortalResult<()> {
        let document_id = self.id().ok_or(PortalError::AssetsNotProvisioned)?;
        let values = [
            self.name.as_str(),
            self.phone.as_str(),
            self.gov_id.as_str(),
            "",
            self.email.as_str(),
        ];
        let rows: Vec<Vec<CellValue>> = PATIENT_HEADER_LABELS
            .iter()
            .zip(values)
            .map(|(label, value)| vec![CellValue::from(*label), CellValue::from(value)])
            .collect();
        tabular.write_range(document_id, CellRef::new(PATIENT_NAME_CELL.row, 1), &rows)?;

        if let Some(folder) = &self.folder {
            tabular.set_formula(
                document_id,
                PATIENT_FOLDER_CELL,
                &hyperlink_formula(&folder.url, PATIENT_FOLDER_LINK_LABEL),
            )?;
        }

        let titles: Vec<CellValue> = LOG_HEADER_TITLES
            .iter()
            .map(|t| CellValue::from(*t))
            .collect();
        tabular.write_range(document_id, CellRef::new(LOG_HEADER_ROW, 1), &[titles])?;
        Ok(())
    }

    /// Appends `visit` to the log and remembers it as the latest visit. Returns the row written.
    pub fn record_visit(&mut self, tabular: &dyn TabularStore, visit: Visit) -> PortalResult<u32> {
        let row = visit.append_to(tabular, self)?;
        self.latest_visit = Some(visit);
        Ok(row)
    }
}

/// Every character outside `[A-Za-z0-9]` becomes `_`.
fn folder_safe_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Result of processing an intake form.
#[derive(Debug)]
pub enum IntakeOutcome {
    /// Assets are provisioned and the header written.
    Created(Patient),
    /// Validation failed. Nothing was created; the form is re-shown with this descriptor.
    Rejected(ViewDescriptor),
}

/// Patient operations against the configured collaborators.
#[derive(Clone)]
pub struct PatientService {
    cfg: Arc<CoreConfig>,
    services: Services,
}

impl PatientService {
    pub fn new(cfg: Arc<CoreConfig>, services: Services) -> Self {
        Self { cfg, services }
    }

    /// Validates `fields` and, if valid, provisions the patient's folder and document.
    ///
    /// A rejection re-shows the intake form with status 422 and the submitted fields, so the
    /// user does not lose what they typed.
    pub fn create_from_intake(&self, fields: &IntakeFields) -> PortalResult<IntakeOutcome> {
        let mut patient = match Patient::new_intake(fields) {
            Ok(patient) => patient,
            Err(rejection) => {
                tracing::warn!("rejected patient intake: {rejection}");
                let view = ViewDescriptor::view(NEW_PATIENT_VIEW)
                    .with_status(HTTP_CODE_UNPROCESSABLE_ENTITY)
                    .with("error", &rejection.0)?
                    .with("patientData", fields)?;
                return Ok(IntakeOutcome::Rejected(view));
            }
        };

        let root = self.root_folder()?;
        patient.create_assets(&self.services, &root)?;
        Ok(IntakeOutcome::Created(patient))
    }

    pub fn load_by_id(&self, document_id: &str) -> PortalResult<Patient> {
        Patient::rehydrate(
            self.services.tabular.as_ref(),
            self.services.files.as_ref(),
            document_id,
        )
    }

    pub fn record_visit(&self, patient: &mut Patient, visit: Visit) -> PortalResult<u32> {
        patient.record_visit(self.services.tabular.as_ref(), visit)
    }

    /// The practice root folder. The first folder with the configured name wins; one is created
    /// when none exists.
    pub fn root_folder(&self) -> PortalResult<Folder> {
        let name = self.cfg.root_folder_name();
        if let Some(folder) = self.services.files.find_folders_by_name(name)?.into_iter().next() {
            return Ok(folder);
        }
        tracing::info!("root folder {name} not found, creating it");
        Ok(self.services.files.create_folder(None, name)?)
    }
}
