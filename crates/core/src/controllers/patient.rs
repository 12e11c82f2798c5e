//! Patient pages: detail, intake and the new-visit form.

use crate::dispatch::{Dispatcher, RequestContext};
use crate::error::{PortalError, PortalResult};
use crate::links::{page_link, patient_detail_link};
use crate::models::{IntakeFields, IntakeOutcome};
use crate::response::ViewDescriptor;
use serde_json::json;

pub const PATIENT_DETAIL_VIEW: &str = "PatientDetailForm";
pub const NEW_VISIT_VIEW: &str = "NewVisitForm";
pub use crate::models::patient::NEW_PATIENT_VIEW;

pub fn patient_detail(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let patient_id = ctx.require("patientId")?;
    let patient = d.patients().load_by_id(&patient_id)?;
    let new_visit_link = page_link(
        &ctx.base_url,
        "NewVisit",
        &json!({ "patientId": patient_id }),
    )?;

    ViewDescriptor::view(PATIENT_DETAIL_VIEW)
        .with("patient", &patient)?
        .with("patient_id", &patient_id)?
        .with("new_visit_link", &new_visit_link)
}

pub fn new_patient(_: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    ViewDescriptor::view(NEW_PATIENT_VIEW).with("details", &ctx.query)
}

/// Provisions a patient from the intake form, indexes them and redirects to their detail page.
pub fn create_new_patient(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let field = |key: &str| ctx.param(key).unwrap_or_default();
    let fields = IntakeFields {
        patient_name: field("patientName"),
        patient_gov_id: field("patientGovId"),
        patient_phone: field("patientPhone"),
        patient_email: field("patientEmail"),
    };
    let patient = match d.patients().create_from_intake(&fields)? {
        IntakeOutcome::Created(patient) => patient,
        IntakeOutcome::Rejected(view) => return Ok(view),
    };

    let created = d.services().clock.now().date();
    if let Err(e) = d.master_index().append(&patient, created) {
        tracing::error!(
            "patient document {:?} created but not indexed: {e}",
            patient.id()
        );
        return Err(e);
    }

    let patient_id = patient.id().ok_or(PortalError::AssetsNotProvisioned)?;
    Ok(ViewDescriptor::redirect(patient_detail_link(
        &ctx.base_url,
        patient_id,
    )?))
}

/// The booking form for an existing patient, prefilled with the practice defaults.
pub fn new_visit(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let patient_id = ctx.require("patientId")?;
    let patient = d.patients().load_by_id(&patient_id)?;

    ViewDescriptor::view(NEW_VISIT_VIEW)
        .with("patient", &patient)?
        .with("patient_id", &patient_id)?
        .with("default_price", &d.cfg().visit_default_price().to_string())?
        .with("duration_minutes", &d.cfg().visit_duration_minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HTTP_CODE_UNPROCESSABLE_ENTITY;
    use crate::controllers::test_support::{harness, rendered};
    use crate::services::TabularStore;
    use serde_json::{json, Map, Value};

    #[test]
    fn intake_redirects_to_detail_and_indexes_patient() {
        let h = harness();
        let id = h.create_patient("Ada Lovelace", "GOV-1815");

        // master header plus one patient row
        assert_eq!(h.backend.last_row("master").expect("last row"), 2);
        let entries = h.dispatcher.master_index().entries().expect("entries");
        assert_eq!(entries[0].document_id, id);
        assert_eq!(entries[0].name, "Ada Lovelace");
    }

    #[test]
    fn rejected_intake_echoes_input_with_422() {
        let h = harness();
        let before = h.backend.document_count();
        let envelope = h.call(
            "createNewPatient",
            json!({ "patientName": "Ada", "patientGovId": "", "patientPhone": "1" }),
        );
        assert_eq!(envelope.status, HTTP_CODE_UNPROCESSABLE_ENTITY);

        let (view, scope) = rendered(&envelope);
        assert_eq!(view, NEW_PATIENT_VIEW);
        assert_eq!(
            scope.get("error"),
            Some(&Value::from("Error: patient Gov Id cannot be empty."))
        );
        assert_eq!(scope["patientData"]["patientName"], "Ada");
        assert_eq!(h.backend.document_count(), before);
        assert_eq!(h.backend.folder_count(), 0);
        assert_eq!(h.backend.last_row("master").expect("last row"), 0);
    }

    #[test]
    fn null_name_is_rejected_with_422() {
        let h = harness();
        let envelope = h.call(
            "createNewPatient",
            json!({ "patientName": null, "patientGovId": "G-1", "patientPhone": "1" }),
        );
        assert_eq!(envelope.status, HTTP_CODE_UNPROCESSABLE_ENTITY);
        let (_, scope) = rendered(&envelope);
        assert_eq!(
            scope.get("error"),
            Some(&Value::from("Error: Patient name cannot be empty."))
        );
        assert_eq!(h.backend.document_count(), 1);
    }

    #[test]
    fn numeric_phone_is_accepted_as_text() {
        let h = harness();
        let envelope = h.call(
            "createNewPatient",
            json!({ "patientName": "Ada", "patientGovId": "G-1", "patientPhone": 5550100 }),
        );
        assert_eq!(envelope.status, 302, "intake failed: {}", envelope.content);

        let id = h.dispatcher.master_index().entries().expect("entries")[0]
            .document_id
            .clone();
        let patient = h.dispatcher.patients().load_by_id(&id).expect("load");
        assert_eq!(patient.phone, "5550100");
    }

    #[test]
    fn detail_shows_rehydrated_patient() {
        let h = harness();
        let id = h.create_patient("Ada Lovelace", "GOV-1815");

        let (view, scope) = rendered(&h.call("patientDetail", json!({ "patientId": id })));
        assert_eq!(view, PATIENT_DETAIL_VIEW);
        assert_eq!(scope["patient"]["name"], "Ada Lovelace");
        assert_eq!(scope["patient"]["govId"], "GOV-1815");
        assert_eq!(scope["patient"]["latestVisit"], Value::Null);
        assert!(scope["new_visit_link"]
            .as_str()
            .is_some_and(|l| l.starts_with("https://x/?page=NewVisit&data=")));
    }

    #[test]
    fn detail_without_patient_id_is_invalid_input() {
        let h = harness();
        let err = h
            .dispatcher
            .dispatch_async(Some("patientDetail"), Map::new(), None)
            .expect_err("missing id");
        assert!(matches!(err, PortalError::InvalidInput(_)));
    }

    #[test]
    fn new_patient_echoes_details() {
        let h = harness();
        let (view, scope) = rendered(&h.call("newPatient", json!({ "patientName": "Ada" })));
        assert_eq!(view, NEW_PATIENT_VIEW);
        assert_eq!(scope["details"]["patientName"], "Ada");
    }

    #[test]
    fn new_visit_binds_defaults() {
        let h = harness();
        let id = h.create_patient("Ada Lovelace", "GOV-1815");
        let (view, scope) = rendered(&h.call("newVisit", json!({ "patientId": id })));
        assert_eq!(view, NEW_VISIT_VIEW);
        assert_eq!(scope["default_price"], "30000.00");
        assert_eq!(scope["duration_minutes"], 60);
        assert_eq!(scope["patient_id"], Value::from(id));
    }
}
