//! Visit booking: calendar event first, then the visit log row.

use super::patient::NEW_VISIT_VIEW;
use crate::constants::HTTP_CODE_BAD_REQUEST;
use crate::dispatch::{Dispatcher, RequestContext};
use crate::error::{PortalError, PortalResult};
use crate::links::{event_reference, patient_detail_link};
use crate::models::Visit;
use crate::response::ViewDescriptor;
use crate::services::NewEvent;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// A validated booking form.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingRequest {
    pub patient_id: String,
    pub start: NaiveDateTime,
    pub price: Decimal,
    pub notes: String,
}

impl BookingRequest {
    /// Reads `patientId`, `visitDate` (`YYYY-MM-DD`), `visitTime` (`HH:MM`), `visitPrice` and
    /// `notes`. A blank price falls back to `default_price`. Errors are user-facing messages.
    pub fn from_context(ctx: &RequestContext, default_price: Decimal) -> Result<Self, String> {
        let patient_id = ctx
            .param("patientId")
            .ok_or_else(|| "Error: a patient must be selected.".to_string())?;

        let date = ctx
            .param("visitDate")
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            .ok_or_else(|| "Error: visit date must be YYYY-MM-DD.".to_string())?;
        let time = ctx
            .param("visitTime")
            .and_then(|t| {
                let t = t.trim();
                NaiveTime::parse_from_str(t, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
                    .ok()
            })
            .ok_or_else(|| "Error: visit time must be HH:MM.".to_string())?;

        let price = match ctx.param("visitPrice") {
            None => default_price,
            Some(raw) => Decimal::from_str(raw.trim())
                .ok()
                .filter(|p| !p.is_sign_negative())
                .ok_or_else(|| format!("Error: invalid visit price {raw:?}."))?,
        };

        Ok(Self {
            patient_id,
            start: date.and_time(time),
            price,
            notes: ctx.param("notes").unwrap_or_default(),
        })
    }
}

/// Books a visit and redirects to the patient's detail page.
///
/// Invalid input re-shows the form with status 400. Calendar or document failures re-show it
/// with the error message; an event created before the failure stays in the calendar.
pub fn book_new_visit(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let request = match BookingRequest::from_context(ctx, d.cfg().visit_default_price()) {
        Ok(request) => request,
        Err(message) => {
            tracing::warn!("rejected booking: {message}");
            return booking_form(ctx, &message).map(|v| v.with_status(HTTP_CODE_BAD_REQUEST));
        }
    };

    match book(d, &request) {
        Ok(()) => Ok(ViewDescriptor::redirect(patient_detail_link(
            &ctx.base_url,
            &request.patient_id,
        )?)),
        Err(e) => {
            tracing::error!("booking error for patient {}: {e}", request.patient_id);
            booking_form(ctx, &format!("Error booking visit: {e}"))
        }
    }
}

fn booking_form(ctx: &RequestContext, error: &str) -> PortalResult<ViewDescriptor> {
    ViewDescriptor::view(NEW_VISIT_VIEW)
        .with("error", error)?
        .with("visitData", &ctx.query)?
        .with("patient_id", &ctx.param("patientId"))
}

fn book(d: &Dispatcher, request: &BookingRequest) -> PortalResult<()> {
    let services = d.services();
    let calendar_id = d.cfg().calendar_id();
    let patients = d.patients();
    let mut patient = patients.load_by_id(&request.patient_id)?;
    let document_url = patient
        .document
        .as_ref()
        .map(|doc| doc.url.clone())
        .unwrap_or_default();

    let event = services.calendar.create_event(
        calendar_id,
        NewEvent {
            title: patient.name.clone(),
            description: format!(
                "Initial Notes: {} \n  View Patient Details (Click 'More Details' first to activate link): {document_url}\n patientId: {} ",
                request.notes, request.patient_id
            ),
            start: request.start,
            end: request.start + Duration::minutes(d.cfg().visit_duration_minutes()),
        },
    )?;
    tracing::info!("created calendar event {} for {}", event.id, request.patient_id);

    let recorded = services
        .calendar
        .get_event(calendar_id, &event.id)
        .map_err(PortalError::from)
        .and_then(|full| {
            let visit = Visit::booked(
                request.start,
                request.notes.clone(),
                request.price,
                event_reference(&full, calendar_id),
            );
            patients.record_visit(&mut patient, visit)
        });

    match recorded {
        Ok(row) => {
            tracing::info!("visit recorded at row {row} of {}", request.patient_id);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "calendar event {} has no visit row and was left in place",
                event.id
            );
            Err(e)
        }
    }
}
