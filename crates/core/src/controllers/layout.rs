//! Page frame and dashboard controllers.

use crate::constants::{DEFAULT_PAGE, EVENT_PATIENT_ID_MARKER, INDEX_PAGE};
use crate::dispatch::{canonical_name, Dispatcher, RequestContext};
use crate::error::PortalResult;
use crate::links::{patient_detail_link, web_safe_id};
use crate::response::ViewDescriptor;
use crate::services::CalendarEvent;
use chrono::{Days, NaiveTime};
use serde::Serialize;

/// Frames the requested page between the header and the menu.
///
/// A redirect from the framed page replaces the whole frame. A request for the index page
/// itself frames the home page.
pub fn index(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let content = if canonical_name(&ctx.page) == canonical_name(INDEX_PAGE) {
        d.embed(DEFAULT_PAGE, ctx, None)?
    } else {
        d.embed(ctx.handler, ctx, None)?
    };
    if content.is_redirect() {
        return Ok(ViewDescriptor::redirect(content.content));
    }

    let header = d.embed_content("header", ctx)?;
    let menu = d.embed_content("menu", ctx)?;
    ViewDescriptor::view("Index")
        .with("header", &header)?
        .with("menu", &menu)?
        .with("content", &content.content)
}

pub fn header(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
    Ok(ViewDescriptor::view("Header"))
}

pub fn menu(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
    Ok(ViewDescriptor::view("Menu"))
}

pub fn home(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
    Ok(ViewDescriptor::view("Home"))
}

/// Embedded calendar. The calendar id is bound in the web-safe form the embed URL expects.
pub fn calendar(d: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
    ViewDescriptor::view("CalendarContainer")
        .with("md_calendar_id", &web_safe_id(d.cfg().calendar_id()))?
        .with("time_zone", d.cfg().time_zone())
}

/// A patient booked for today.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookedPatient {
    pub patient_name: String,
    pub patient_details_link: String,
    pub event_start_time: String,
}

/// Lists today's calendar events that belong to a patient.
///
/// Calendar failures are logged and produce an empty list.
pub fn today_visits(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let today = d.services().clock.now().date();
    let start = today.and_time(NaiveTime::MIN);
    let end = today
        .checked_add_days(Days::new(1))
        .unwrap_or(today)
        .and_time(NaiveTime::MIN);

    let events = match d
        .services()
        .calendar
        .events_between(d.cfg().calendar_id(), start, end)
    {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("failed to fetch calendar events: {e}");
            Vec::new()
        }
    };
    tracing::info!("found {} events today", events.len());

    let mut booked = Vec::new();
    for event in &events {
        let Some(patient_id) = patient_id_of(event) else {
            continue;
        };
        booked.push(BookedPatient {
            patient_name: event.title.clone(),
            patient_details_link: patient_detail_link(&ctx.base_url, patient_id)?,
            event_start_time: event.start.format("%H:%M").to_string(),
        });
    }

    ViewDescriptor::view("TodayVisits").with("booked_patients", &booked)
}

/// The text after `patientId: ` up to the end of its line, trimmed.
fn patient_id_of(event: &CalendarEvent) -> Option<&str> {
    let (_, rest) = event.description.split_once(EVENT_PATIENT_ID_MARKER)?;
    let id = rest.lines().next().unwrap_or_default().trim();
    (!id.is_empty()).then_some(id)
}
