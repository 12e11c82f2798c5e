//! Scheduling calendar collaborator.

use super::ServiceResult;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An event as stored by the calendar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Link to the event in the calendar's own UI, when the service can report one.
    #[serde(default)]
    pub html_link: Option<String>,
}

/// Fields needed to create an event.
#[derive(Clone, Debug)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

pub trait CalendarService: Send + Sync {
    fn create_event(&self, calendar_id: &str, event: NewEvent) -> ServiceResult<CalendarEvent>;

    fn get_event(&self, calendar_id: &str, event_id: &str) -> ServiceResult<CalendarEvent>;

    /// Events overlapping `[start, end)`, ordered by start time.
    fn events_between(
        &self,
        calendar_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> ServiceResult<Vec<CalendarEvent>>;
}
