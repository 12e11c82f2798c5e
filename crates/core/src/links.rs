//! Link and URL helpers.
//!
//! Page links carry their payload as URL-encoded JSON in the `data` parameter. Encoding follows
//! the browser's `encodeURIComponent` so links built here and links built by page scripts are
//! interchangeable.

use crate::constants::{
    CALENDAR_EVENT_URL_BASE, DATA_PARAM, EVENT_LINK_LABEL, PAGE_PARAM,
};
use crate::error::{PortalError, PortalResult};
use crate::services::CalendarEvent;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

/// Bytes `encodeURIComponent` leaves as they are.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes every byte outside the `encodeURIComponent` unreserved set.
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Reverses [`encode_uri_component`]. Malformed escapes or invalid UTF-8 are rejected.
pub fn decode_uri_component(input: &str) -> PortalResult<String> {
    if let Some(at) = input.match_indices('%').map(|(i, _)| i).find(|&i| {
        !input
            .as_bytes()
            .get(i + 1..i + 3)
            .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit))
    }) {
        return Err(PortalError::InvalidInput(format!(
            "malformed percent escape at byte {at}"
        )));
    }

    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PortalError::InvalidInput("decoded payload is not valid UTF-8".into()))
}

/// JSON-serializes `data` and URL-encodes the result.
pub fn encode_data<T: Serialize + ?Sized>(data: &T) -> PortalResult<String> {
    let json = serde_json::to_string(data).map_err(PortalError::ViewData)?;
    Ok(encode_uri_component(&json))
}

/// `<base>?page=<page>&data=<encoded json>`.
pub fn page_link<T: Serialize + ?Sized>(base: &str, page: &str, data: &T) -> PortalResult<String> {
    Ok(format!(
        "{base}?{PAGE_PARAM}={page}&{DATA_PARAM}={}",
        encode_data(data)?
    ))
}

/// Link to a patient's detail page.
pub fn patient_detail_link(base: &str, patient_id: &str) -> PortalResult<String> {
    page_link(
        base,
        "PatientDetail",
        &serde_json::json!({ "patientId": patient_id }),
    )
}

/// A clickable-link formula for a document cell.
pub fn hyperlink_formula(url: &str, label: &str) -> String {
    format!("=HYPERLINK(\"{url}\", \"{label}\")")
}

/// URL-safe base64 without padding, the form calendar URLs use for ids.
pub fn web_safe_id(raw: &str) -> String {
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// URL of `event`: its own link when the calendar reports one, otherwise a link built from the
/// event id (everything before `@`) and the calendar id.
pub fn event_url(event: &CalendarEvent, calendar_id: &str) -> String {
    if let Some(link) = event.html_link.as_deref().filter(|l| !l.is_empty()) {
        return link.to_string();
    }

    tracing::warn!(
        "event {} has no link of its own, building one from its id",
        event.id
    );
    let base_id = event.id.split('@').next().unwrap_or(&event.id);
    format!(
        "{CALENDAR_EVENT_URL_BASE}{}",
        web_safe_id(&format!("{base_id} {calendar_id}"))
    )
}

/// The formula stored in a visit row to point at its calendar event.
pub fn event_reference(event: &CalendarEvent, calendar_id: &str) -> String {
    hyperlink_formula(&event_url(event, calendar_id), EVENT_LINK_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn encodes_like_encode_uri_component() {
        assert_eq!(
            encode_uri_component(r#"{"patientId":"abc123"}"#),
            "%7B%22patientId%22%3A%22abc123%22%7D"
        );
        assert_eq!(encode_uri_component("a b&c/d?é"), "a%20b%26c%2Fd%3F%C3%A9");
        assert_eq!(encode_uri_component("-_.!~*'()"), "-_.!~*'()");
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(
            decode_uri_component("%7B%22a%22%3A%22%C3%A9%22%7D").expect("decode"),
            r#"{"a":"é"}"#
        );
        assert_eq!(decode_uri_component("plain").expect("decode"), "plain");
        assert!(decode_uri_component("%zz").is_err());
        assert!(decode_uri_component("%4").is_err());
        assert!(decode_uri_component("%FF").is_err());
    }

    #[test]
    fn builds_patient_detail_redirect() {
        let link = patient_detail_link("https://x/", "abc123").expect("link");
        assert_eq!(
            link,
            "https://x/?page=PatientDetail&data=%7B%22patientId%22%3A%22abc123%22%7D"
        );
    }

    #[test]
    fn event_url_prefers_own_link() {
        let start = NaiveDate::from_ymd_opt(2025, 12, 30)
            .and_then(|d| d.and_hms_opt(14, 0, 0))
            .expect("valid timestamp");
        let mut event = CalendarEvent {
            id: "evt42@google.com".into(),
            title: "Ada".into(),
            description: String::new(),
            start,
            end: start,
            html_link: Some("https://calendar/e/42".into()),
        };
        assert_eq!(event_url(&event, "md@example.com"), "https://calendar/e/42");

        event.html_link = None;
        let expected = format!(
            "{CALENDAR_EVENT_URL_BASE}{}",
            web_safe_id("evt42 md@example.com")
        );
        assert_eq!(event_url(&event, "md@example.com"), expected);
        assert!(!expected.ends_with('='));

        assert_eq!(
            event_reference(&event, "md@example.com"),
            format!("=HYPERLINK(\"{expected}\", \"View Event\")")
        );
    }
}
