//! Constants used throughout the MDSolo core crate.
//!
//! Cell positions, header labels and response codes live here so the patient log layout and the
//! master index layout are defined in exactly one place.

use crate::a1::CellRef;

/// Page rendered when a request does not name one.
pub const DEFAULT_PAGE: &str = "home";

/// Suffix appended to a page name to form its canonical controller name.
pub const CONTROLLER_SUFFIX: &str = "Controller";

/// Page whose controller frames every full-document render.
pub const INDEX_PAGE: &str = "index";

/// Title applied to full-document renders.
pub const DOCUMENT_TITLE: &str = "MD Portal";

/// Query key carrying the URL-encoded JSON payload.
pub const DATA_PARAM: &str = "data";

/// Query key carrying the page name.
pub const PAGE_PARAM: &str = "page";

/// Default root folder name for patient folders.
pub const DEFAULT_ROOT_FOLDER_NAME: &str = "MD-SOLO-PRACTICE";

/// Default price of a visit, in the practice's currency unit (30000.00).
pub const VISIT_DEFAULT_PRICE_CENTS: i64 = 3_000_000;

/// Default visit length.
pub const VISIT_DURATION_MINUTES: i64 = 60;

pub const HTTP_CODE_SUCCESS: u16 = 200;
pub const HTTP_CODE_REDIRECT: u16 = 302;
pub const HTTP_CODE_BAD_REQUEST: u16 = 400;
pub const HTTP_CODE_FORBIDDEN: u16 = 403;
pub const HTTP_CODE_UNPROCESSABLE_ENTITY: u16 = 422;

// ---------------------------------------------------------------------------
// Patient log layout
// ---------------------------------------------------------------------------

pub const PATIENT_NAME_CELL: CellRef = CellRef::new(1, 2);
pub const PATIENT_PHONE_CELL: CellRef = CellRef::new(2, 2);
pub const PATIENT_GOV_ID_CELL: CellRef = CellRef::new(3, 2);
pub const PATIENT_FOLDER_CELL: CellRef = CellRef::new(4, 2);
pub const PATIENT_EMAIL_CELL: CellRef = CellRef::new(5, 2);

/// Labels written into column A next to the header values, rows 1 to 5.
pub const PATIENT_HEADER_LABELS: [&str; 5] = [
    "Patient Name:",
    "Phone:",
    "Gov Id:",
    "Patient Folder",
    "Patient e-Mail:",
];

pub const PATIENT_FOLDER_LINK_LABEL: &str = "Open Patient Folder";

/// Row holding the visit log column titles.
pub const LOG_HEADER_ROW: u32 = 10;

/// First row that may hold visit data.
pub const LOG_FIRST_DATA_ROW: u32 = 11;

/// Number of columns in a visit row.
pub const LOG_WIDTH: u32 = 6;

/// Column (1-based) holding the calendar event link formula.
pub const LOG_EVENT_COLUMN: u32 = 5;

pub const LOG_HEADER_TITLES: [&str; LOG_WIDTH as usize] = [
    "Date and Time of Appointment",
    "Notes of Visit",
    "Visit Amount",
    "Amount Paid",
    "Visits",
    "Diagnosis",
];

/// Written into the event column until the link formula replaces it.
pub const EVENT_PLACEHOLDER: &str = "TEMP_EVENT_PLACEHOLDER";

pub const EVENT_LINK_LABEL: &str = "View Event";

/// Diagnosis recorded for a freshly booked visit.
pub const DIAGNOSIS_PENDING: &str = "Pending";

// ---------------------------------------------------------------------------
// Master index layout
// ---------------------------------------------------------------------------

pub const INDEX_FIRST_DATA_ROW: u32 = 2;
pub const INDEX_WIDTH: u32 = 6;
pub const INDEX_FOLDER_COLUMN: u32 = 3;
pub const INDEX_SHEET_COLUMN: u32 = 4;

pub const INDEX_HEADER_TITLES: [&str; INDEX_WIDTH as usize] =
    ["Name", "Gov Id", "Folder", "Patient Sheet", "Sheet Id", "Created"];

pub const INDEX_FOLDER_PLACEHOLDER: &str = "TEMP_FOLDER_PLACEHOLDER";
pub const INDEX_SHEET_PLACEHOLDER: &str = "TEMP_SHEET_PLACEHOLDER";
pub const INDEX_FOLDER_LINK_LABEL: &str = "View Folder";
pub const INDEX_SHEET_LINK_LABEL: &str = "View Patient Sheet";

/// Calendar event URL used when an event cannot report its own link.
pub const CALENDAR_EVENT_URL_BASE: &str = "https://calendar.google.com/calendar/event?eid=";

/// Marker in a calendar event description preceding the patient document id.
pub const EVENT_PATIENT_ID_MARKER: &str = "patientId: ";
