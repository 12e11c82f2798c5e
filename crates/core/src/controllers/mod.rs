//! Page controllers and the registry that maps page names to them.

pub mod booking;
pub mod layout;
pub mod patient;
pub mod search;

use crate::dispatch::ControllerRegistry;

/// Registry holding every page the portal serves.
pub fn default_registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();
    registry
        .register("index", layout::index)
        .register("header", layout::header)
        .register("menu", layout::menu)
        .register("home", layout::home)
        .register("calendar", layout::calendar)
        .register("todayVisits", layout::today_visits)
        .register("patientDetail", patient::patient_detail)
        .register("newPatient", patient::new_patient)
        .register("createNewPatient", patient::create_new_patient)
        .register("newVisit", patient::new_visit)
        .register("bookNewVisit", booking::book_new_visit)
        .register("patientSearch", search::patient_search)
        .register("doPatientSearch", search::do_patient_search);
    registry
}
