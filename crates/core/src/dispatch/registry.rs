//! Controller registry.
//!
//! Maps canonical controller names (`patientDetail` -> `patientDetailController`) to handler
//! functions. Built once at startup and read-only afterwards.

use super::{Dispatcher, RequestContext};
use crate::constants::CONTROLLER_SUFFIX;
use crate::error::{PortalError, PortalResult};
use crate::response::ViewDescriptor;
use std::collections::HashMap;

/// A page controller.
pub type Handler = fn(&Dispatcher, &RequestContext) -> PortalResult<ViewDescriptor>;

/// What to invoke: a page to look up, or a handler already in hand.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Page(&'a str),
    Resolved(Handler),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(page: &'a str) -> Self {
        Target::Page(page)
    }
}

impl From<Handler> for Target<'_> {
    fn from(handler: Handler) -> Self {
        Target::Resolved(handler)
    }
}

/// `Home` -> `homeController`, `patientDetail` -> `patientDetailController`.
pub fn canonical_name(page: &str) -> String {
    let mut chars = page.chars();
    let mut name = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    name.push_str(CONTROLLER_SUFFIX);
    name
}

#[derive(Clone, Default)]
pub struct ControllerRegistry {
    handlers: HashMap<String, Handler>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `page`. A later registration under the same canonical name
    /// replaces the earlier one.
    pub fn register(&mut self, page: &str, handler: Handler) -> &mut Self {
        let name = canonical_name(page);
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!("controller {name} re-registered");
        }
        self
    }

    pub fn resolve(&self, page: &str) -> PortalResult<Handler> {
        let name = canonical_name(page);
        self.handlers
            .get(&name)
            .copied()
            .ok_or_else(|| PortalError::HandlerNotFound {
                page: page.to_string(),
                handler: name,
            })
    }

    pub fn contains(&self, page: &str) -> bool {
        self.handlers.contains_key(&canonical_name(page))
    }

    /// Registered canonical names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
        Ok(ViewDescriptor::view("First"))
    }

    fn second(_: &Dispatcher, _: &RequestContext) -> PortalResult<ViewDescriptor> {
        Ok(ViewDescriptor::view("Second"))
    }

    #[test]
    fn canonical_names_lowercase_the_first_letter() {
        assert_eq!(canonical_name("Home"), "homeController");
        assert_eq!(canonical_name("patientDetail"), "patientDetailController");
        assert_eq!(canonical_name("PatientDetail"), "patientDetailController");
        assert_eq!(canonical_name(""), "Controller");
    }

    #[test]
    fn resolves_case_of_first_letter_only() {
        let mut registry = ControllerRegistry::new();
        registry.register("PatientSearch", first);
        assert!(registry.contains("patientSearch"));
        assert!(!registry.contains("patientsearch"));
        assert_eq!(registry.names(), vec!["patientSearchController"]);
    }

    #[test]
    fn unknown_page_is_handler_not_found() {
        let registry = ControllerRegistry::new();
        match registry.resolve("Nope") {
            Err(PortalError::HandlerNotFound { page, handler }) => {
                assert_eq!(page, "Nope");
                assert_eq!(handler, "nopeController");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("resolution should fail"),
        }
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut registry = ControllerRegistry::new();
        registry.register("home", first).register("Home", second);
        assert_eq!(registry.len(), 1);
        let handler = registry.resolve("home").expect("registered");
        assert!(handler as usize == second as Handler as usize);
    }
}
