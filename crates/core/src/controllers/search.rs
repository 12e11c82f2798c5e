//! Patient search pages.

use crate::dispatch::{Dispatcher, RequestContext};
use crate::error::PortalResult;
use crate::response::ViewDescriptor;

pub fn patient_search(_: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    ViewDescriptor::view("SearchForm").with("data", &ctx.query)
}

/// Searches the master index by `searchTerm` and `diagnosisKeyword`.
pub fn do_patient_search(d: &Dispatcher, ctx: &RequestContext) -> PortalResult<ViewDescriptor> {
    let term = ctx.param("searchTerm");
    let keyword = ctx.param("diagnosisKeyword");
    let matches = d
        .master_index()
        .search(term.as_deref(), keyword.as_deref())?;
    tracing::info!("patient search returned {} matches", matches.len());

    ViewDescriptor::view("SearchResults")
        .with("data", &ctx.query)?
        .with("matches", &matches)
}
