use crate::services::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("controller \"{handler}\" for page \"{page}\" is not registered")]
    HandlerNotFound { page: String, handler: String },
    #[error("patient assets already provisioned (document {0})")]
    AssetAlreadyProvisioned(String),
    #[error("patient has no provisioned document")]
    AssetsNotProvisioned,
    #[error("external service error: {0}")]
    External(#[from] ServiceError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid query payload: {0}")]
    Payload(serde_json::Error),
    #[error("failed to serialize view data: {0}")]
    ViewData(serde_json::Error),
    #[error("malformed visit log row {row} in document {document_id}: {reason}")]
    MalformedRow {
        document_id: String,
        row: u32,
        reason: String,
    },
    #[error("failed to load templates from {dir}: {source}")]
    TemplateLoad {
        dir: String,
        #[source]
        source: tera::Error,
    },
    #[error("failed to render view {view}: {source}")]
    Render {
        view: String,
        #[source]
        source: tera::Error,
    },
    #[error("no view to render: handler returned neither a view name nor literal content")]
    MissingView,
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;
