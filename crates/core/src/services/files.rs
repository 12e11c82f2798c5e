//! Hierarchical file store collaborator.

use super::ServiceResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub url: String,
}

pub trait FileStore: Send + Sync {
    /// Folders whose name is exactly `name`, in creation order.
    fn find_folders_by_name(&self, name: &str) -> ServiceResult<Vec<Folder>>;

    /// Creates a folder under `parent`, or at the store root when `parent` is `None`.
    fn create_folder(&self, parent: Option<&str>, name: &str) -> ServiceResult<Folder>;

    fn move_document(&self, document_id: &str, folder_id: &str) -> ServiceResult<()>;

    /// The folder holding `document_id`, `None` when it sits at the store root.
    fn parent_folder(&self, document_id: &str) -> ServiceResult<Option<Folder>>;
}
