use anyhow::Result;

use crate::domain::filter::SearchFilter;
use crate::domain::folder::{DeleteMode, FolderHandle, SavedSearchDefinition, WellKnownFolder};
use crate::domain::item::{Page, PageRequest};

/// The remote mail store, as far as this tool needs it. Every call blocks until
/// the server answers; errors are returned as-is, nothing is retried.
pub trait MailService {
    fn bind(&self, folder: WellKnownFolder) -> Result<FolderHandle>;

    fn find_items(&self, folder: &FolderHandle, request: &PageRequest) -> Result<Page>;

    /// Direct children of `parent` matching `filter`, at most `max_count` of them.
    fn find_folders(
        &self,
        parent: &FolderHandle,
        filter: &SearchFilter,
        max_count: usize,
    ) -> Result<Vec<FolderHandle>>;

    fn delete_folder(&self, folder: &FolderHandle, mode: DeleteMode) -> Result<()>;

    fn load_search_definition(&self, folder: &FolderHandle) -> Result<SavedSearchDefinition>;

    /// Create the definition under `parent`, or update it in place when it
    /// already has an id. Returns the definition as persisted.
    fn save_search_definition(
        &self,
        definition: &SavedSearchDefinition,
        parent: &FolderHandle,
    ) -> Result<SavedSearchDefinition>;
}
