use crate::domain::filter::SearchFilter;

pub type FolderId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownFolder {
    Inbox,
    SearchFolders,
}

impl WellKnownFolder {
    pub fn wire_name(self) -> &'static str {
        match self {
            WellKnownFolder::Inbox => "inbox",
            WellKnownFolder::SearchFolders => "searchfolders",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderKind {
    Mail,
    SearchFolder,
    Other(String),
}

/// A bound folder: enough to address it in later calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub id: FolderId,
    pub display_name: String,
    pub kind: FolderKind,
}

impl FolderHandle {
    pub fn is_search_folder(&self) -> bool {
        self.kind == FolderKind::SearchFolder
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Shallow,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Gone for good; not recoverable from Deleted Items.
    Hard,
    Soft,
}

/// A persisted server-side query. `id` is `None` until the definition has
/// been saved for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSearchDefinition {
    pub id: Option<FolderId>,
    pub display_name: String,
    pub filter: SearchFilter,
    pub root_folders: Vec<FolderId>,
    pub traversal: Traversal,
}

impl SavedSearchDefinition {
    pub fn new(display_name: impl Into<String>, filter: SearchFilter, root: &FolderHandle) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            filter,
            root_folders: vec![root.id.clone()],
            traversal: Traversal::Shallow,
        }
    }

    /// The definition viewed as a folder, for listing its matches.
    pub fn as_folder(&self) -> Option<FolderHandle> {
        self.id.as_ref().map(|id| FolderHandle {
            id: id.clone(),
            display_name: self.display_name.clone(),
            kind: FolderKind::SearchFolder,
        })
    }
}
