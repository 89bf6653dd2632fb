//! In-memory `MailService` for tests. Serves one Inbox and one search-folders
//! container and records every call made against it.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;

use crate::domain::filter::{ItemProperty, SearchFilter, parse_instant};
use crate::domain::folder::{
    DeleteMode, FolderHandle, FolderKind, SavedSearchDefinition, WellKnownFolder,
};
use crate::domain::item::{Item, Page, PageRequest, SortDirection};
use crate::mail::service::MailService;

pub const INBOX_ID: &str = "inbox-id";
pub const SEARCH_FOLDERS_ID: &str = "searchfolders-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Bind(WellKnownFolder),
    FindItems { folder: String, request: PageRequest },
    FindFolders { max_count: usize },
    Delete { folder: String, mode: DeleteMode },
    Load { folder: String },
    Save { id: Option<String> },
}

#[derive(Debug, Clone)]
struct ChildFolder {
    handle: FolderHandle,
    definition: Option<SavedSearchDefinition>,
}

#[derive(Default)]
struct State {
    inbox: Vec<Item>,
    children: Vec<ChildFolder>,
    calls: Vec<Call>,
    next_id: usize,
}

#[derive(Default)]
pub struct FakeMailService {
    state: RefCell<State>,
    /// Return every matching child folder, as a server disregarding `$top` would.
    pub ignore_folder_limit: bool,
}

pub fn item(n: usize, received: DateTime<Utc>) -> Item {
    Item {
        id: format!("item-{n}"),
        subject: format!("subject {n}"),
        received,
    }
}

/// `count` items received one minute apart, newest first, starting at `newest`.
pub fn items_before(first: usize, count: usize, newest: DateTime<Utc>) -> Vec<Item> {
    (0..count)
        .map(|i| item(first + i, newest - Duration::minutes(i as i64)))
        .collect()
}

pub fn inbox_handle() -> FolderHandle {
    FolderHandle {
        id: INBOX_ID.to_string(),
        display_name: "Inbox".to_string(),
        kind: FolderKind::Mail,
    }
}

fn search_folders_handle() -> FolderHandle {
    FolderHandle {
        id: SEARCH_FOLDERS_ID.to_string(),
        display_name: "Finder".to_string(),
        kind: FolderKind::Mail,
    }
}

fn item_matches(filter: &SearchFilter, item: &Item) -> Result<bool> {
    match filter {
        SearchFilter::IsGreaterThanOrEqualTo {
            property: ItemProperty::DateTimeReceived,
            value,
        } => {
            let cutoff =
                parse_instant(value).ok_or_else(|| anyhow!("fake: bad date operand {value}"))?;
            Ok(item.received >= cutoff)
        }
        other => Err(anyhow!("fake: unsupported item filter {other}")),
    }
}

fn slice(items: Vec<Item>, request: &PageRequest) -> Page {
    let total = items.len();
    let items: Vec<Item> = items
        .into_iter()
        .skip(request.offset)
        .take(request.size)
        .collect();
    Page {
        items,
        more_available: request.offset + request.size < total,
    }
}

impl FakeMailService {
    pub fn with_inbox(items: Vec<Item>) -> Self {
        let fake = Self::default();
        fake.state.borrow_mut().inbox = items;
        fake
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        format!("{prefix}-{}", state.next_id)
    }

    /// Seed a search folder as if an earlier run had saved it.
    pub fn add_search_folder(&self, name: &str, filter: SearchFilter) -> String {
        let id = self.fresh_id("sf");
        let handle = FolderHandle {
            id: id.clone(),
            display_name: name.to_string(),
            kind: FolderKind::SearchFolder,
        };
        let mut definition = SavedSearchDefinition::new(name, filter, &inbox_handle());
        definition.id = Some(id.clone());
        self.state.borrow_mut().children.push(ChildFolder {
            handle,
            definition: Some(definition),
        });
        id
    }

    /// Seed a plain folder whose name collides with the search folder.
    pub fn add_plain_folder(&self, name: &str) -> String {
        let id = self.fresh_id("folder");
        self.state.borrow_mut().children.push(ChildFolder {
            handle: FolderHandle {
                id: id.clone(),
                display_name: name.to_string(),
                kind: FolderKind::Mail,
            },
            definition: None,
        });
        id
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn definitions(&self) -> Vec<SavedSearchDefinition> {
        self.state
            .borrow()
            .children
            .iter()
            .filter_map(|c| c.definition.clone())
            .collect()
    }

    pub fn child_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .children
            .iter()
            .map(|c| c.handle.id.clone())
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl MailService for FakeMailService {
    fn bind(&self, folder: WellKnownFolder) -> Result<FolderHandle> {
        self.record(Call::Bind(folder));
        Ok(match folder {
            WellKnownFolder::Inbox => inbox_handle(),
            WellKnownFolder::SearchFolders => search_folders_handle(),
        })
    }

    fn find_items(&self, folder: &FolderHandle, request: &PageRequest) -> Result<Page> {
        self.record(Call::FindItems {
            folder: folder.id.clone(),
            request: request.clone(),
        });

        let state = self.state.borrow();
        let mut items = if folder.id == INBOX_ID {
            state.inbox.clone()
        } else {
            let definition = state
                .children
                .iter()
                .find(|c| c.handle.id == folder.id)
                .and_then(|c| c.definition.clone())
                .ok_or_else(|| anyhow!("fake: no search folder {}", folder.id))?;
            if definition.root_folders != [INBOX_ID] {
                return Err(anyhow!("fake: search folder not rooted at the inbox"));
            }
            let mut hits = Vec::new();
            for it in &state.inbox {
                if item_matches(&definition.filter, it)? {
                    hits.push(it.clone());
                }
            }
            hits
        };
        drop(state);

        if let Some(filter) = &request.filter {
            let mut kept = Vec::new();
            for it in items {
                if item_matches(filter, &it)? {
                    kept.push(it);
                }
            }
            items = kept;
        }
        if let Some(sort) = &request.sort {
            items.sort_by_key(|it| it.received);
            if sort.direction == SortDirection::Descending {
                items.reverse();
            }
        }

        Ok(slice(items, request))
    }

    fn find_folders(
        &self,
        parent: &FolderHandle,
        filter: &SearchFilter,
        max_count: usize,
    ) -> Result<Vec<FolderHandle>> {
        self.record(Call::FindFolders { max_count });
        if parent.id != SEARCH_FOLDERS_ID {
            return Err(anyhow!("fake: unexpected parent {}", parent.id));
        }
        let SearchFilter::IsEqualTo {
            property: ItemProperty::DisplayName,
            value,
        } = filter
        else {
            return Err(anyhow!("fake: unsupported folder filter {filter}"));
        };

        let found = self
            .state
            .borrow()
            .children
            .iter()
            .filter(|c| &c.handle.display_name == value)
            .map(|c| c.handle.clone())
            .take(if self.ignore_folder_limit {
                usize::MAX
            } else {
                max_count
            })
            .collect();
        Ok(found)
    }

    fn delete_folder(&self, folder: &FolderHandle, mode: DeleteMode) -> Result<()> {
        self.record(Call::Delete {
            folder: folder.id.clone(),
            mode,
        });
        let mut state = self.state.borrow_mut();
        let before = state.children.len();
        state.children.retain(|c| c.handle.id != folder.id);
        if state.children.len() == before {
            return Err(anyhow!("fake: no folder {}", folder.id));
        }
        Ok(())
    }

    fn load_search_definition(&self, folder: &FolderHandle) -> Result<SavedSearchDefinition> {
        self.record(Call::Load {
            folder: folder.id.clone(),
        });
        self.state
            .borrow()
            .children
            .iter()
            .find(|c| c.handle.id == folder.id)
            .and_then(|c| c.definition.clone())
            .ok_or_else(|| anyhow!("fake: {} is not a search folder", folder.id))
    }

    fn save_search_definition(
        &self,
        definition: &SavedSearchDefinition,
        parent: &FolderHandle,
    ) -> Result<SavedSearchDefinition> {
        self.record(Call::Save {
            id: definition.id.clone(),
        });
        if parent.id != SEARCH_FOLDERS_ID {
            return Err(anyhow!("fake: saving outside the search folders"));
        }

        if let Some(id) = &definition.id {
            let mut state = self.state.borrow_mut();
            let child = state
                .children
                .iter_mut()
                .find(|c| &c.handle.id == id)
                .ok_or_else(|| anyhow!("fake: no folder {id} to update"))?;
            child.definition = Some(definition.clone());
            return Ok(definition.clone());
        }

        let id = self.fresh_id("sf");
        let mut saved = definition.clone();
        saved.id = Some(id.clone());
        self.state.borrow_mut().children.push(ChildFolder {
            handle: FolderHandle {
                id,
                display_name: saved.display_name.clone(),
                kind: FolderKind::SearchFolder,
            },
            definition: Some(saved.clone()),
        });
        Ok(saved)
    }
}
