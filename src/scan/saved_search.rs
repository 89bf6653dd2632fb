use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::domain::filter::{ItemProperty, SearchFilter, parse_instant};
use crate::domain::folder::{DeleteMode, FolderHandle, SavedSearchDefinition, WellKnownFolder};
use crate::domain::item::{Item, PageRequest};
use crate::mail::service::MailService;
use crate::scan::{PAGE_SIZE, drain_pages};

pub const SEARCH_FOLDER_NAME: &str = "MyReceivedAfterSearchFolder";

/// Two results are enough to tell "unique" from "ambiguous".
const LOOKUP_LIMIT: usize = 2;

#[derive(Debug, PartialEq, Eq)]
enum FilterCheck {
    Current,
    Stale,
    Unparsable,
    Unexpected,
}

fn check_filter(filter: &SearchFilter, cutoff: DateTime<Utc>) -> FilterCheck {
    match filter {
        SearchFilter::IsGreaterThanOrEqualTo {
            property: ItemProperty::DateTimeReceived,
            value,
        } => match parse_instant(value) {
            Some(instant) if instant == cutoff => FilterCheck::Current,
            Some(_) => FilterCheck::Stale,
            None => FilterCheck::Unparsable,
        },
        _ => FilterCheck::Unexpected,
    }
}

/// Keeps a single "received today" search folder alive in the mailbox's
/// search-folders container and reads its matches.
///
/// Uniqueness is repaired on read: duplicates and malformed definitions are
/// hard-deleted, stale dates are rewritten in place. Two runs racing each other
/// can still both create a folder; the next run cleans that up.
pub struct SavedSearchManager<'a> {
    service: &'a dyn MailService,
}

impl<'a> SavedSearchManager<'a> {
    pub fn new(service: &'a dyn MailService) -> Self {
        Self { service }
    }

    /// Find, repair or create the definition so that it selects items from
    /// `root` received at or after `cutoff`.
    pub fn ensure(
        &self,
        root: &FolderHandle,
        cutoff: DateTime<Utc>,
    ) -> Result<SavedSearchDefinition> {
        let container = self.service.bind(WellKnownFolder::SearchFolders)?;
        let mut found = self.service.find_folders(
            &container,
            &SearchFilter::display_name_is(SEARCH_FOLDER_NAME),
            LOOKUP_LIMIT,
        )?;

        if found.len() > 1 {
            warn!(
                "{} folders are named {}; keeping the first and deleting the rest",
                found.len(),
                SEARCH_FOLDER_NAME
            );
            for extra in found.drain(1..) {
                self.service.delete_folder(&extra, DeleteMode::Hard)?;
            }
        }

        let existing = match found.pop() {
            Some(folder) => self.validate(folder, &container, cutoff)?,
            None => None,
        };

        match existing {
            Some(definition) => Ok(definition),
            None => {
                info!("Creating a new search folder for today.");
                let definition = SavedSearchDefinition::new(
                    SEARCH_FOLDER_NAME,
                    SearchFilter::received_on_or_after(cutoff),
                    root,
                );
                self.service.save_search_definition(&definition, &container)
            }
        }
    }

    /// `None` means the folder was unusable and has been deleted.
    fn validate(
        &self,
        folder: FolderHandle,
        container: &FolderHandle,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<SavedSearchDefinition>> {
        info!("Found existing search folder.");
        if !folder.is_search_folder() {
            warn!(
                "{SEARCH_FOLDER_NAME} ({}) is not a search folder; deleting it",
                folder.id
            );
            self.service.delete_folder(&folder, DeleteMode::Hard)?;
            return Ok(None);
        }

        let mut definition = self.service.load_search_definition(&folder)?;
        if definition.id.is_none() {
            definition.id = Some(folder.id.clone());
        }

        match check_filter(&definition.filter, cutoff) {
            FilterCheck::Current => Ok(Some(definition)),
            FilterCheck::Unexpected => {
                warn!(
                    "search folder {} has unexpected filter '{}'; deleting it",
                    folder.id, definition.filter
                );
                self.service.delete_folder(&folder, DeleteMode::Hard)?;
                Ok(None)
            }
            check => {
                if check == FilterCheck::Unparsable {
                    warn!(
                        "search folder {} has an unreadable date in '{}'; resetting it",
                        folder.id, definition.filter
                    );
                } else {
                    info!("This search folder is from a previous day. Updating the filter.");
                }
                definition.filter = SearchFilter::received_on_or_after(cutoff);
                let saved = self.service.save_search_definition(&definition, container)?;
                Ok(Some(saved))
            }
        }
    }

    /// Every item the definition currently matches, in server order.
    pub fn execute(&self, definition: &SavedSearchDefinition) -> Result<Vec<Item>> {
        let folder = definition
            .as_folder()
            .ok_or_else(|| anyhow!("search folder {} was never saved", definition.display_name))?;
        drain_pages(self.service, &folder, PageRequest::new(PAGE_SIZE, 0))
    }

    pub fn find_items(&self, root: &FolderHandle, cutoff: DateTime<Utc>) -> Result<Vec<Item>> {
        let definition = self.ensure(root, cutoff)?;
        self.execute(&definition)
    }
}
