use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::filter::SearchFilter;
use crate::domain::folder::FolderHandle;
use crate::domain::item::{Item, PageRequest};
use crate::mail::service::MailService;
use crate::scan::{PAGE_SIZE, drain_pages};

/// Items the server itself reports as received at or after `cutoff`. No
/// client-side date check and no assumption about order.
pub fn find_by_restricted_view(
    service: &dyn MailService,
    folder: &FolderHandle,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Item>> {
    let request =
        PageRequest::new(PAGE_SIZE, 0).filtered_by(SearchFilter::received_on_or_after(cutoff));
    drain_pages(service, folder, request)
}
