pub mod filtered;
pub mod saved_search;
pub mod sorted;

use anyhow::Result;

use crate::domain::folder::FolderHandle;
use crate::domain::item::{Item, PageRequest};
use crate::mail::service::MailService;

/// Every strategy asks for this many items per round trip.
pub const PAGE_SIZE: usize = 10;

/// Walk `folder` page by page with `template`'s sort/filter until the server
/// says there is nothing more.
pub(crate) fn drain_pages(
    service: &dyn MailService,
    folder: &FolderHandle,
    template: PageRequest,
) -> Result<Vec<Item>> {
    let mut found = Vec::new();
    let mut request = template;
    request.offset = 0;

    loop {
        let page = service.find_items(folder, &request)?;
        found.extend(page.items);
        if !page.more_available {
            break;
        }
        request.offset += request.size;
    }

    Ok(found)
}
