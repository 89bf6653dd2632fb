use anyhow::Result;
use chrono::{DateTime, Utc};
use log::debug;

use crate::domain::folder::FolderHandle;
use crate::domain::item::{Item, PageRequest, SortOrder};
use crate::mail::service::MailService;
use crate::scan::PAGE_SIZE;

/// Items received at or after `cutoff`, newest first.
///
/// Pages are requested in descending received order, so the first item older
/// than the cutoff ends the scan: nothing after it can qualify.
pub fn find_by_sort_and_seek(
    service: &dyn MailService,
    folder: &FolderHandle,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Item>> {
    let mut found = Vec::new();
    let mut offset = 0;

    loop {
        let request = PageRequest::new(PAGE_SIZE, offset).sorted_by(SortOrder::newest_first());
        let page = service.find_items(folder, &request)?;

        let mut reached_cutoff = false;
        for item in page.items {
            if item.received < cutoff {
                reached_cutoff = true;
                break;
            }
            found.push(item);
        }

        if reached_cutoff || !page.more_available {
            debug!(
                "sorted scan of {} stopped at offset {offset}",
                folder.display_name
            );
            break;
        }
        offset += PAGE_SIZE;
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::fake::{Call, FakeMailService, inbox_handle, items_before};
    use chrono::{Duration, TimeZone};

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap()
    }

    fn page_requests(fake: &FakeMailService) -> Vec<usize> {
        fake.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FindItems { request, .. } => Some(request.offset),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn stops_inside_the_page_that_crosses_the_cutoff() {
        let noon = cutoff() + Duration::hours(12);
        let mut inbox = items_before(1, 15, noon);
        inbox.extend(items_before(16, 5, cutoff() - Duration::hours(6)));
        let fake = FakeMailService::with_inbox(inbox);

        let found = find_by_sort_and_seek(&fake, &inbox_handle(), cutoff()).unwrap();

        assert_eq!(found.len(), 15);
        assert_eq!(found[0].id, "item-1");
        assert_eq!(found[14].id, "item-15");
        assert_eq!(page_requests(&fake), vec![0, 10]);
    }

    #[test]
    fn requests_newest_first() {
        let fake = FakeMailService::with_inbox(vec![]);
        find_by_sort_and_seek(&fake, &inbox_handle(), cutoff()).unwrap();

        let calls = fake.calls();
        let Call::FindItems { request, .. } = &calls[0] else {
            panic!("expected a listing");
        };
        assert_eq!(request.sort, Some(SortOrder::newest_first()));
        assert_eq!(request.filter, None);
        assert_eq!(request.size, PAGE_SIZE);
    }

    #[test]
    fn empty_folder_takes_one_request() {
        let fake = FakeMailService::with_inbox(vec![]);
        let found = find_by_sort_and_seek(&fake, &inbox_handle(), cutoff()).unwrap();
        assert!(found.is_empty());
        assert_eq!(page_requests(&fake), vec![0]);
    }

    #[test]
    fn stale_newest_item_takes_one_request() {
        let fake = FakeMailService::with_inbox(items_before(1, 30, cutoff() - Duration::days(1)));
        let found = find_by_sort_and_seek(&fake, &inbox_handle(), cutoff()).unwrap();
        assert!(found.is_empty());
        assert_eq!(page_requests(&fake), vec![0]);
    }

    #[test]
    fn item_exactly_at_cutoff_counts_as_today() {
        let mut inbox = items_before(1, 1, cutoff());
        inbox.extend(items_before(2, 1, cutoff() - Duration::seconds(1)));
        let fake = FakeMailService::with_inbox(inbox);

        let found = find_by_sort_and_seek(&fake, &inbox_handle(), cutoff()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "item-1");
    }

    #[test]
    fn all_today_pages_until_exhausted() {
        let fake = FakeMailService::with_inbox(items_before(1, 20, cutoff() + Duration::hours(5)));
        let found = find_by_sort_and_seek(&fake, &inbox_handle(), cutoff()).unwrap();
        assert_eq!(found.len(), 20);
        assert_eq!(page_requests(&fake), vec![0, 10]);
    }
}
