use anyhow::Result;
use chrono::{DateTime, Utc};
use std::io::Write;

use crate::config::Config;
use crate::domain::folder::FolderHandle;
use crate::domain::item::Item;
use crate::mail::autodiscover::ServiceEndpoint;
use crate::mail::service::MailService;
use crate::scan::filtered::find_by_restricted_view;
use crate::scan::saved_search::SavedSearchManager;
use crate::scan::sorted::find_by_sort_and_seek;

/// Root of the mail API for `mailbox`, or `None` when the mailbox cannot be
/// discovered. Discovery only confirms the mailbox is hosted; its REST answer
/// points at a different API than the one `GraphMailService` speaks, so the
/// configured API root is used either way.
pub fn api_endpoint(
    cfg: &Config,
    mailbox: &str,
    discover: impl FnOnce(&str) -> Option<ServiceEndpoint>,
) -> Option<String> {
    if let Some(url) = &cfg.api_url {
        return Some(url.clone());
    }
    discover(mailbox).map(|_| cfg.api_url().to_string())
}

fn report(out: &mut impl Write, items: &[Item]) -> Result<()> {
    for item in items {
        writeln!(out, "Found item: {}", item.subject)?;
    }
    Ok(())
}

/// Run the three retrieval strategies against `inbox`, one after the other,
/// writing what each finds to `out`.
pub fn run_all(
    service: &dyn MailService,
    inbox: &FolderHandle,
    cutoff: DateTime<Utc>,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "Finding items received today by sorted ranged retrieval.")?;
    report(out, &find_by_sort_and_seek(service, inbox, cutoff)?)?;

    writeln!(out, "Finding items received today by restricted view.")?;
    report(out, &find_by_restricted_view(service, inbox, cutoff)?)?;

    writeln!(out, "Finding items received today by search folder.")?;
    let manager = SavedSearchManager::new(service);
    let definition = manager.ensure(inbox, cutoff)?;
    writeln!(out, "Retrieving items from search folder.")?;
    report(out, &manager.execute(&definition)?)?;

    Ok(())
}
