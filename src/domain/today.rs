use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Local midnight of `date`, as an instant. Where midnight falls into a DST gap
/// the first valid local time that day is used.
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid midnight for {date}"))?;

    if let Some(dt) = tz.from_local_datetime(&midnight).earliest() {
        return Ok(dt.with_timezone(&Utc));
    }

    // DST gaps are at most a couple of hours; step forward until valid.
    (1..=24 * 4)
        .map(|quarter| midnight + chrono::Duration::minutes(15 * quarter))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("no valid local time on {date}"))
}

/// Start of the current local day.
pub fn today_cutoff() -> Result<DateTime<Utc>> {
    local_midnight(Local::now().date_naive(), &Local)
}
