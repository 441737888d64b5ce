//! Reshapes the 3-hourly forecast into one bucket per calendar day.

use std::collections::HashMap;

use chrono::{Local, NaiveDate, TimeZone, Timelike};

use crate::model::{DailyBucket, ForecastEntry};

/// Local hours considered a midday reading.
const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 11..=13;

/// Group forecast entries by their calendar date in `tz`.
///
/// Buckets come out in the order each date is first seen. Within a
/// bucket the representative is the first midday reading, or the first
/// entry when the day has none.
pub fn group_by_day<Tz: TimeZone>(entries: &[ForecastEntry], tz: &Tz) -> Vec<DailyBucket> {
    let mut order: Vec<(NaiveDate, Vec<ForecastEntry>)> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for entry in entries {
        let date = entry.timestamp.with_timezone(tz).date_naive();
        let slot = *index.entry(date).or_insert_with(|| {
            order.push((date, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(entry.clone());
    }

    order
        .into_iter()
        .map(|(date, day)| {
            let representative = day
                .iter()
                .position(|e| MIDDAY_HOURS.contains(&e.timestamp.with_timezone(tz).hour()))
                .unwrap_or(0);
            DailyBucket::new(date, day, representative)
        })
        .collect()
}

/// [`group_by_day`] in the machine's local time zone.
pub fn group_by_day_local(entries: &[ForecastEntry]) -> Vec<DailyBucket> {
    group_by_day(entries, &Local)
}
