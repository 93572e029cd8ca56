//! Operator-local calendar arithmetic.
//!
//! Workload figures such as "completed today" are reported against the
//! calendar day of the workshop floor, not UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

/// Largest UTC offset accepted for an operator timezone, in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Returns the `[start, end)` UTC instants of the operator's calendar day
/// containing `now`.
///
/// Offsets outside +/-14h fall back to UTC.
pub fn operator_day_bounds(now: DateTime<Utc>, utc_offset_minutes: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .filter(|_| utc_offset_minutes.abs() <= MAX_UTC_OFFSET_MINUTES)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());

    let local_date = now.with_timezone(&offset).date_naive();
    let local_midnight = local_date.and_time(NaiveTime::MIN);

    // A fixed offset has exactly one mapping for every local time.
    let start = offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);

    (start, start + Duration::days(1))
}
