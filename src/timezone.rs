use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// With no timezone, the system's local offset is used, falling back to UTC
/// when the offset cannot be determined.
///
/// # Errors
/// Returns an [Error::InvalidTimezone] if `canonical_timezone` is not a known timezone.
pub fn local_today(canonical_timezone: Option<&str>) -> Result<Date, Error> {
    let offset = match canonical_timezone {
        Some(name) => get_local_offset(name).ok_or_else(|| {
            tracing::error!("Invalid timezone {name}");
            Error::InvalidTimezone(name.to_owned())
        })?,
        None => UtcOffset::current_local_offset().unwrap_or_else(|error| {
            tracing::warn!("Could not determine the local offset, using UTC: {error}");
            UtcOffset::UTC
        }),
    };

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}
