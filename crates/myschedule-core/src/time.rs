//! Time handling for calendar events.
//!
//! Calendar services report a start as a timezone-naive wall-clock string
//! plus a separate zone name. This module turns that pair into an absolute
//! instant and re-expresses it in the viewer's zone. It also provides
//! [`TimeWindow`] for the fetch range and [`ScheduleDay`] for picking the day.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accepted wall-clock layout. The fractional part is optional and may have
/// any number of digits (Graph sends seven).
const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Windows zone names that calendar services report instead of IANA names.
const WINDOWS_ZONES: &[(&str, Tz)] = &[
    ("UTC", Tz::UTC),
    ("Coordinated Universal Time", Tz::UTC),
    ("GMT Standard Time", Tz::Europe__London),
    ("W. Europe Standard Time", Tz::Europe__Berlin),
    ("Romance Standard Time", Tz::Europe__Paris),
    ("Central Europe Standard Time", Tz::Europe__Budapest),
    ("Central European Standard Time", Tz::Europe__Warsaw),
    ("E. Europe Standard Time", Tz::Europe__Chisinau),
    ("FLE Standard Time", Tz::Europe__Helsinki),
    ("Eastern Standard Time", Tz::America__New_York),
    ("Central Standard Time", Tz::America__Chicago),
    ("Mountain Standard Time", Tz::America__Denver),
    ("Pacific Standard Time", Tz::America__Los_Angeles),
    ("India Standard Time", Tz::Asia__Kolkata),
    ("China Standard Time", Tz::Asia__Shanghai),
    ("Singapore Standard Time", Tz::Asia__Singapore),
    ("Tokyo Standard Time", Tz::Asia__Tokyo),
    ("AUS Eastern Standard Time", Tz::Australia__Sydney),
];

/// Errors from parsing or converting event times.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// The timestamp text is not a timezone-naive ISO-8601 date-time.
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// The zone name is neither an IANA name nor a known Windows name.
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),

    /// The wall-clock time falls into a DST gap in its zone.
    #[error("{time} does not exist in time zone {zone}")]
    NonexistentLocalTime { time: NaiveDateTime, zone: String },
}

/// Parses a timezone-naive `YYYY-MM-DDTHH:MM:SS[.fffffff]` timestamp.
///
/// Text carrying a UTC offset or a trailing `Z` is rejected rather than
/// silently reinterpreted.
pub fn parse_wall_clock(value: &str) -> Result<NaiveDateTime, TimeError> {
    NaiveDateTime::parse_from_str(value.trim(), WALL_CLOCK_FORMAT).map_err(|e| {
        TimeError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Resolves a zone name to a time zone.
///
/// IANA names are tried first, then the Windows names in [`WINDOWS_ZONES`].
pub fn parse_zone(name: &str) -> Result<Tz, TimeError> {
    let name = name.trim();
    if let Ok(tz) = name.parse::<Tz>() {
        return Ok(tz);
    }
    WINDOWS_ZONES
        .iter()
        .find(|(windows, _)| windows.eq_ignore_ascii_case(name))
        .map(|(_, tz)| *tz)
        .ok_or_else(|| TimeError::UnknownTimeZone(name.to_string()))
}

/// Interprets `naive` as wall-clock time in `origin` and re-expresses the
/// instant in `display`.
///
/// A wall-clock time that occurs twice (DST fold) resolves to the earlier
/// instant. One that never occurs (DST gap) is an error.
pub fn to_display_zone<Z: TimeZone>(
    naive: NaiveDateTime,
    origin: &Tz,
    display: &Z,
) -> Result<DateTime<FixedOffset>, TimeError> {
    let instant = origin
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| TimeError::NonexistentLocalTime {
            time: naive,
            zone: origin.name().to_string(),
        })?;
    Ok(instant.with_timezone(display).fixed_offset())
}

/// Parses a raw start pair and converts it into the display zone.
pub fn localize<Z: TimeZone>(
    date_time: &str,
    zone: &str,
    display: &Z,
) -> Result<DateTime<FixedOffset>, TimeError> {
    let naive = parse_wall_clock(date_time)?;
    let origin = parse_zone(zone)?;
    to_display_zone(naive, &origin, display)
}

/// A half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates the window from `date`'s midnight to the next day's midnight
    /// in `tz`.
    ///
    /// In zones whose DST switch happens at midnight the first valid
    /// instant of the day is used.
    pub fn for_date<Z: TimeZone>(date: NaiveDate, tz: &Z) -> Result<Self, TimeError> {
        let next = date
            .succ_opt()
            .ok_or_else(|| TimeError::InvalidTimestamp {
                value: date.to_string(),
                reason: "date has no successor".to_string(),
            })?;
        Ok(Self {
            start: Self::start_of_day(date, tz)?,
            end: Self::start_of_day(next, tz)?,
        })
    }

    fn start_of_day<Z: TimeZone>(date: NaiveDate, tz: &Z) -> Result<DateTime<Utc>, TimeError> {
        // Midnight can fall into a DST gap; the hour after it never does.
        (0..2)
            .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
            .find_map(|naive| tz.from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| TimeError::InvalidTimestamp {
                value: date.to_string(),
                reason: "no valid start of day".to_string(),
            })
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}

/// Which calendar day to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDay {
    Today,
    Tomorrow,
    /// An explicit date.
    On(NaiveDate),
}

impl ScheduleDay {
    /// Resolves to a concrete date relative to `today`.
    ///
    /// Returns `None` only when tomorrow would overflow the calendar.
    pub fn resolve(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Today => Some(today),
            Self::Tomorrow => today.succ_opt(),
            Self::On(date) => Some(date),
        }
    }
}
