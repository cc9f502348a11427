//! CalendarProvider trait definition.
//!
//! This module defines the [`CalendarProvider`] trait, the seam between the
//! schedule pipeline and the calendar service. A provider answers one
//! question: which events happen on a given day.

use std::future::Future;
use std::pin::Pin;

use chrono::{NaiveDate, TimeZone};
use myschedule_core::{TimeError, TimeWindow};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

/// A request for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDay {
    /// The requested date, in the viewer's zone.
    pub date: NaiveDate,
    /// Midnight to next midnight of `date`, as UTC instants.
    pub window: TimeWindow,
}

impl FetchDay {
    /// Builds the request for `date` as seen from `tz`.
    pub fn new<Z: TimeZone>(date: NaiveDate, tz: &Z) -> Result<Self, TimeError> {
        Ok(Self {
            date,
            window: TimeWindow::for_date(date, tz)?,
        })
    }
}

/// A boxed future for async trait methods.
///
/// Using boxed futures keeps the trait object-safe so the CLI can hold a
/// `&dyn CalendarProvider`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The interface every calendar backend implements.
///
/// # Implementation Notes
///
/// - `fetch_day` returns every event overlapping the window, in the order
///   the service returned them. Ordering is applied later.
/// - Pagination is handled internally.
/// - A missing or expired session is reported as an
///   [`AuthenticationFailed`](crate::ProviderErrorCode::AuthenticationFailed)
///   error; everything else that goes wrong on the way is a transport error.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "graph").
    fn name(&self) -> &str;

    /// Checks whether a session is available.
    ///
    /// This only looks at local state; it does not contact the service.
    fn is_authenticated(&self) -> bool;

    /// Fetches the raw events of one day.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on authentication and transport failures.
    fn fetch_day(&self, day: FetchDay) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;
}

/// A provider that serves a fixed list of events.
///
/// Every requested day gets the same events. Useful for tests and for
/// rendering a saved dump.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    events: Vec<RawEvent>,
}

impl StaticProvider {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self { events }
    }
}

impl CalendarProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn fetch_day(&self, _day: FetchDay) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        let events = self.events.clone();
        Box::pin(async move { Ok(events) })
    }
}

/// A provider that always returns an error.
///
/// This is useful for testing or as a placeholder when a provider
/// fails to initialize.
#[derive(Debug)]
pub struct ErrorProvider {
    name: String,
    error: ProviderError,
}

impl ErrorProvider {
    /// Creates a new error provider.
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl CalendarProvider for ErrorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_authenticated(&self) -> bool {
        !self.error.is_authentication()
    }

    fn fetch_day(&self, _day: FetchDay) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        // ProviderError is not Clone because of its boxed source.
        let error =
            ProviderError::new(self.error.code(), self.error.message()).with_provider(&self.name);
        Box::pin(async move { Err(error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::raw_event::{RawDateTimeZone, RawRecipient};
    use chrono::{Duration, Utc};

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn fetch_day_covers_local_midnight_to_midnight() {
        let day = FetchDay::new(march_first(), &chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(day.date, march_first());
        assert_eq!(
            day.window.start,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()
        );
        assert_eq!(day.window.duration(), Duration::hours(24));
    }

    #[test]
    fn fetch_day_on_dst_switch_is_short() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let day = FetchDay::new(date, &chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(day.window.duration(), Duration::hours(23));
    }

    #[tokio::test]
    async fn static_provider_returns_its_events() {
        let event = RawEvent::new(
            "Sync",
            RawRecipient::new("a@example.com", "A"),
            RawDateTimeZone::new("2024-03-01T10:00:00", "UTC"),
            "https://example.com/1",
        );
        let provider = StaticProvider::new(vec![event.clone()]);
        assert!(provider.is_authenticated());

        let day = FetchDay::new(march_first(), &Utc).unwrap();
        let events = provider.fetch_day(day).await.unwrap();
        assert_eq!(events, vec![event]);
    }

    #[tokio::test]
    async fn error_provider_returns_error() {
        let provider = ErrorProvider::new("test", ProviderError::network("unreachable"));

        assert_eq!(provider.name(), "test");
        assert!(provider.is_authenticated());

        let day = FetchDay::new(march_first(), &Utc).unwrap();
        let err = provider.fetch_day(day).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(err.provider(), Some("test"));
    }

    #[test]
    fn error_provider_without_session() {
        let provider = ErrorProvider::new("test", ProviderError::authentication("no tokens"));
        assert!(!provider.is_authenticated());
    }
}
