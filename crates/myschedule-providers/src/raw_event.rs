//! Raw event type from the calendar service.
//!
//! [`RawEvent`] mirrors the event resource returned by the calendar view
//! endpoint. Every field is optional at the serde layer: a record that is
//! missing data still deserializes, and the normalizer reports exactly which
//! field is absent as a [`FormatError`](crate::FormatError) for that one
//! record instead of failing the whole page.

use serde::{Deserialize, Serialize};

/// An email address with its display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmailAddress {
    /// The SMTP address.
    pub address: Option<String>,
    /// The display name shown by the mail client.
    pub name: Option<String>,
}

impl RawEmailAddress {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            name: Some(name.into()),
        }
    }
}

/// The organizer or an attendee of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecipient {
    #[serde(default)]
    pub email_address: RawEmailAddress,
}

impl RawRecipient {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email_address: RawEmailAddress::new(address, name),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.email_address.address.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.email_address.name.as_deref()
    }
}

/// A wall-clock time plus the zone it is expressed in.
///
/// `date_time` carries no offset, e.g. `2024-03-01T14:00:00.0000000`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDateTimeZone {
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

impl RawDateTimeZone {
    pub fn new(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            time_zone: Some(time_zone.into()),
        }
    }
}

/// The location of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub display_name: Option<String>,
}

/// A raw calendar event as fetched.
///
/// Only `subject`, `organizer`, `start`, `is_all_day` and `web_link` are
/// required for normalization; `attendees` defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Service-side identifier, used only in diagnostics.
    pub id: Option<String>,

    pub subject: Option<String>,

    pub organizer: Option<RawRecipient>,

    pub attendees: Option<Vec<RawRecipient>>,

    pub start: Option<RawDateTimeZone>,

    pub end: Option<RawDateTimeZone>,

    pub location: Option<RawLocation>,

    pub is_all_day: Option<bool>,

    /// Link that opens the event in the calendar web UI.
    pub web_link: Option<String>,
}

impl RawEvent {
    /// Creates a timed event with the fields the normalizer requires.
    pub fn new(
        subject: impl Into<String>,
        organizer: RawRecipient,
        start: RawDateTimeZone,
        web_link: impl Into<String>,
    ) -> Self {
        Self {
            subject: Some(subject.into()),
            organizer: Some(organizer),
            attendees: Some(Vec::new()),
            start: Some(start),
            is_all_day: Some(false),
            web_link: Some(web_link.into()),
            ..Self::default()
        }
    }

    /// A short label for log and error messages.
    pub fn label(&self) -> &str {
        self.subject
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// Returns the attendees, treating an absent list as empty.
    pub fn attendees(&self) -> &[RawRecipient] {
        self.attendees.as_deref().unwrap_or_default()
    }

    /// Builder method to set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: RawRecipient) -> Self {
        self.attendees.get_or_insert_with(Vec::new).push(attendee);
        self
    }

    /// Builder method to mark the event as all-day.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.is_all_day = Some(all_day);
        self
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: RawDateTimeZone) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(RawLocation {
            display_name: Some(location.into()),
        });
        self
    }
}
