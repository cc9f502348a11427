//! Event types for the daily schedule.
//!
//! This module provides the display-ready types produced by normalization:
//! - [`Tag`]: a participant marker rendered in the note tool's link syntax
//! - [`Participants`]: an ordered, duplicate-free list of tags
//! - [`CanonicalEvent`]: a filtered, timezone-corrected calendar event

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A participant or category marker, rendered as `#[[Name]]`.
///
/// Equality is on the rendered text, so two people sharing a display name
/// collapse into one tag even when their addresses differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Builds a tag from a display name.
    pub fn new(name: &str) -> Self {
        Self(format!("#[[{}]]", name))
    }

    /// Returns the rendered tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The participants of an event in the order they were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participants(Vec<Tag>);

impl Participants {
    /// Creates an empty participant list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `tag` unless an equal tag is already present.
    ///
    /// Returns `true` if the tag was added.
    pub fn push_unique(&mut self, tag: Tag) -> bool {
        if self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    /// Returns true if the list already holds `tag`.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// Joins the rendered tags with `separator`.
    pub fn join(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(Tag::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl FromIterator<Tag> for Participants {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut participants = Self::new();
        for tag in iter {
            participants.push_unique(tag);
        }
        participants
    }
}

/// A calendar event after filtering and timezone conversion.
///
/// `start_time` is an absolute instant whose offset is the viewer's offset
/// at that instant, so its wall-clock fields are what gets displayed.
/// Comparisons between start times compare instants, not wall clocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// When the event starts, expressed in the viewer's zone.
    pub start_time: DateTime<FixedOffset>,
    /// The event subject, unchanged from the calendar.
    pub subject: String,
    /// Tags for everyone worth mentioning, excluding the viewer.
    pub participants: Participants,
    /// Link to the event in the calendar web UI.
    pub link: String,
}

impl CanonicalEvent {
    /// Creates an event with no participants.
    pub fn new(
        start_time: DateTime<FixedOffset>,
        subject: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            start_time,
            subject: subject.into(),
            participants: Participants::new(),
            link: link.into(),
        }
    }

    /// Builder method to set the participants.
    pub fn with_participants(mut self, participants: Participants) -> Self {
        self.participants = participants;
        self
    }
}
