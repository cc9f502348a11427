//! Output formatting for the daily schedule.
//!
//! Each event becomes one outline line in the note tool's markup:
//!
//! ```text
//! * __09:30__ - [Planning](https://outlook.office365.com/owa/?itemid=1) #[[Alice]], #[[Bob]] #[[Meeting Minutes]]
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::DateTime;
//! use myschedule_core::{CanonicalEvent, render_event};
//!
//! let start = DateTime::parse_from_rfc3339("2024-03-01T09:30:00+01:00").unwrap();
//! let event = CanonicalEvent::new(start, "Planning", "https://example.com/1");
//! assert_eq!(
//!     render_event(&event),
//!     "* __09:30__ - [Planning](https://example.com/1) #[[Meeting Minutes]]"
//! );
//! ```

use crate::event::CanonicalEvent;

/// Category tag appended to every line.
pub const MINUTES_TAG: &str = "#[[Meeting Minutes]]";

/// Separator between participant tags.
pub const PARTICIPANT_SEPARATOR: &str = ", ";

/// Renders one event as an outline line.
///
/// The start is shown as the zero-padded 24-hour wall clock of
/// `start_time`, which normalization has already put in the viewer's zone.
/// When there are no participants the link is followed directly by a single
/// space and [`MINUTES_TAG`].
pub fn render_event(event: &CanonicalEvent) -> String {
    let mut line = format!(
        "* __{}__ - [{}]({})",
        event.start_time.format("%H:%M"),
        event.subject,
        event.link
    );
    if !event.participants.is_empty() {
        line.push(' ');
        line.push_str(&event.participants.join(PARTICIPANT_SEPARATOR));
    }
    line.push(' ');
    line.push_str(MINUTES_TAG);
    collapse_double_spaces(line)
}

/// Renders a sorted day, one line per event.
pub fn render_day(events: &[CanonicalEvent]) -> Vec<String> {
    events.iter().map(render_event).collect()
}

// One left-to-right pass over the whole line: each pair of spaces becomes one.
// Subjects and display names can carry double spaces of their own.
fn collapse_double_spaces(line: String) -> String {
    if line.contains("  ") {
        line.replace("  ", " ")
    } else {
        line
    }
}
