//! RawEvent to CanonicalEvent conversion pipeline.
//!
//! For each fetched record, in order:
//! 1. Drop it if its subject is a configured noise subject
//! 2. Drop it if it is an all-day event
//! 3. Convert the start from its own zone into the viewer's zone
//! 4. Build the participant tags (organizer, then attendees unless the
//!    event is a broadcast)
//!
//! [`sort_events`] then orders the survivors by start instant.

use chrono::TimeZone;
use myschedule_core::{CanonicalEvent, MalformedPolicy, Participants, ScheduleRules, Tag, localize};
use tracing::{debug, warn};

use crate::error::FormatError;
use crate::raw_event::{RawEvent, RawRecipient};

/// Converts one [`RawEvent`] into a [`CanonicalEvent`].
///
/// Returns `Ok(None)` when the record is suppressed (noise subject or
/// all-day). The noise check runs before any other field is looked at, so a
/// noise record is dropped even if the rest of it is malformed.
///
/// `display` is the viewer's zone; the CLI passes [`chrono::Local`].
pub fn normalize_event<Z: TimeZone>(
    raw: &RawEvent,
    rules: &ScheduleRules,
    display: &Z,
) -> Result<Option<CanonicalEvent>, FormatError> {
    let subject = required(raw, raw.subject.as_deref(), "subject")?;
    if rules.is_noise(subject) {
        debug!(subject, "dropping noise event");
        return Ok(None);
    }

    if required(raw, raw.is_all_day, "isAllDay")? {
        debug!(subject, "dropping all-day event");
        return Ok(None);
    }

    let start = required(raw, raw.start.as_ref(), "start")?;
    let date_time = required(raw, start.date_time.as_deref(), "start.dateTime")?;
    let time_zone = required(raw, start.time_zone.as_deref(), "start.timeZone")?;
    let start_time =
        localize(date_time, time_zone, display).map_err(|source| FormatError::InvalidStart {
            event: raw.label().to_string(),
            source,
        })?;

    let link = required(raw, raw.web_link.as_deref(), "webLink")?;
    let participants = build_participants(raw, rules)?;

    Ok(Some(
        CanonicalEvent::new(start_time, subject, link).with_participants(participants),
    ))
}

/// Normalizes a day of records according to `rules.on_malformed`.
///
/// With [`MalformedPolicy::Skip`] a malformed record is logged and left
/// out; the others are unaffected. With [`MalformedPolicy::Abort`] the
/// first malformed record fails the whole run.
///
/// The result keeps input order; call [`sort_events`] afterwards.
pub fn normalize_events<Z: TimeZone>(
    raws: &[RawEvent],
    rules: &ScheduleRules,
    display: &Z,
) -> Result<Vec<CanonicalEvent>, FormatError> {
    let mut events = Vec::with_capacity(raws.len());
    for raw in raws {
        match normalize_event(raw, rules, display) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(err) => match rules.on_malformed {
                MalformedPolicy::Skip => warn!("skipping malformed event: {}", err),
                MalformedPolicy::Abort => return Err(err),
            },
        }
    }
    debug!(
        fetched = raws.len(),
        kept = events.len(),
        "normalized events"
    );
    Ok(events)
}

/// Orders events by start instant.
///
/// The sort is stable: events starting at the same instant keep the order
/// the service returned them in.
pub fn sort_events(events: &mut [CanonicalEvent]) {
    events.sort_by(|a, b| a.start_time.cmp(&b.start_time));
}

fn build_participants(
    raw: &RawEvent,
    rules: &ScheduleRules,
) -> Result<Participants, FormatError> {
    let mut participants = Participants::new();

    let organizer = required(raw, raw.organizer.as_ref(), "organizer")?;
    let (address, name) = recipient_fields(raw, organizer, "organizer")?;
    if !rules.is_self(address) {
        participants.push_unique(Tag::new(name));
    }

    let attendees = raw.attendees();
    if rules.is_broadcast(attendees.len()) {
        debug!(
            subject = raw.label(),
            attendees = attendees.len(),
            "broadcast event, not listing attendees"
        );
        return Ok(participants);
    }

    for attendee in attendees {
        let (address, name) = recipient_fields(raw, attendee, "attendees")?;
        if rules.is_self(address) || rules.is_distribution_list(name) {
            continue;
        }
        participants.push_unique(Tag::new(name));
    }

    Ok(participants)
}

fn recipient_fields<'a>(
    raw: &RawEvent,
    recipient: &'a RawRecipient,
    role: &'static str,
) -> Result<(&'a str, &'a str), FormatError> {
    let address = required(raw, recipient.address(), role)?;
    let name = required(raw, recipient.name(), role)?;
    Ok((address, name))
}

fn required<T>(raw: &RawEvent, value: Option<T>, field: &'static str) -> Result<T, FormatError> {
    value.ok_or_else(|| FormatError::MissingField {
        event: raw.label().to_string(),
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::{RawDateTimeZone, RawRecipient};
    use chrono_tz::Tz;

    const ME: &str = "me@example.com";

    fn rules() -> ScheduleRules {
        ScheduleRules::new(ME)
    }

    fn person(name: &str) -> RawRecipient {
        let address = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        RawRecipient::new(address, name)
    }

    fn me() -> RawRecipient {
        RawRecipient::new(ME, "Me Myself")
    }

    fn raw(subject: &str, organizer: RawRecipient) -> RawEvent {
        RawEvent::new(
            subject,
            organizer,
            RawDateTimeZone::new("2024-03-01T09:00:00.0000000", "UTC"),
            format!("https://outlook.office365.com/owa/?itemid={}", subject),
        )
    }

    fn at(raw: RawEvent, date_time: &str, zone: &str) -> RawEvent {
        RawEvent {
            start: Some(RawDateTimeZone::new(date_time, zone)),
            ..raw
        }
    }

    fn normalize(raw: &RawEvent) -> Option<CanonicalEvent> {
        normalize_event(raw, &rules(), &Tz::UTC).unwrap()
    }

    fn tags(event: &CanonicalEvent) -> Vec<String> {
        event
            .participants
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    mod filtering {
        use super::*;

        #[test]
        fn noise_subject_is_dropped() {
            assert!(normalize(&raw("Fokuszeit", person("Alice"))).is_none());
            assert!(normalize(&raw("Mittagessen", me())).is_none());
        }

        #[test]
        fn noise_is_dropped_even_when_malformed() {
            let broken = RawEvent {
                subject: Some("Block".to_string()),
                ..RawEvent::default()
            };
            assert!(normalize_event(&broken, &rules(), &Tz::UTC).unwrap().is_none());
        }

        #[test]
        fn all_day_is_dropped() {
            let event = raw("Company Holiday", person("Alice")).with_all_day(true);
            assert!(normalize(&event).is_none());
        }

        #[test]
        fn regular_event_is_kept() {
            let event = normalize(&raw("Planning", person("Alice"))).unwrap();
            assert_eq!(event.subject, "Planning");
            assert_eq!(
                event.link,
                "https://outlook.office365.com/owa/?itemid=Planning"
            );
        }
    }

    mod timezone {
        use super::*;

        #[test]
        fn converts_origin_zone_into_display_zone() {
            let event = at(
                raw("Review", person("Alice")),
                "2024-03-01T14:00:00.0000000",
                "Europe/Berlin",
            );
            let canonical = normalize_event(&event, &rules(), &Tz::UTC).unwrap().unwrap();
            assert_eq!(canonical.start_time.format("%H:%M").to_string(), "13:00");
        }

        #[test]
        fn display_zone_controls_wall_clock() {
            let event = at(raw("Review", person("Alice")), "2024-03-01T14:00:00", "UTC");
            let canonical = normalize_event(&event, &rules(), &Tz::America__Los_Angeles)
                .unwrap()
                .unwrap();
            assert_eq!(canonical.start_time.format("%H:%M").to_string(), "06:00");
        }

        #[test]
        fn windows_zone_names_are_understood() {
            let event = at(
                raw("Review", person("Alice")),
                "2024-07-01T10:00:00.0000000",
                "W. Europe Standard Time",
            );
            let canonical = normalize(&event).unwrap();
            assert_eq!(canonical.start_time.format("%H:%M").to_string(), "08:00");
        }
    }

    mod participants {
        use super::*;

        #[test]
        fn organizer_then_attendees() {
            let event = raw("Sync", person("Alice"))
                .with_attendee(person("Bob"))
                .with_attendee(person("Carol"));
            assert_eq!(
                tags(&normalize(&event).unwrap()),
                vec!["#[[Alice]]", "#[[Bob]]", "#[[Carol]]"]
            );
        }

        #[test]
        fn self_never_appears() {
            let event = raw("Sync", me())
                .with_attendee(me())
                .with_attendee(person("Bob"))
                .with_attendee(RawRecipient::new("ME@EXAMPLE.COM", "Me Again"));
            assert_eq!(tags(&normalize(&event).unwrap()), vec!["#[[Bob]]"]);
        }

        #[test]
        fn organizer_listed_as_attendee_appears_once() {
            let event = raw("Sync", person("Alice"))
                .with_attendee(person("Alice"))
                .with_attendee(me());
            assert_eq!(tags(&normalize(&event).unwrap()), vec!["#[[Alice]]"]);
        }

        #[test]
        fn dedup_is_by_display_name_not_address() {
            let event = raw("Sync", person("Alice"))
                .with_attendee(RawRecipient::new("sam.one@example.com", "Sam"))
                .with_attendee(RawRecipient::new("sam.two@example.com", "Sam"));
            assert_eq!(
                tags(&normalize(&event).unwrap()),
                vec!["#[[Alice]]", "#[[Sam]]"]
            );
        }

        #[test]
        fn distribution_lists_are_excluded() {
            let event = raw("Budget", me())
                .with_attendee(me())
                .with_attendee(RawRecipient::new("dl-finance@example.com", "DL Finance Team"));
            let canonical = normalize(&event).unwrap();
            assert!(canonical.participants.is_empty());
        }

        #[test]
        fn distribution_list_organizer_is_still_listed() {
            // The prefix filter applies to attendees only.
            let event = raw("Townhall", RawRecipient::new("dl@example.com", "DL All Hands"));
            assert_eq!(tags(&normalize(&event).unwrap()), vec!["#[[DL All Hands]]"]);
        }

        #[test]
        fn broadcast_lists_only_organizer() {
            let mut event = raw("All Hands", person("Alice"));
            for i in 0..25 {
                event = event.with_attendee(person(&format!("Person {}", i)));
            }
            assert_eq!(tags(&normalize(&event).unwrap()), vec!["#[[Alice]]"]);
        }

        #[test]
        fn broadcast_threshold_boundary() {
            let rules = rules().with_broadcast_threshold(3);

            let mut below = raw("Small", me());
            for name in ["A", "B"] {
                below = below.with_attendee(person(name));
            }
            let canonical = normalize_event(&below, &rules, &Tz::UTC).unwrap().unwrap();
            assert_eq!(canonical.participants.len(), 2);

            let at_threshold = below.with_attendee(person("C"));
            let canonical = normalize_event(&at_threshold, &rules, &Tz::UTC)
                .unwrap()
                .unwrap();
            assert!(canonical.participants.is_empty());
        }

        #[test]
        fn missing_attendee_list_is_empty() {
            let event = RawEvent {
                attendees: None,
                ..raw("Sync", person("Alice"))
            };
            assert_eq!(tags(&normalize(&event).unwrap()), vec!["#[[Alice]]"]);
        }
    }

    mod malformed {
        use super::*;

        #[test]
        fn missing_link() {
            let event = RawEvent {
                web_link: None,
                ..raw("Sync", person("Alice"))
            };
            let err = normalize_event(&event, &rules(), &Tz::UTC).unwrap_err();
            assert_eq!(
                err,
                FormatError::MissingField {
                    event: "Sync".to_string(),
                    field: "webLink"
                }
            );
        }

        #[test]
        fn missing_subject_uses_id_as_label() {
            let event = RawEvent {
                subject: None,
                ..raw("Sync", person("Alice")).with_id("evt-9")
            };
            let err = normalize_event(&event, &rules(), &Tz::UTC).unwrap_err();
            assert_eq!(err.event(), "evt-9");
        }

        #[test]
        fn bad_timestamp() {
            let event = at(raw("Sync", person("Alice")), "01/03/2024 14:00", "UTC");
            let err = normalize_event(&event, &rules(), &Tz::UTC).unwrap_err();
            assert!(matches!(err, FormatError::InvalidStart { .. }));
        }

        #[test]
        fn unknown_zone() {
            let event = at(raw("Sync", person("Alice")), "2024-03-01T14:00:00", "Atlantis");
            let err = normalize_event(&event, &rules(), &Tz::UTC).unwrap_err();
            assert!(err.to_string().contains("Atlantis"));
        }

        #[test]
        fn attendee_without_name() {
            let event = raw("Sync", person("Alice")).with_attendee(RawRecipient {
                email_address: crate::raw_event::RawEmailAddress {
                    address: Some("x@example.com".to_string()),
                    name: None,
                },
            });
            let err = normalize_event(&event, &rules(), &Tz::UTC).unwrap_err();
            assert_eq!(
                err,
                FormatError::MissingField {
                    event: "Sync".to_string(),
                    field: "attendees"
                }
            );
        }
    }

    mod policy {
        use super::*;

        fn day() -> Vec<RawEvent> {
            vec![
                raw("First", person("Alice")),
                RawEvent {
                    web_link: None,
                    ..raw("Broken", person("Bob"))
                },
                raw("Third", person("Carol")),
            ]
        }

        #[test]
        fn skip_policy_keeps_valid_events() {
            let events = normalize_events(&day(), &rules(), &Tz::UTC).unwrap();
            let subjects: Vec<_> = events.iter().map(|e| e.subject.as_str()).collect();
            assert_eq!(subjects, vec!["First", "Third"]);
        }

        #[test]
        fn abort_policy_fails_the_run() {
            let rules = rules().with_on_malformed(MalformedPolicy::Abort);
            let err = normalize_events(&day(), &rules, &Tz::UTC).unwrap_err();
            assert_eq!(err.event(), "Broken");
        }

        #[test]
        fn suppressed_events_are_not_errors_under_abort() {
            let rules = rules().with_on_malformed(MalformedPolicy::Abort);
            let raws = vec![
                raw("Fokuszeit", person("Alice")),
                raw("Holiday", person("Alice")).with_all_day(true),
                raw("Real", person("Alice")),
            ];
            let events = normalize_events(&raws, &rules, &Tz::UTC).unwrap();
            assert_eq!(events.len(), 1);
        }
    }

    mod sorting {
        use super::*;

        #[test]
        fn sorts_by_instant_across_zones() {
            let raws = vec![
                at(raw("Late", person("A")), "2024-03-01T11:00:00", "UTC"),
                // 09:00 Berlin is 08:00 UTC.
                at(raw("Early", person("B")), "2024-03-01T09:00:00", "Europe/Berlin"),
                at(raw("Middle", person("C")), "2024-03-01T09:30:00", "UTC"),
            ];
            let mut events = normalize_events(&raws, &rules(), &Tz::UTC).unwrap();
            sort_events(&mut events);
            let subjects: Vec<_> = events.iter().map(|e| e.subject.as_str()).collect();
            assert_eq!(subjects, vec!["Early", "Middle", "Late"]);
        }

        #[test]
        fn equal_starts_keep_input_order() {
            let raws = vec![
                at(raw("B", person("A")), "2024-03-01T10:00:00", "UTC"),
                at(raw("A", person("A")), "2024-03-01T10:00:00", "UTC"),
                at(raw("Z", person("A")), "2024-03-01T08:00:00", "UTC"),
                // Same instant as the 10:00 UTC events, written in another zone.
                at(raw("C", person("A")), "2024-03-01T11:00:00", "Europe/Berlin"),
            ];
            let mut events = normalize_events(&raws, &rules(), &Tz::UTC).unwrap();
            sort_events(&mut events);
            let subjects: Vec<_> = events.iter().map(|e| e.subject.as_str()).collect();
            assert_eq!(subjects, vec!["Z", "B", "A", "C"]);
        }

        #[test]
        fn sorting_empty_is_fine() {
            let mut events: Vec<CanonicalEvent> = Vec::new();
            sort_events(&mut events);
            assert!(events.is_empty());
        }
    }
}
