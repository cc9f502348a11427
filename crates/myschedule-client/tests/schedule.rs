//! `myschedule today` against in-memory providers.

use chrono::{FixedOffset, NaiveDate, Utc};
use myschedule_client::commands::schedule::run;
use myschedule_client::ClientError;
use myschedule_core::{MalformedPolicy, RulesError, ScheduleRules};
use myschedule_providers::{
    ErrorProvider, ProviderError, RawDateTimeZone, RawEvent, RawRecipient, StaticProvider,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn rules() -> ScheduleRules {
    ScheduleRules::new("me@example.com")
}

fn meeting(id: u32, subject: &str, start: &str, organizer: &str) -> RawEvent {
    RawEvent::new(
        subject,
        RawRecipient::new(
            format!("{}@example.com", organizer.to_lowercase()),
            organizer,
        ),
        RawDateTimeZone::new(start, "UTC"),
        format!("https://outlook.office365.com/owa/?itemid={}", id),
    )
    .with_attendee(RawRecipient::new("me@example.com", "Me"))
}

fn day() -> Vec<RawEvent> {
    vec![
        meeting(2, "Planning", "2024-03-01T14:00:00.0000000", "Bob"),
        meeting(1, "Standup", "2024-03-01T08:30:00.0000000", "Alice")
            .with_attendee(RawRecipient::new("carol@example.com", "Carol")),
        meeting(3, "Lunch", "2024-03-01T11:00:00.0000000", "Me"),
    ]
}

async fn output(
    provider: &StaticProvider,
    rules: &ScheduleRules,
    zone: &FixedOffset,
) -> Result<(usize, String), ClientError> {
    let mut out = Vec::new();
    let n = run(provider, date(), rules, zone, &mut out).await?;
    Ok((n, String::from_utf8(out).unwrap()))
}

#[tokio::test]
async fn prints_sorted_bullets() {
    let provider = StaticProvider::new(day());
    let rules = rules().with_noise_subjects(["Lunch"]);
    let cet = FixedOffset::east_opt(3600).unwrap();

    let (count, text) = output(&provider, &rules, &cet).await.unwrap();

    assert_eq!(count, 2);
    insta::assert_snapshot!(text, @r"
    * __09:30__ - [Standup](https://outlook.office365.com/owa/?itemid=1) #[[Alice]], #[[Carol]] #[[Meeting Minutes]]
    * __15:00__ - [Planning](https://outlook.office365.com/owa/?itemid=2) #[[Bob]] #[[Meeting Minutes]]
    ");
}

#[tokio::test]
async fn empty_day_prints_nothing() {
    let provider = StaticProvider::default();
    let (count, text) = output(&provider, &rules(), &utc()).await.unwrap();
    assert_eq!(count, 0);
    assert!(text.is_empty());
}

#[tokio::test]
async fn unauthenticated_provider_asks_for_logon() {
    let provider = ErrorProvider::new("graph", ProviderError::authentication("no session"));
    let mut out = Vec::new();

    let err = run(&provider, date(), &rules(), &Utc, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AuthRequired(_)));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        err.to_string(),
        "You are not authenticated. Run 'myschedule logon' first"
    );
    assert!(out.is_empty());
}

#[tokio::test]
async fn transport_failure_exits_with_one() {
    let provider = ErrorProvider::new("graph", ProviderError::network("connection reset"));
    let mut out = Vec::new();

    let err = run(&provider, date(), &rules(), &Utc, &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn rules_are_checked_before_fetching() {
    let provider = StaticProvider::new(day());
    let mut out = Vec::new();

    let err = run(&provider, date(), &ScheduleRules::default(), &Utc, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Rules(RulesError::MissingSelfEmail)
    ));
}

#[tokio::test]
async fn malformed_record_with_abort_policy() {
    let mut broken = meeting(4, "Broken", "2024-03-01T10:00:00.0000000", "Bob");
    broken.web_link = None;
    let mut events = day();
    events.push(broken);
    let provider = StaticProvider::new(events);

    let skip = output(&provider, &rules(), &utc()).await.unwrap();
    assert_eq!(skip.0, 3);

    let abort = rules().with_on_malformed(MalformedPolicy::Abort);
    let err = output(&provider, &abort, &utc()).await.unwrap_err();
    assert!(matches!(err, ClientError::Format(_)));
    assert_eq!(err.exit_code(), 1);
}
