//! Schedule commands: `today`, `tomorrow`, `day`.

use std::io::Write;

use chrono::{NaiveDate, TimeZone};
use tracing::debug;

use myschedule_core::{ScheduleDay, ScheduleRules, render_day};
use myschedule_providers::{CalendarProvider, FetchDay, normalize_events, sort_events};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Fetches `date` from `provider` and writes one bullet per meeting to `out`.
///
/// Times are shown in `display`. Returns the number of bullets written.
pub async fn run<Z: TimeZone, W: Write>(
    provider: &dyn CalendarProvider,
    date: NaiveDate,
    rules: &ScheduleRules,
    display: &Z,
    out: &mut W,
) -> ClientResult<usize> {
    if !provider.is_authenticated() {
        return Err(ClientError::not_authenticated());
    }
    rules.validate()?;

    let day = FetchDay::new(date, display)?;
    let raws = provider.fetch_day(day).await?;
    debug!("{} returned {} records for {}", provider.name(), raws.len(), date);

    let mut events = normalize_events(&raws, rules, display)?;
    sort_events(&mut events);

    let lines = render_day(&events);
    for line in &lines {
        writeln!(out, "{}", line)?;
    }
    Ok(lines.len())
}

/// Prints the meetings of `day` in the local zone.
#[cfg(feature = "graph")]
pub async fn show(day: ScheduleDay, config: &ClientConfig) -> ClientResult<()> {
    use chrono::Local;
    use myschedule_providers::graph::GraphProvider;

    let date = resolve_date(day, Local::now().date_naive())?;

    let settings = config.graph.clone().unwrap_or_default();
    if settings.client_id.is_none() {
        return Err(ClientError::not_authenticated());
    }
    let provider = GraphProvider::new(settings.to_provider_config()?)?;
    if !provider.is_authenticated() {
        return Err(ClientError::not_authenticated());
    }

    let mut rules = config.schedule.clone();
    if rules.self_email.trim().is_empty() {
        let address = provider.signed_in_address().await?;
        debug!("using signed-in address {} as self_email", address);
        rules = rules.with_self_email(address);
    }

    let stdout = std::io::stdout();
    run(&provider, date, &rules, &Local, &mut stdout.lock()).await?;
    Ok(())
}

#[cfg(not(feature = "graph"))]
pub async fn show(_day: ScheduleDay, _config: &ClientConfig) -> ClientResult<()> {
    Err(ClientError::Config(
        "no calendar provider compiled in, rebuild with the `graph` feature".to_string(),
    ))
}

fn resolve_date(day: ScheduleDay, today: NaiveDate) -> ClientResult<NaiveDate> {
    day.resolve(today)
        .ok_or_else(|| ClientError::Config(format!("no day after {}", today)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tomorrow_overflow_is_an_error() {
        assert!(resolve_date(ScheduleDay::Tomorrow, NaiveDate::MAX).is_err());
        assert_eq!(
            resolve_date(ScheduleDay::Tomorrow, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap())
                .unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }
}
