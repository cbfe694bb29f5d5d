use crate::errors::*;
use crate::stack::{Lifecycle, SchemaEntry, SchemaStatus, EFFECTIVE_DATE_FORMAT};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::HashSet;

/// Checks that every effective date parses and that no two schemas start on the same day.
pub fn validate_schemas(entries: &[SchemaEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        let date = entry.utc_date()?;
        if !seen.insert(date) {
            bail!(ErrorKind::DuplicateEffectiveDate(entry.effective_date.clone()));
        }
    }
    Ok(())
}

/// Computes end date and lifecycle of every schema, ordered by effective date.
///
/// A schema ends the day before its successor takes effect. It becomes obsolete once
/// more than `retention` has passed since its end date; a zero or negative retention
/// never obsoletes anything.
pub fn compute_statuses(
    entries: &[SchemaEntry],
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<Vec<SchemaStatus>> {
    let mut dated = entries
        .iter()
        .map(|e| e.utc_date().map(|date| (date, e)))
        .collect::<Result<Vec<(NaiveDate, &SchemaEntry)>>>()?;
    dated.sort_by_key(|(date, _)| *date);

    let statuses = dated
        .iter()
        .enumerate()
        .map(|(i, (date, entry))| {
            let end = dated.get(i + 1).map(|(next, _)| *next - Duration::days(1));

            let status = match end {
                Some(end) if retention > Duration::zero() && now - start_of(end) > retention => {
                    Lifecycle::Obsolete
                }
                _ if now < start_of(*date) => Lifecycle::Future,
                _ => Lifecycle::InUse,
            };

            SchemaStatus {
                version: entry.version,
                effective_date: entry.effective_date.clone(),
                end_date: end.map(|d| d.format(EFFECTIVE_DATE_FORMAT).to_string()),
                status,
            }
        })
        .collect();

    Ok(statuses)
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
