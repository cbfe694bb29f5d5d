use crate::stack::{Lifecycle, ProposedUpgrade, SchemaEntry, SchemaStatus, SchemaVersion};
use chrono::{DateTime, Duration, Utc};

/// How far ahead of now a proposed schema takes effect.
pub fn future_schema_horizon() -> Duration {
    Duration::days(5)
}

/// How long a proposal waits before it is written to the spec. Must stay below the
/// horizon so the spec carries the new schema before its effective date.
pub fn apply_schema_delay() -> Duration {
    Duration::days(3)
}

/// Computes the schema list that should replace the spec's schemas, and when.
///
/// A pending proposal is returned unchanged until its upgrade time passes. Otherwise
/// obsolete schemas are dropped and, unless the newest schema already is `target`,
/// a `target` schema is scheduled `future_schema_horizon()` from now. Future schemas
/// that do not end on `target` are replaced.
pub fn propose_upgrade(
    statuses: &[SchemaStatus],
    existing: Option<&ProposedUpgrade>,
    now: DateTime<Utc>,
    target: SchemaVersion,
) -> Option<ProposedUpgrade> {
    if let Some(existing) = existing {
        if now < existing.upgrade_time {
            return Some(existing.clone());
        }
    }

    let mut schemas: Vec<SchemaEntry> = Vec::with_capacity(statuses.len() + 1);
    let mut dropped = false;
    // (index into schemas, index into statuses) of the first future schema
    let mut first_future = None;
    for (i, s) in statuses.iter().enumerate() {
        match s.status {
            Lifecycle::Obsolete => {
                dropped = true;
                continue;
            }
            Lifecycle::Future if first_future.is_none() => {
                first_future = Some((schemas.len(), i))
            }
            _ => {}
        }
        schemas.push(s.entry());
    }

    let upcoming = SchemaEntry::new(target, (now + future_schema_horizon()).date_naive());
    match first_future {
        None => {
            let current = schemas.last().map_or(false, |last| last.version == target);
            if !current {
                schemas.push(upcoming);
            } else if !dropped {
                return None;
            }
        }
        Some((at, i)) => {
            if statuses[i].version == target && i + 1 == statuses.len() {
                return None;
            }
            schemas.truncate(at);
            schemas.push(upcoming);
        }
    }

    Some(ProposedUpgrade {
        upgrade_time: now + apply_schema_delay(),
        schemas,
    })
}
