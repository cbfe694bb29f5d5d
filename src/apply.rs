use crate::errors::*;
use crate::retry::Backoff;
use crate::stack::{LogStack, ProposedUpgrade};
use crate::store::{ObjectKey, StackStore};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

/// Returns the proposal that may be written to the spec now, if any.
fn due_upgrade(stack: &LogStack, key: &ObjectKey, now: DateTime<Utc>) -> Option<ProposedUpgrade> {
    if !stack.spec.storage.allow_automatic_upgrade {
        info!("Skip {}: automatic upgrade not enabled", key);
        return None;
    }

    let proposal = match stack.proposed_upgrade() {
        Some(p) => p,
        None => {
            debug!("Skip {}: no automatic upgrade scheduled", key);
            return None;
        }
    };

    if now < proposal.upgrade_time {
        info!(
            "Skip {}: automatic upgrade scheduled for {}",
            key, proposal.upgrade_time
        );
        return None;
    }

    // never restructure storage of a stack that is not healthy
    if !stack.is_ready() {
        info!("Skip {}: logstack does not have an active Ready condition", key);
        return None;
    }

    Some(proposal.clone())
}

/// Whether the spec no longer carries the schemas the proposal was computed from.
/// Only the last proposed schema may be new.
fn spec_edited(stack: &LogStack, proposal: &ProposedUpgrade) -> bool {
    let kept = proposal.schemas.len().saturating_sub(1);
    proposal.schemas[..kept]
        .iter()
        .any(|e| !stack.spec.storage.schemas.contains(e))
}

fn upgraded(stack: &LogStack, proposal: &ProposedUpgrade) -> LogStack {
    let mut modified = stack.clone();
    modified.spec.storage.schemas = proposal.schemas.clone();
    if let Some(status) = modified.status.as_mut() {
        status.storage.automatic_upgrade = None;
    }
    modified
}

/// Writes a due schema upgrade proposal into the stack's spec.
///
/// Does nothing unless automatic upgrades are allowed, the proposal's upgrade time has
/// passed and the stack is Ready. Conflicting writes are retried against a fresh copy
/// of the stack, once per backoff step, as long as the same proposal is still due.
pub async fn apply_due_upgrade<S>(
    store: &S,
    key: &ObjectKey,
    now: DateTime<Utc>,
    backoff: &Backoff,
) -> Result<()>
where
    S: StackStore + ?Sized,
{
    let stack = match store.get(key).await {
        Ok(s) => s,
        Err(e) if e.is_not_found() => {
            // deleted before we got to it
            info!("Skip {}: logstack not found", key);
            return Ok(());
        }
        Err(e) => return Err(e).chain_err(|| format!("failed to lookup logstack {}", key)),
    };

    let proposal = match due_upgrade(&stack, key, now) {
        Some(p) => p,
        None => return Ok(()),
    };

    info!("Running automatic upgrade of storage schemas for {}", key);
    if spec_edited(&stack, &proposal) {
        warn!(
            "Overwriting storage schemas of {} edited after the upgrade was proposed",
            key
        );
    }
    let mut modified = upgraded(&stack, &proposal);
    let mut delays = backoff.delays();
    loop {
        let err = match store.update(&modified).await {
            Ok(_) => {
                info!("Upgraded storage schemas of {}", key);
                return Ok(());
            }
            Err(e) => e,
        };
        if !err.is_conflict() {
            return Err(err);
        }
        let delay = match delays.next() {
            Some(d) => d,
            None => return Err(err),
        };
        tokio::time::sleep(delay).await;

        let fresh = match store.get(key).await {
            Ok(s) => s,
            Err(e) if e.is_not_found() => {
                info!("Skip {}: logstack deleted during upgrade", key);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        match due_upgrade(&fresh, key, now) {
            Some(p) if p == proposal => {}
            _ => {
                info!("Skip {}: scheduled upgrade changed concurrently", key);
                return Ok(());
            }
        }

        info!("Retrying automatic upgrade of storage schemas for {}", key);
        modified = upgraded(&fresh, &proposal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::SchemaVersion::*;
    use crate::stack::{LogStackSpec, ObjectStorageSpec, SchemaEntry, SchemaVersion};
    use chrono::TimeZone;

    fn entry(version: SchemaVersion, date: &str) -> SchemaEntry {
        SchemaEntry {
            version,
            effective_date: date.to_string(),
        }
    }

    fn stack(schemas: Vec<SchemaEntry>) -> LogStack {
        LogStack::new(
            "test",
            LogStackSpec {
                storage: ObjectStorageSpec {
                    schemas,
                    allow_automatic_upgrade: true,
                },
                retention: None,
            },
        )
    }

    fn proposal(schemas: Vec<SchemaEntry>) -> ProposedUpgrade {
        ProposedUpgrade {
            upgrade_time: Utc.with_ymd_and_hms(2023, 12, 4, 0, 0, 0).unwrap(),
            schemas,
        }
    }

    #[test]
    fn unchanged_spec_is_not_an_edit() {
        let p = proposal(vec![entry(V12, "2023-01-01"), entry(V13, "2023-12-06")]);
        assert!(!spec_edited(&stack(vec![entry(V12, "2023-01-01")]), &p));

        // future schemas cut off by the proposal
        let s = stack(vec![entry(V12, "2023-01-01"), entry(V12, "2023-12-03")]);
        assert!(!spec_edited(&s, &p));

        // obsolete schemas dropped by the proposal
        let cleanup = proposal(vec![entry(V13, "2023-01-01")]);
        let s = stack(vec![entry(V13, "2022-12-01"), entry(V13, "2023-01-01")]);
        assert!(!spec_edited(&s, &cleanup));
    }

    #[test]
    fn detects_user_edit() {
        let p = proposal(vec![entry(V12, "2023-01-01"), entry(V13, "2023-12-06")]);
        assert!(spec_edited(&stack(vec![entry(V11, "2023-01-01")]), &p));
        assert!(spec_edited(&stack(vec![]), &p));
    }
}
