use crate::errors::*;
use crate::schema::{compute_statuses, validate_schemas};
use crate::stack::{LogStackStatus, ProposedUpgrade, SchemaVersion, StorageStatus};
use crate::store::{ObjectKey, StackStore};
use crate::upgrade::propose_upgrade;
use crate::warnings::{generate_warnings, merge_warnings};
use chrono::{DateTime, Utc};
use log::{debug, info};

/// Inputs of the schema lifecycle that come from operator configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub target_version: SchemaVersion,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            target_version: SchemaVersion::LATEST,
        }
    }
}

/// Recomputes the storage schema status of a stack and writes it back.
///
/// A due proposal is kept as is while automatic upgrades are allowed and the stack is
/// not Ready, so its upgrade time stays in the past until it can be applied.
/// Returns the proposal now stored in the status so callers can requeue before it
/// becomes due.
pub async fn set_storage_schema_status<S>(
    store: &S,
    key: &ObjectKey,
    now: DateTime<Utc>,
    settings: &Settings,
) -> Result<Option<ProposedUpgrade>>
where
    S: StackStore + ?Sized,
{
    let mut stack = match store.get(key).await {
        Ok(s) => s,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e).chain_err(|| format!("failed to lookup logstack {}", key)),
    };

    let schemas = &stack.spec.storage.schemas;
    validate_schemas(schemas)?;
    let statuses = compute_statuses(schemas, now, stack.retention_window())?;

    let existing = stack.status.clone().unwrap_or_default();
    let proposal = match existing.storage.automatic_upgrade.as_ref() {
        // a due upgrade waits for the stack to become Ready again
        Some(due)
            if now >= due.upgrade_time
                && stack.spec.storage.allow_automatic_upgrade
                && !stack.is_ready() =>
        {
            info!(
                "Holding due schema upgrade of {} until the logstack is Ready",
                key
            );
            Some(due.clone())
        }
        pending => propose_upgrade(&statuses, pending, now, settings.target_version),
    };
    let warnings = generate_warnings(&statuses, settings.target_version);

    let status = LogStackStatus {
        conditions: merge_warnings(&existing.conditions, &warnings, now),
        storage: StorageStatus {
            schemas: statuses,
            automatic_upgrade: proposal.clone(),
        },
    };

    if stack.status.as_ref() == Some(&status) {
        debug!("Storage schema status of {} is up to date", key);
        return Ok(proposal);
    }

    stack.status = Some(status);
    store.update_status(&stack).await?;
    debug!("Updated storage schema status of {}", key);
    Ok(proposal)
}
