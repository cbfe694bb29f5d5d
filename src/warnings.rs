use crate::stack::{Lifecycle, SchemaStatus, SchemaVersion, CONDITION_WARNING};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use std::collections::BTreeSet;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaWarning {
    ObsoleteSchema,
    OldSchemaVersion,
    FutureOldSchemaVersion,
}

impl SchemaWarning {
    pub fn reason(&self) -> &'static str {
        match self {
            SchemaWarning::ObsoleteSchema => "ObsoleteSchema",
            SchemaWarning::OldSchemaVersion => "OldSchemaVersion",
            SchemaWarning::FutureOldSchemaVersion => "FutureOldSchemaVersion",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SchemaWarning::ObsoleteSchema => concat!(
                "The schema configuration contains one or more schemas that are not in use ",
                "anymore due to retention settings."
            ),
            SchemaWarning::OldSchemaVersion => concat!(
                "The schema configuration contains one or more schemas that do not use the ",
                "most recent version."
            ),
            SchemaWarning::FutureOldSchemaVersion => concat!(
                "The schema configuration contains future schemas, that do not use the most ",
                "recent version."
            ),
        }
    }

    pub fn to_condition(&self, now: DateTime<Utc>) -> Condition {
        Condition {
            type_: CONDITION_WARNING.to_string(),
            status: "True".to_string(),
            reason: self.reason().to_string(),
            message: self.message().to_string(),
            observed_generation: None,
            last_transition_time: Time(now),
        }
    }
}

pub fn generate_warnings(
    statuses: &[SchemaStatus],
    target: SchemaVersion,
) -> BTreeSet<SchemaWarning> {
    let mut warnings = BTreeSet::new();
    for s in statuses {
        if s.status == Lifecycle::Obsolete {
            warnings.insert(SchemaWarning::ObsoleteSchema);
        }

        if s.version != target {
            warnings.insert(SchemaWarning::OldSchemaVersion);

            if s.status == Lifecycle::Future {
                warnings.insert(SchemaWarning::FutureOldSchemaVersion);
            }
        }
    }
    warnings
}

/// Replaces every Warning condition with the given warnings. Other conditions are kept
/// as they are, and a warning that was already raised keeps its transition time.
pub fn merge_warnings(
    conditions: &[Condition],
    warnings: &BTreeSet<SchemaWarning>,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    let mut merged: Vec<Condition> = conditions
        .iter()
        .filter(|c| c.type_ != CONDITION_WARNING)
        .cloned()
        .collect();

    for w in warnings {
        let mut cond = w.to_condition(now);
        if let Some(prev) = conditions.iter().find(|c| {
            c.type_ == CONDITION_WARNING && c.reason == w.reason() && c.status == cond.status
        }) {
            cond.last_transition_time = prev.last_transition_time.clone();
        }
        merged.push(cond);
    }
    merged
}
