use crate::errors::*;
use crate::store::ObjectKey;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::ResourceExt;
use kube_derive::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire format of schema effective and end dates.
pub const EFFECTIVE_DATE_FORMAT: &str = "%Y-%m-%d";

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_WARNING: &str = "Warning";

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, PartialEq, JsonSchema)]
#[kube(
    group = "pikach.us",
    version = "v1",
    kind = "LogStack",
    status = "LogStackStatus",
    shortname = "lstack",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Upgrade", "type":"string",
        "jsonPath":".status.storage.automaticUpgrade.upgradeTime"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct LogStackSpec {
    pub storage: ObjectStorageSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionSpec>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageSpec {
    /// schemas lists the storage schemas and the dates they take effect on.
    pub schemas: Vec<SchemaEntry>,

    /// allowAutomaticUpgrade lets the operator commit proposed schema upgrades to this spec.
    #[serde(default)]
    pub allow_automatic_upgrade: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, JsonSchema)]
pub struct RetentionSpec {
    /// days of log data kept. Zero disables schema obsolescence.
    pub days: u32,
}

#[derive(
    Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
pub enum SchemaVersion {
    #[serde(rename = "v9")]
    V9,
    #[serde(rename = "v10")]
    V10,
    #[serde(rename = "v11")]
    V11,
    #[serde(rename = "v12")]
    V12,
    #[serde(rename = "v13")]
    V13,
}

impl SchemaVersion {
    pub const LATEST: SchemaVersion = SchemaVersion::V13;

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V9 => "v9",
            SchemaVersion::V10 => "v10",
            SchemaVersion::V11 => "v11",
            SchemaVersion::V12 => "v12",
            SchemaVersion::V13 => "v13",
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        SchemaVersion::LATEST
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "v9" => Ok(SchemaVersion::V9),
            "v10" => Ok(SchemaVersion::V10),
            "v11" => Ok(SchemaVersion::V11),
            "v12" => Ok(SchemaVersion::V12),
            "v13" => Ok(SchemaVersion::V13),
            _ => Err(ErrorKind::InvalidSchemaVersion(s.to_string()).into()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntry {
    pub version: SchemaVersion,
    /// effectiveDate is the UTC day (YYYY-MM-DD) the schema starts to apply.
    pub effective_date: String,
}

impl SchemaEntry {
    pub fn new(version: SchemaVersion, date: NaiveDate) -> Self {
        SchemaEntry {
            version,
            effective_date: date.format(EFFECTIVE_DATE_FORMAT).to_string(),
        }
    }

    pub fn utc_date(&self) -> Result<NaiveDate> {
        parse_date(&self.effective_date)
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, EFFECTIVE_DATE_FORMAT)
        .map_err(|_| ErrorKind::InvalidEffectiveDate(s.to_string()).into())
}

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
pub enum Lifecycle {
    Future,
    InUse,
    Obsolete,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaStatus {
    pub version: SchemaVersion,
    pub effective_date: String,
    /// endDate is the last day the schema applies. Unset for the newest schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub status: Lifecycle,
}

impl SchemaStatus {
    pub fn entry(&self) -> SchemaEntry {
        SchemaEntry {
            version: self.version,
            effective_date: self.effective_date.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposedUpgrade {
    /// upgradeTime is the earliest time the schemas below are written to the spec.
    pub upgrade_time: DateTime<Utc>,
    pub schemas: Vec<SchemaEntry>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogStackStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub storage: StorageStatus,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageStatus {
    #[serde(default)]
    pub schemas: Vec<SchemaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_upgrade: Option<ProposedUpgrade>,
}

impl LogStack {
    pub fn key(&self) -> Result<ObjectKey> {
        let namespace = self
            .namespace()
            .ok_or_else(|| Error::from(format!("logstack {} has no namespace", self.name_any())))?;
        Ok(ObjectKey::new(namespace, self.name_any()))
    }

    /// Whether the stack currently reports a true Ready condition.
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.iter().find(|c| c.type_ == CONDITION_READY))
            .map_or(false, |c| c.status == "True")
    }

    pub fn retention_window(&self) -> Duration {
        let days = self.spec.retention.as_ref().map_or(0, |r| r.days);
        Duration::days(i64::from(days))
    }

    pub fn proposed_upgrade(&self) -> Option<&ProposedUpgrade> {
        self.status
            .as_ref()
            .and_then(|s| s.storage.automatic_upgrade.as_ref())
    }
}
