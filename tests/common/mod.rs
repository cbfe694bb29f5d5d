#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use error_chain::bail;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use logstack::errors::*;
use logstack::stack::*;
use logstack::store::{ObjectKey, StackStore};
use std::sync::Mutex;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap()
}

pub fn key() -> ObjectKey {
    ObjectKey::new("logging", "stack")
}

pub fn entry(version: SchemaVersion, date: &str) -> SchemaEntry {
    SchemaEntry {
        version,
        effective_date: date.to_string(),
    }
}

pub fn ready(status: &str) -> Condition {
    Condition {
        type_: CONDITION_READY.to_string(),
        status: status.to_string(),
        reason: "ReadyComponents".to_string(),
        message: "All components ready".to_string(),
        observed_generation: None,
        last_transition_time: Time(now() - chrono::Duration::days(30)),
    }
}

pub fn stack(schemas: Vec<SchemaEntry>) -> LogStack {
    let mut s = LogStack::new(
        "stack",
        LogStackSpec {
            storage: ObjectStorageSpec {
                schemas,
                allow_automatic_upgrade: true,
            },
            retention: None,
        },
    );
    s.metadata.namespace = Some("logging".to_string());
    s.metadata.resource_version = Some("1".to_string());
    s.status = Some(LogStackStatus {
        conditions: vec![ready("True")],
        ..LogStackStatus::default()
    });
    s
}

pub fn with_proposal(mut s: LogStack, proposal: ProposedUpgrade) -> LogStack {
    s.status.get_or_insert_with(Default::default).storage.automatic_upgrade = Some(proposal);
    s
}

#[derive(Default)]
pub struct Calls {
    pub get: usize,
    pub update: usize,
    pub update_status: usize,
}

/// In-memory store with resourceVersion checks and injectable conflicts.
#[derive(Default)]
pub struct MemoryStore {
    pub stack: Mutex<Option<LogStack>>,
    pub conflicts: Mutex<usize>,
    pub fail_updates: Mutex<bool>,
    pub calls: Mutex<Calls>,
}

impl MemoryStore {
    pub fn new(stack: LogStack) -> Self {
        MemoryStore {
            stack: Mutex::new(Some(stack)),
            ..MemoryStore::default()
        }
    }

    pub fn with_conflicts(self, n: usize) -> Self {
        *self.conflicts.lock().unwrap() = n;
        self
    }

    pub fn current(&self) -> Option<LogStack> {
        self.stack.lock().unwrap().clone()
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        let c = self.calls.lock().unwrap();
        (c.get, c.update, c.update_status)
    }

    fn write(&self, stack: &LogStack, status_only: bool) -> Result<LogStack> {
        let key = stack.key()?;
        if *self.fail_updates.lock().unwrap() {
            bail!("connection refused");
        }
        {
            let mut conflicts = self.conflicts.lock().unwrap();
            if *conflicts > 0 {
                *conflicts -= 1;
                bail!(ErrorKind::Conflict(key.to_string()));
            }
        }

        let mut stored = self.stack.lock().unwrap();
        let current = match stored.as_mut() {
            Some(s) => s,
            None => bail!(ErrorKind::NotFound(key.to_string())),
        };
        if current.metadata.resource_version != stack.metadata.resource_version {
            bail!(ErrorKind::Conflict(key.to_string()));
        }

        let version: u64 = current
            .metadata
            .resource_version
            .as_deref()
            .unwrap_or("0")
            .parse()
            .unwrap();
        if status_only {
            current.status = stack.status.clone();
        } else {
            // spec updates leave the status subresource alone
            current.spec = stack.spec.clone();
        }
        current.metadata.resource_version = Some((version + 1).to_string());
        Ok(current.clone())
    }
}

#[async_trait]
impl StackStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<LogStack> {
        self.calls.lock().unwrap().get += 1;
        self.current()
            .ok_or_else(|| ErrorKind::NotFound(key.to_string()).into())
    }

    async fn update(&self, stack: &LogStack) -> Result<LogStack> {
        self.calls.lock().unwrap().update += 1;
        self.write(stack, false)
    }

    async fn update_status(&self, stack: &LogStack) -> Result<LogStack> {
        self.calls.lock().unwrap().update_status += 1;
        self.write(stack, true)
    }
}
