use crate::errors::*;
use crate::stack::LogStack;
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::Client;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        ObjectKey {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Persistent LogStack storage.
///
/// Failed calls are classified: `ErrorKind::NotFound` when the object does not exist,
/// `ErrorKind::Conflict` when an update was based on a stale resourceVersion.
#[async_trait]
pub trait StackStore: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<LogStack>;

    /// Writes spec and metadata, failing with a conflict if the object changed since it was read.
    async fn update(&self, stack: &LogStack) -> Result<LogStack>;

    /// Writes the status subresource, failing with a conflict if the object changed since
    /// it was read.
    async fn update_status(&self, stack: &LogStack) -> Result<LogStack>;
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        KubeStore { client }
    }

    fn api(&self, namespace: &str) -> Api<LogStack> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn classify(err: kube::Error, key: &ObjectKey) -> Error {
    match err {
        kube::Error::Api(ref ae) if ae.code == 404 => ErrorKind::NotFound(key.to_string()).into(),
        kube::Error::Api(ref ae) if ae.code == 409 => ErrorKind::Conflict(key.to_string()).into(),
        err => err.into(),
    }
}

#[async_trait]
impl StackStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<LogStack> {
        self.api(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| classify(e, key))
    }

    async fn update(&self, stack: &LogStack) -> Result<LogStack> {
        let key = stack.key()?;
        self.api(&key.namespace)
            .replace(&key.name, &PostParams::default(), stack)
            .await
            .map_err(|e| classify(e, &key))
    }

    async fn update_status(&self, stack: &LogStack) -> Result<LogStack> {
        let key = stack.key()?;
        let data = serde_json::to_vec(stack)?;
        self.api(&key.namespace)
            .replace_status(&key.name, &PostParams::default(), data)
            .await
            .map_err(|e| classify(e, &key))
    }
}
