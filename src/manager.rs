use crate::apply::apply_due_upgrade;
use crate::config::Config;
use crate::errors::*;
use crate::stack::{LogStack, ProposedUpgrade};
use crate::status::set_storage_schema_status;
use crate::store::KubeStore;
use chrono::{DateTime, Utc};
use futures::{future::BoxFuture, Future, FutureExt, StreamExt};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{api::Api, client::Client, ResourceExt};
use kube_runtime::controller::{Action, Controller};
use kube_runtime::watcher;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

// Context for our reconciler
#[derive(Clone)]
struct Data {
    /// logstack storage backed by the kubernetes api
    store: KubeStore,
    config: Config,
}

async fn with_timeout<T, F>(limit: Duration, op: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => bail!(ErrorKind::Timeout(op.to_string())),
    }
}

/// Requeue early enough to pick up a pending upgrade once it becomes due.
fn next_requeue(
    pending: Option<&ProposedUpgrade>,
    now: DateTime<Utc>,
    interval: Duration,
) -> Duration {
    pending
        .and_then(|p| (p.upgrade_time - now).to_std().ok())
        .map(|until| until + Duration::from_secs(1))
        .filter(|until| *until < interval)
        .unwrap_or(interval)
}

async fn reconcile(stack: Arc<LogStack>, ctx: Arc<Data>) -> Result<Action> {
    let key = stack.key()?;
    debug!("Reconcile LogStack {}", key);

    let now = Utc::now();
    let config = &ctx.config;
    let timeout = config.api_timeout();

    with_timeout(
        timeout,
        "schema upgrade",
        apply_due_upgrade(&ctx.store, &key, now, &config.retry),
    )
    .await?;

    let pending = with_timeout(
        timeout,
        "schema status update",
        set_storage_schema_status(&ctx.store, &key, now, &config.settings()),
    )
    .await?;

    Ok(Action::requeue(next_requeue(
        pending.as_ref(),
        now,
        config.reconcile_interval(),
    )))
}

fn error_policy(stack: Arc<LogStack>, error: &Error, ctx: Arc<Data>) -> Action {
    warn!("reconcile of {} failed: {}", stack.name_any(), error);
    Action::requeue(ctx.config.error_requeue())
}

pub struct Manager {}

/// Manager that owns a Controller for LogStack
impl Manager {
    /// Lifecycle initialization interface for app
    ///
    /// This returns a `Manager` that drives a `Controller` + a future to be awaited
    /// It is up to `main` to wait for the controller stream.
    pub async fn new(client: Client, config: Config) -> Result<(Self, BoxFuture<'static, ()>)> {
        let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
        crds.get("logstacks.pikach.us")
            .await
            .chain_err(|| "install the logstack crd first")?;

        info!(
            "Managing logstacks, target schema version {}",
            config.target_version
        );
        let context = Arc::new(Data {
            store: KubeStore::new(client.clone()),
            config,
        });

        let stacks = Api::<LogStack>::all(client);
        let drainer = Controller::new(stacks, watcher::Config::default())
            .run(reconcile, error_policy, context)
            .for_each(|o| {
                match o {
                    Ok((obj, action)) => info!("Reconciled {} ({:?})", obj.name, action),
                    Err(e) => debug!("Controller event: {:?}", e),
                }
                futures::future::ready(())
            })
            .boxed();
        // what we do with the controller stream from .run() ^^ does not matter
        // but we do need to consume it, hence general printing + return future

        Ok((Self {}, drainer))
    }
}
