//! Turns cluster events into rescheduler tasks

use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Pod};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::Resource;
use kube::api::Api;
use kube::runtime::{WatchStreamExt, watcher};
use serde::de::DeserializeOwned;
use smokemini::Conf;
use std::fmt::Debug;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{Level, event};

use crate::libs::tasks::Tasks;

/// Tasks queued when a probe pod or claim changes
const WORKLOAD: &[Tasks] = &[Tasks::PvcCleanup, Tasks::Reschedule];

/// Tasks queued when a placement input changes
const PLACEMENT: &[Tasks] = &[Tasks::Reschedule];

/// Queue every task for one event, returning false once the receiver is gone
fn send_all(tasks: &[Tasks], tx: &UnboundedSender<Tasks>) -> bool {
    tasks.iter().all(|task| tx.send(*task).is_ok())
}

/// Forward every event from a watch as tasks until the receiver goes away
///
/// # Arguments
///
/// * `api` - The api to watch
/// * `config` - The watch config to use
/// * `tasks` - The tasks to queue on each event
/// * `tx` - Where to send tasks
async fn forward<K>(
    api: Api<K>,
    config: watcher::Config,
    tasks: &'static [Tasks],
    tx: UnboundedSender<Tasks>,
) where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + 'static,
{
    let mut stream = watcher(api, config).default_backoff().boxed();
    while let Some(change) = stream.next().await {
        match change {
            Ok(_) => {
                if !send_all(tasks, &tx) {
                    break;
                }
            }
            Err(error) => event!(
                Level::WARN,
                msg = "Watch failed",
                kind = %K::kind(&()),
                error = error.to_string()
            ),
        }
    }
}

/// Start a watch for every object kind that should trigger a task
///
/// # Arguments
///
/// * `client` - Kubernetes client
/// * `conf` - The rescheduler config
/// * `tx` - Where to send tasks
pub fn spawn(client: &kube::Client, conf: &Conf, tx: &UnboundedSender<Tasks>) {
    let ns = conf.namespace.as_str();
    let probes = watcher::Config::default().labels(&conf.selector);
    let all = watcher::Config::default();
    // pods and claims drive the stuck pod cleanup and the probe selectors
    tokio::spawn(forward(
        Api::<Pod>::namespaced(client.clone(), ns),
        probes.clone(),
        WORKLOAD,
        tx.clone(),
    ));
    tokio::spawn(forward(
        Api::<PersistentVolumeClaim>::namespaced(client.clone(), ns),
        probes.clone(),
        WORKLOAD,
        tx.clone(),
    ));
    // placement inputs drive a reschedule
    tokio::spawn(forward(
        Api::<StatefulSet>::namespaced(client.clone(), ns),
        probes.clone(),
        PLACEMENT,
        tx.clone(),
    ));
    tokio::spawn(forward(
        Api::<PodDisruptionBudget>::namespaced(client.clone(), ns),
        probes,
        PLACEMENT,
        tx.clone(),
    ));
    tokio::spawn(forward(
        Api::<Node>::all(client.clone()),
        all.clone(),
        PLACEMENT,
        tx.clone(),
    ));
    tokio::spawn(forward(
        Api::<StorageClass>::all(client.clone()),
        all,
        PLACEMENT,
        tx.clone(),
    ));
}
