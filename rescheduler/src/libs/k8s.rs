//! Backs the rescheduler with a real k8s cluster

use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::config::KubeConfigOptions;
use tracing::instrument;

use smokemini::conf::ValuesLocation;
use smokemini::models::Values;
use smokemini::{Conf, Error};

mod deletes;
mod snapshots;
mod values;
pub mod watch;

use crate::libs::cluster::Cluster;
use crate::libs::patches::Patches;
use crate::libs::snapshot::{Snapshots, Volume};

/// A k8s cluster our probes run in
pub struct K8s {
    /// Kubernetes client
    client: kube::Client,
    /// The namespace our probes live in
    namespace: String,
    /// The label selector matching our probe objects
    selector: String,
    /// Where our values are persisted
    location: ValuesLocation,
    /// The field manager to write values with
    field_manager: String,
    /// The config map our values were last loaded from
    loaded: Option<ConfigMap>,
}

impl K8s {
    /// Connect to a k8s cluster
    ///
    /// Without a context the in cluster service account or default kube config is used.
    ///
    /// # Arguments
    ///
    /// * `conf` - The rescheduler config
    /// * `context_name` - The kube config context to use
    pub async fn new(conf: &Conf, context_name: Option<&str>) -> Result<Self, Error> {
        let client = match context_name {
            Some(context) => {
                // build the options for getting a specific clusters config
                let opts = KubeConfigOptions {
                    context: Some(context.to_owned()),
                    ..Default::default()
                };
                let config = kube::Config::from_kubeconfig(&opts).await?;
                kube::Client::try_from(config)?
            }
            None => kube::Client::try_default().await?,
        };
        Ok(K8s {
            client,
            namespace: conf.namespace.clone(),
            selector: conf.selector.clone(),
            location: conf.values.clone(),
            field_manager: conf.field_manager.clone(),
            loaded: None,
        })
    }

    /// Get the client for this cluster
    pub fn client(&self) -> &kube::Client {
        &self.client
    }

    /// Get the config map api for our namespace
    fn config_maps(&self) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait::async_trait]
impl Cluster for K8s {
    #[instrument(name = "K8s::snapshots", skip_all, err(Debug))]
    async fn snapshots(&self) -> Result<Snapshots, Error> {
        snapshots::list(&self.client, &self.namespace, &self.selector).await
    }

    #[instrument(name = "K8s::volumes", skip_all, err(Debug))]
    async fn volumes(&self) -> Result<Vec<Volume>, Error> {
        snapshots::volumes(&self.client).await
    }

    #[instrument(name = "K8s::load_values", skip_all, err(Debug))]
    async fn load_values(&mut self) -> Result<Values, Error> {
        let (values, loaded) = values::load(&self.config_maps(), &self.location).await?;
        self.loaded = loaded;
        Ok(values)
    }

    #[instrument(name = "K8s::save_values", skip_all, err(Debug))]
    async fn save_values(&mut self, values: &Values) -> Result<(), Error> {
        let saved = values::save(
            &self.config_maps(),
            &self.location,
            self.loaded.take(),
            values,
            &self.field_manager,
        )
        .await?;
        self.loaded = Some(saved);
        Ok(())
    }

    #[instrument(name = "K8s::flush", skip_all, err(Debug))]
    async fn flush(&mut self, patches: &Patches) -> Result<usize, Error> {
        deletes::flush(&self.client, patches).await
    }
}
