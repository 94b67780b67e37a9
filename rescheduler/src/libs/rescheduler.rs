//! Runs the smoke-mini tasks against a cluster on a schedule and in response to events

use chrono::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{Instrument, Level, event, instrument, span};

use smokemini::models::Values;
use smokemini::{Conf, Error, from_now};

use super::cluster::Cluster;
use super::patches::Patches;
use super::reschedule::{self, Outcome};
use super::tasks::{TaskQueue, Tasks};
use super::{collector, migrate, populate, pvc};

/// What woke our task loop
enum Wake {
    /// The next task is due
    Timer,
    /// A watch asked for a task
    Event(Tasks),
    /// Every watch has stopped
    Closed,
}

/// Keeps the smoke-mini probes spread across the cluster
pub struct Rescheduler<C: Cluster> {
    /// The rescheduler config
    pub conf: Conf,
    /// The cluster our probes run in
    pub cluster: C,
    /// Whether to only log what we would do
    pub dry_run: bool,
    /// The tasks to run
    pub tasks: TaskQueue,
    /// Tasks requested by cluster watches
    events: Option<UnboundedReceiver<Tasks>>,
}

impl<C: Cluster> Rescheduler<C> {
    /// Create a new rescheduler
    ///
    /// # Arguments
    ///
    /// * `conf` - The rescheduler config
    /// * `cluster` - The cluster our probes run in
    /// * `dry_run` - Whether to only log what we would do
    pub fn new(conf: Conf, cluster: C, dry_run: bool) -> Self {
        Rescheduler {
            conf,
            cluster,
            dry_run,
            tasks: TaskQueue::new(),
            events: None,
        }
    }

    /// Run tasks requested by watches as well as periodic ones
    ///
    /// # Arguments
    ///
    /// * `events` - The tasks requested by cluster watches
    pub fn with_events(mut self, events: UnboundedReceiver<Tasks>) -> Self {
        self.events = Some(events);
        self
    }

    /// Apply deletes and persist changed values unless this is a dry run
    ///
    /// Deletes always land before the values that depend on them are written.
    ///
    /// # Arguments
    ///
    /// * `patches` - The deletes to apply
    /// * `values` - The values to persist if they changed
    async fn commit(
        &mut self,
        patches: &Patches,
        values: Option<&Values>,
    ) -> Result<(), Error> {
        if self.dry_run {
            event!(
                Level::INFO,
                dry_run = true,
                deletes = ?patches.deletes,
                persist = values.is_some()
            );
            return Ok(());
        }
        if !patches.is_empty() {
            self.cluster.flush(patches).await?;
        }
        if let Some(values) = values {
            self.cluster.save_values(values).await?;
        }
        Ok(())
    }

    /// Migrate and populate our values before any decisions are made
    #[instrument(name = "Rescheduler::init", skip_all, err(Debug))]
    pub async fn init(&mut self) -> Result<(), Error> {
        let mut values = self.cluster.load_values().await?;
        let mut changed = false;
        if self.conf.migrations.force_no_storage_class {
            changed |= migrate::force_no_storage_class(&mut values);
        }
        // seed our state from what is already deployed
        let snapshots = self.cluster.snapshots().await?;
        changed |= populate::run(&snapshots.statefulsets, &mut values)?;
        let changed = changed.then_some(&values);
        self.commit(&Patches::default(), changed).await
    }

    /// Make at most one placement decision
    #[instrument(name = "Rescheduler::reschedule", skip_all, err(Debug))]
    pub async fn reschedule(&mut self) -> Result<Outcome, Error> {
        let mut values = self.cluster.load_values().await?;
        let snapshots = self.cluster.snapshots().await?;
        let mut patches = Patches::default();
        // shuffle with one generator for this whole tick
        let mut rng = StdRng::from_rng(&mut rand::rng());
        let outcome = reschedule::run(
            &snapshots,
            &mut values,
            &mut patches,
            &mut rng,
            &self.conf.namespace,
            Utc::now(),
        )?;
        let changed = outcome.changed().then_some(&values);
        self.commit(&patches, changed).await?;
        Ok(outcome)
    }

    /// Delete probe pods stuck on their claims
    #[instrument(name = "Rescheduler::pvc_cleanup", skip_all, err(Debug))]
    pub async fn pvc_cleanup(&mut self) -> Result<usize, Error> {
        let snapshots = self.cluster.snapshots().await?;
        let mut patches = Patches::default();
        let deleted = pvc::run(
            &snapshots.pod_phases,
            &snapshots.pvcs,
            &self.conf.namespace,
            &mut patches,
        );
        self.commit(&patches, None).await?;
        Ok(deleted.len())
    }

    /// Delete a batch of persistent volumes left behind by probe claims
    #[instrument(name = "Rescheduler::collect_volumes", skip_all, err(Debug))]
    pub async fn collect_volumes(&mut self) -> Result<usize, Error> {
        let volumes = self.cluster.volumes().await?;
        let mut patches = Patches::default();
        let queued = collector::run(&volumes, self.conf.collector.batch, &mut patches);
        self.commit(&patches, None).await?;
        Ok(queued)
    }

    /// Run a single task
    ///
    /// # Arguments
    ///
    /// * `task` - The task to run
    pub async fn run_task(&mut self, task: Tasks) -> Result<(), Error> {
        match task {
            Tasks::Reschedule => self.reschedule().await.map(|_| ()),
            Tasks::PvcCleanup => self.pvc_cleanup().await.map(|_| ()),
            Tasks::CollectVolumes => self.collect_volumes().await.map(|_| ()),
        }
    }

    /// Run every task that is due
    async fn handle_tasks(&mut self) {
        for task in self.tasks.due(Utc::now()) {
            let span = span!(Level::INFO, "Handling Task", task = task.as_str());
            // a failed task is retried on its next run
            if let Err(error) = self.run_task(task).instrument(span).await {
                event!(Level::ERROR, task = task.as_str(), error = error.to_string());
            }
            if let Some(delay) = task.delay(&self.conf) {
                self.tasks.add(from_now!(i64::from(delay)), task);
            }
        }
    }

    /// Wait until the next task is due or a watch asks for one
    async fn wait(&mut self) -> Wake {
        let sleep = self
            .tasks
            .next()
            .and_then(|next| (next - Utc::now()).to_std().ok())
            .unwrap_or_default();
        match self.events.as_mut() {
            Some(events) => tokio::select! {
                _ = tokio::time::sleep(sleep) => Wake::Timer,
                task = events.recv() => match task {
                    Some(task) => Wake::Event(task),
                    None => Wake::Closed,
                },
            },
            None => {
                tokio::time::sleep(sleep).await;
                Wake::Timer
            }
        }
    }

    /// Run our tasks forever
    pub async fn start(&mut self) -> Result<(), Error> {
        self.init().await?;
        loop {
            self.handle_tasks().await;
            match self.wait().await {
                Wake::Timer => (),
                Wake::Event(task) => {
                    let debounce = self.conf.tasks.event_debounce;
                    if self.tasks.trigger(task, debounce, Utc::now()) {
                        event!(Level::DEBUG, msg = "Queued task from event", task = task.as_str());
                    }
                }
                Wake::Closed => {
                    event!(Level::WARN, msg = "Watches stopped, falling back to periodic tasks");
                    self.events = None;
                }
            }
        }
    }
}
