//! Container membership watcher.
//!
//! The core of the orchestrator: a single-purpose loop consuming membership
//! events from the container registry and reconciling module placement with
//! each stream's declared policy.
//!
//! On arrival, every deployed stream is scanned in module deployment order
//! and any module the new container should host is written as a
//! per-container deployment record, followed by a bounded poll for the
//! container-side confirmation record. On departure, the departed
//! container's records are redeployed to replacements chosen by the
//! container matcher and its record subtree is then pruned.
//!
//! There is no mutual exclusion across concurrently delivered membership
//! events: the count gate here is read-then-write against the tree, so
//! brief over- or under-provisioning during membership churn is tolerated
//! and corrected by later events rather than treated as corruption.


use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::StreamExt;
use rand::seq::SliceRandom;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};

use crate::cluster::{self, Container, ContainerAttributes};
use crate::config::Config;
use crate::coordination::{children_or_empty, CoordinationTree, TreeEvent};
use crate::error::DeploymentTimeout;
use crate::matcher;
use crate::paths::{self, ModuleDeploymentPath, StreamDeploymentPath};
use crate::stream::{ModuleDescriptor, ModuleType, Stream};

/// The outcome of waiting on a deployment's confirmation record.
enum Confirmation {
    /// The container-side record appeared within the bound.
    Confirmed,
    /// Shutdown was signalled mid-wait; the caller should exit quietly.
    Cancelled,
}

/// A watcher of container membership events.
pub struct ContainerWatcher {
    /// The application's runtime config.
    config: Arc<Config>,
    /// The coordination tree client.
    tree: Arc<dyn CoordinationTree>,

    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,
    /// A shutdown receiver held from construction and consumed by the
    /// confirmation poll, so a signal sent at any point before or during a
    /// poll is observed rather than falling in a subscribe gap.
    confirm_shutdown_rx: broadcast::Receiver<()>,
}

impl ContainerWatcher {
    /// Create a new instance.
    pub fn new(config: Arc<Config>, tree: Arc<dyn CoordinationTree>, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            config,
            tree,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            confirm_shutdown_rx: shutdown_tx.subscribe(),
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        let registry = paths::containers_root(&self.config.namespace);
        let events = self.tree.subscribe(&registry).await.context("error subscribing to container registry")?;
        let mut events = UnboundedReceiverStream::new(events);

        tracing::info!(%registry, "container watcher initialized");
        loop {
            tokio::select! {
                Some(event) = events.next() => self.handle_event(event).await,
                _ = self.shutdown_rx.next() => break,
            }
        }

        Ok(())
    }

    /// Handle membership events coming from the coordination tree.
    ///
    /// Event delivery is at-least-once and weakly ordered; both handlers are
    /// written to be safe under duplicate delivery.
    #[tracing::instrument(level = "debug", skip(self, event))]
    async fn handle_event(&mut self, event: TreeEvent) {
        match event {
            TreeEvent::ChildAdded { path, data } => {
                if let Err(err) = self.handle_container_arrived(&path, &data).await {
                    tracing::error!(error = ?err, %path, "error handling container arrival");
                }
            }
            TreeEvent::ChildRemoved { path, .. } => {
                if let Err(err) = self.handle_container_departed(&path).await {
                    tracing::error!(error = ?err, %path, "error handling container departure");
                }
            }
            TreeEvent::ChildUpdated { path, .. } => {
                tracing::info!(container = paths::child_name(&path), "container updated");
            }
            // Connection transitions drive no deployment logic. A degraded or
            // lost session only suppresses work, which the stopped-client
            // check in the departure handler already covers.
            TreeEvent::ConnectionSuspended => tracing::warn!("coordination store connection suspended"),
            TreeEvent::ConnectionReconnected => tracing::info!("coordination store connection reconnected"),
            TreeEvent::ConnectionLost => tracing::error!("coordination store connection lost"),
            TreeEvent::Initialized => tracing::debug!("container registry subscription initialized"),
        }
    }

    /// Handle the arrival of a container.
    ///
    /// Scans the existing streams and deploys to the new container every
    /// module which is under its target count, or which targets all eligible
    /// containers, provided any group constraint matches. Each deployment is
    /// confirmed before the scan proceeds; a confirmation timeout aborts the
    /// remainder of the scan and leaves the unconfirmed record in place.
    pub(crate) async fn handle_container_arrived(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let container = Container::new(paths::child_name(path), ContainerAttributes::from_bytes(data)?);
        let groups = container.groups();
        tracing::info!(container = %container.id, "container arrived");

        let ns = self.config.namespace.clone();
        let deployed_streams = children_or_empty(&*self.tree, &paths::stream_deployments_root(&ns))
            .await
            .context("error listing deployed streams")?;
        for stream_name in deployed_streams {
            let definition = match self.tree.get_data(&paths::stream_definition(&ns, &stream_name)?).await {
                Ok(data) => data,
                Err(err) if err.is_no_node() => {
                    tracing::warn!(stream = %stream_name, "stream is marked deployed but its definition is gone, skipping");
                    continue;
                }
                Err(err) => return Err(err).context("error reading stream definition"),
            };
            let stream = Stream::from_bytes(&stream_name, &definition)?;

            for descriptor in stream.deployment_order() {
                if descriptor.has_group() && !groups.contains(&descriptor.group) {
                    continue;
                }
                let hosts = self.containers_for_module(descriptor).await?;
                if hosts.iter().any(|host| host == &container.id) {
                    // Already hosted here; duplicate event deliveries land on this gate.
                    continue;
                }
                if descriptor.count == 0 || hosts.len() < descriptor.count as usize {
                    tracing::info!(
                        module = %descriptor.name,
                        label = %descriptor.label,
                        stream = %stream_name,
                        container = %container.id,
                        "deploying module",
                    );
                    self.deploy_module(descriptor, &container.id).await?;
                    match self.await_confirmation(descriptor, &container.id).await? {
                        Confirmation::Confirmed => (),
                        Confirmation::Cancelled => return Ok(()),
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle the departure of a container.
    ///
    /// Scans the deployment records of the departed container, redeploying
    /// each to a replacement where policy calls for it, then prunes the
    /// departed container's record subtree. A record referencing a module
    /// its stream no longer defines is skipped; any other failure aborts the
    /// remaining records of this departure.
    pub(crate) async fn handle_container_departed(&mut self, path: &str) -> Result<()> {
        let container = paths::child_name(path).to_string();
        tracing::info!(%container, "container departed");
        if self.tree.is_stopped() {
            // Nothing to clean up against a store this client can no longer
            // trust; the store's liveness already reflects the absence.
            return Ok(());
        }

        let ns = self.config.namespace.clone();
        let deployments_dir = paths::container_deployments_dir(&ns, &container)?;
        let records = children_or_empty(&*self.tree, &deployments_dir)
            .await
            .context("error listing deployment records of departed container")?;
        if records.is_empty() {
            return Ok(());
        }

        // Stream snapshots are cached only for the duration of this event.
        let mut streams: HashMap<String, Stream> = HashMap::new();
        for child in records {
            let record = ModuleDeploymentPath::parse_child(&container, &child)?;
            if record.module_type == ModuleType::Job {
                self.redeploy_job(&record).await?;
            } else {
                self.redeploy_stream_module(&record, &mut streams).await?;
            }
        }

        match self.tree.delete(&deployments_dir, true).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_no_node() => Ok(()),
            Err(err) => Err(err).context("error pruning deployment records of departed container"),
        }
    }

    /// Redeploy a job-style record to one arbitrary live container.
    ///
    /// Jobs are single-assignment units with no replica policy, so the pick
    /// is uniform over current membership. No retry is scheduled when the
    /// fleet is empty.
    async fn redeploy_job(&self, record: &ModuleDeploymentPath) -> Result<()> {
        let membership = cluster::all_containers(&*self.tree, &self.config.namespace).await?;
        let chosen = membership.choose(&mut rand::thread_rng());
        match chosen {
            Some(target) => {
                tracing::info!(job = %record.stream, container = %target.id, "redeploying job");
                self.create_record(&record.for_container(&target.id).build(&self.config.namespace)?).await
            }
            None => {
                tracing::warn!(job = %record.stream, "no containers available for redeployment of job");
                Ok(())
            }
        }
    }

    /// Redeploy a replicated stream-module record to a matched container.
    async fn redeploy_stream_module(&self, record: &ModuleDeploymentPath, streams: &mut HashMap<String, Stream>) -> Result<()> {
        let ns = &self.config.namespace;
        let stream: &Stream = match streams.entry(record.stream.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let data = self
                    .tree
                    .get_data(&paths::stream_definition(ns, &record.stream)?)
                    .await
                    .context("error reading stream definition")?;
                entry.insert(Stream::from_bytes(&record.stream, &data)?)
            }
        };
        let descriptor = match stream.find_module(&record.label, record.module_type) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                // A stale record; its module left the definition since it was written.
                tracing::warn!(error = %err, "skipping redeployment of stale record");
                return Ok(());
            }
        };
        if descriptor.count == 0 {
            if descriptor.has_group() {
                tracing::info!(
                    label = %descriptor.label,
                    stream = %stream.name,
                    group = %descriptor.group,
                    "module is targeted to all containers of its group; no redeployment needed",
                );
            } else {
                tracing::info!(label = %descriptor.label, stream = %stream.name, "module is targeted to all containers; no redeployment needed");
            }
            return Ok(());
        }

        let membership = cluster::all_containers(&*self.tree, ns).await?;
        match matcher::matching_containers(descriptor, &membership).first() {
            Some(target) => {
                tracing::info!(label = %descriptor.label, stream = %stream.name, container = %target.id, "redeploying module");
                self.create_record(&record.for_container(&target.id).build(ns)?).await
            }
            None => {
                tracing::warn!(label = %descriptor.label, stream = %stream.name, "no containers available for redeployment");
                Ok(())
            }
        }
    }

    /// List which containers currently host the given module.
    async fn containers_for_module(&self, descriptor: &ModuleDescriptor) -> Result<Vec<String>> {
        let dir = paths::stream_module_dir(&self.config.namespace, &descriptor.stream, descriptor.module_type, &descriptor.label)?;
        children_or_empty(&*self.tree, &dir).await.context("error listing containers hosting module")
    }

    /// Write the per-container deployment record which triggers the target
    /// container to start running the module.
    async fn deploy_module(&self, descriptor: &ModuleDescriptor, container: &str) -> Result<()> {
        let path = ModuleDeploymentPath {
            container: container.into(),
            stream: descriptor.stream.clone(),
            module_type: descriptor.module_type,
            label: descriptor.label.clone(),
        }
        .build(&self.config.namespace)?;
        self.create_record(&path).await
    }

    /// Create a deployment record, treating an already-present leaf as success.
    async fn create_record(&self, path: &str) -> Result<()> {
        match self.tree.create(path, &[], true).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_node_exists() => {
                tracing::debug!(%path, "deployment record already exists");
                Ok(())
            }
            Err(err) => Err(err).context("error creating deployment record"),
        }
    }

    /// Poll for the container-side confirmation of a deployment.
    ///
    /// The per-stream record is written by the target container once the
    /// module is running. The poll interval and overall bound come from
    /// config; shutdown mid-wait is a quiet early exit, not a failure.
    async fn await_confirmation(&mut self, descriptor: &ModuleDescriptor, container: &str) -> Result<Confirmation> {
        let path = StreamDeploymentPath {
            stream: descriptor.stream.clone(),
            module_type: descriptor.module_type,
            label: descriptor.label.clone(),
            container: container.into(),
        }
        .build(&self.config.namespace)?;

        let deadline = Instant::now() + self.config.deploy_confirm_timeout();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.deploy_confirm_interval()) => (),
                _ = self.confirm_shutdown_rx.recv() => return Ok(Confirmation::Cancelled),
            }
            if self.tree.exists(&path).await.context("error polling for deployment confirmation")? {
                return Ok(Confirmation::Confirmed);
            }
            if Instant::now() >= deadline {
                return Err(DeploymentTimeout { module: descriptor.name.clone(), container: container.into() }.into());
            }
        }
    }
}
