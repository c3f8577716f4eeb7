use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::StreamExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, SignalStream};
use tokio_stream::StreamMap;

use crate::config::Config;
use crate::coordination::MemoryTree;
use crate::watchers::ContainerWatcher;

/// The application object for when Rill is running as the orchestrator.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The embedded coordination tree backend.
    tree: Arc<MemoryTree>,
    /// The join handle of the container membership watcher.
    containers_handle: JoinHandle<Result<()>>,
}

impl App {
    /// Create a new instance.
    ///
    /// Standalone mode: membership and placement state live in the embedded
    /// in-memory tree. Clustered deployments swap in a store-backed
    /// `CoordinationTree` here.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        // App shutdown channel.
        let (shutdown_tx, shutdown_rx) = broadcast::channel(10);

        let tree = Arc::new(MemoryTree::new());
        let containers_handle = ContainerWatcher::new(config.clone(), tree.clone(), shutdown_tx.clone()).spawn();

        Ok(Self {
            _config: config,
            shutdown_rx: BroadcastStream::new(shutdown_rx),
            shutdown_tx,
            tree,
            containers_handle,
        })
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        let mut signals = StreamMap::new();
        signals.insert("sigterm", SignalStream::new(signal(SignalKind::terminate()).context("error building signal stream")?));
        signals.insert("sigint", SignalStream::new(signal(SignalKind::interrupt()).context("error building signal stream")?));

        loop {
            tokio::select! {
                Some((_, sig)) = signals.next() => {
                    tracing::debug!(signal = ?sig, "signal received, beginning graceful shutdown");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = self.shutdown_rx.next() => break,
            }
        }

        // Begin shutdown routine.
        tracing::debug!("Rill orchestrator is shutting down");
        if let Err(err) = self.containers_handle.await.context("error joining container watcher handle").and_then(|res| res) {
            tracing::error!(error = ?err, "error shutting down container watcher");
        }
        self.tree.stop();

        tracing::debug!("Rill orchestrator shutdown complete");
        Ok(())
    }
}
