#![allow(dead_code)]

//! Coordination tree client.
//!
//! The tree is the single source of truth for fleet membership and module
//! placement. This module defines the capability surface the orchestrator
//! consumes; backends implement it over a real coordination service, and the
//! in-memory backend here backs standalone mode and the test suite.

mod memory;

pub use memory::MemoryTree;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TreeError;

/// An event observed on a subscribed path prefix.
///
/// Delivery is at-least-once, and events on distinct prefixes carry no
/// relative ordering guarantee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEvent {
    /// The subscription is established and will begin yielding changes.
    Initialized,
    /// A node was created under the subscribed prefix.
    ChildAdded { path: String, data: Vec<u8> },
    /// A node was deleted under the subscribed prefix.
    ChildRemoved { path: String, data: Vec<u8> },
    /// A node's data was replaced under the subscribed prefix.
    ChildUpdated { path: String, data: Vec<u8> },
    /// The session to the store is degraded; it may yet recover.
    ConnectionSuspended,
    /// A suspended session has recovered.
    ConnectionReconnected,
    /// The session to the store is gone and will not recover.
    ConnectionLost,
}

/// A capability handle to a hierarchical coordination store.
///
/// Persistent vs ephemeral node lifecycle is owned by the backend and its
/// sessions; consumers of this trait only observe the resulting transitions.
#[async_trait]
pub trait CoordinationTree: Send + Sync + 'static {
    /// Create a node at the given path holding the given data.
    ///
    /// Fails with `TreeError::NodeExists` if the leaf already exists. With
    /// `create_parents`, missing ancestor nodes are created empty; without
    /// it, a missing parent fails with `TreeError::NoNode`.
    async fn create(&self, path: &str, data: &[u8], create_parents: bool) -> Result<(), TreeError>;

    /// Delete the node at the given path, including its subtree when `recursive`.
    async fn delete(&self, path: &str, recursive: bool) -> Result<(), TreeError>;

    /// Check whether a node exists at the given path.
    async fn exists(&self, path: &str) -> Result<bool, TreeError>;

    /// List the names of the direct children of the given path.
    ///
    /// Fails with `TreeError::NoNode` when the path itself is absent.
    async fn get_children(&self, path: &str) -> Result<Vec<String>, TreeError>;

    /// Read the data held at the given path.
    async fn get_data(&self, path: &str) -> Result<Vec<u8>, TreeError>;

    /// Subscribe to change events for all descendants of the given prefix.
    async fn subscribe(&self, prefix: &str) -> Result<mpsc::UnboundedReceiver<TreeEvent>, TreeError>;

    /// Check whether this client has been stopped.
    ///
    /// A stopped client must not be used for cleanup; the store's own
    /// liveness already reflects anything this process would have done.
    fn is_stopped(&self) -> bool;
}

/// List the children of a path, treating an absent path as an empty listing.
pub async fn children_or_empty(tree: &dyn CoordinationTree, path: &str) -> Result<Vec<String>, TreeError> {
    match tree.get_children(path).await {
        Ok(children) => Ok(children),
        Err(err) if err.is_no_node() => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}
