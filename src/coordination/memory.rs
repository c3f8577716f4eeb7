//! In-memory coordination tree backend.
//!
//! Backs standalone mode and the test suite. Nodes live in a sorted map
//! keyed by absolute path, which makes child listings a bounded range scan.
//! Subscriptions are fanned out synchronously with each mutation, so a
//! single client observes its own writes in order; cross-prefix ordering is
//! deliberately unspecified, matching the trait contract.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::coordination::{CoordinationTree, TreeEvent};
use crate::error::TreeError;

/// An in-memory implementation of the coordination tree.
#[derive(Clone, Default)]
pub struct MemoryTree {
    inner: Arc<MemoryTreeInner>,
}

#[derive(Default)]
struct MemoryTreeInner {
    state: Mutex<State>,
    stopped: AtomicBool,
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Vec<u8>>,
    subscriptions: Vec<Subscription>,
}

struct Subscription {
    prefix: String,
    tx: mpsc::UnboundedSender<TreeEvent>,
}

impl MemoryTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop this client, as a lost session with a real store would.
    ///
    /// All subscribers observe `ConnectionLost`; subsequent operations fail.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        let mut state = self.inner.state.lock().expect("coordination tree lock poisoned");
        notify(&mut state, |_| Some(TreeEvent::ConnectionLost));
    }

    fn guard_stopped(&self) -> Result<(), TreeError> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(TreeError::ConnectionLost);
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationTree for MemoryTree {
    async fn create(&self, path: &str, data: &[u8], create_parents: bool) -> Result<(), TreeError> {
        self.guard_stopped()?;
        let path = normalize(path)?;
        let mut state = self.inner.state.lock().expect("coordination tree lock poisoned");
        if state.nodes.contains_key(&path) {
            return Err(TreeError::NodeExists(path));
        }

        let mut created = Vec::new();
        for ancestor in ancestors(&path) {
            if state.nodes.contains_key(&ancestor) {
                continue;
            }
            if !create_parents {
                return Err(TreeError::NoNode(ancestor));
            }
            created.push((ancestor, Vec::new()));
        }
        created.push((path, data.to_vec()));

        for (node, data) in created {
            state.nodes.insert(node.clone(), data.clone());
            notify(&mut state, |prefix| {
                is_descendant(prefix, &node).then(|| TreeEvent::ChildAdded { path: node.clone(), data: data.clone() })
            });
        }
        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<(), TreeError> {
        self.guard_stopped()?;
        let path = normalize(path)?;
        let mut state = self.inner.state.lock().expect("coordination tree lock poisoned");
        if !state.nodes.contains_key(&path) {
            return Err(TreeError::NoNode(path));
        }

        let subtree_prefix = format!("{}/", path);
        let descendants: Vec<String> = state
            .nodes
            .range(subtree_prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&subtree_prefix))
            .map(|(key, _)| key.clone())
            .collect();
        if !descendants.is_empty() && !recursive {
            return Err(TreeError::Store(format!("node at `{}` has children and delete is not recursive", path)));
        }

        // Prune leaf-first so subscribers never observe an orphaned child.
        for node in descendants.into_iter().rev().chain(std::iter::once(path)) {
            let data = state.nodes.remove(&node).unwrap_or_default();
            notify(&mut state, |prefix| {
                is_descendant(prefix, &node).then(|| TreeEvent::ChildRemoved { path: node.clone(), data: data.clone() })
            });
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, TreeError> {
        self.guard_stopped()?;
        let path = normalize(path)?;
        let state = self.inner.state.lock().expect("coordination tree lock poisoned");
        Ok(state.nodes.contains_key(&path))
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>, TreeError> {
        self.guard_stopped()?;
        let path = normalize(path)?;
        let state = self.inner.state.lock().expect("coordination tree lock poisoned");
        if !state.nodes.contains_key(&path) {
            return Err(TreeError::NoNode(path));
        }
        let prefix = format!("{}/", path);
        Ok(state
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, _)| {
                let rest = &key[prefix.len()..];
                if rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect())
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>, TreeError> {
        self.guard_stopped()?;
        let path = normalize(path)?;
        let state = self.inner.state.lock().expect("coordination tree lock poisoned");
        state.nodes.get(&path).cloned().ok_or(TreeError::NoNode(path))
    }

    async fn subscribe(&self, prefix: &str) -> Result<mpsc::UnboundedReceiver<TreeEvent>, TreeError> {
        self.guard_stopped()?;
        let prefix = normalize(prefix)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TreeEvent::Initialized);
        let mut state = self.inner.state.lock().expect("coordination tree lock poisoned");
        state.subscriptions.push(Subscription { prefix, tx });
        Ok(rx)
    }

    fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}

/// Fan an event out to matching subscribers, pruning closed channels.
fn notify<F>(state: &mut State, event_for: F)
where
    F: Fn(&str) -> Option<TreeEvent>,
{
    state.subscriptions.retain(|sub| match event_for(&sub.prefix) {
        Some(event) => sub.tx.send(event).is_ok(),
        None => !sub.tx.is_closed(),
    });
}

/// Check whether `path` lies strictly below `prefix`.
fn is_descendant(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len() && path.starts_with(prefix) && path.as_bytes()[prefix.len()] == b'/'
}

/// Validate and normalize an absolute path.
fn normalize(path: &str) -> Result<String, TreeError> {
    if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') || path.contains("//") {
        return Err(TreeError::Store(format!("invalid absolute path: `{}`", path)));
    }
    Ok(path.to_string())
}

/// Yield every proper ancestor of the given path, shortest first.
fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut idx = 1;
    while let Some(offset) = path[idx..].find('/') {
        idx += offset;
        out.push(path[..idx].to_string());
        idx += 1;
    }
    out
}
