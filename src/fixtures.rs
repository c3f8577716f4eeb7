#![allow(dead_code)]

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::cluster::ContainerAttributes;
use crate::coordination::{CoordinationTree, MemoryTree, TreeEvent};
use crate::paths::{self, ModuleDeploymentPath};
use crate::stream::KEY_DEFINITION;
use crate::utils;

/// The namespace used by fixture data.
pub const NS: &str = "rill";

/// Register a container in the tree's registry with the given groups.
pub async fn register_container(tree: &MemoryTree, id: &str, groups: &str) -> Result<()> {
    let mut attrs = ContainerAttributes::new(id).set_host(format!("{}.test", id)).set_ip("127.0.0.1").set_pid(1);
    if !groups.is_empty() {
        attrs = attrs.set_groups(groups);
    }
    tree.create(&paths::container(NS, id)?, &attrs.to_bytes()?, true)
        .await
        .context("error registering fixture container")
}

/// Deregister a container, as its session expiring would.
pub async fn deregister_container(tree: &MemoryTree, id: &str) -> Result<()> {
    tree.delete(&paths::container(NS, id)?, true).await.context("error deregistering fixture container")
}

/// Persist a stream definition and mark the stream deployed.
///
/// Properties are `module.{label}.{count,group,type}` pairs.
pub async fn seed_stream(tree: &MemoryTree, name: &str, definition: &str, properties: &[(&str, &str)]) -> Result<()> {
    let mut map = BTreeMap::new();
    map.insert(KEY_DEFINITION.to_string(), definition.to_string());
    for (key, val) in properties {
        map.insert((*key).to_string(), (*val).to_string());
    }
    tree.create(&paths::stream_definition(NS, name)?, &utils::encode_map(&map)?, true)
        .await
        .context("error seeding fixture stream definition")?;
    tree.create(&paths::stream_deployment(NS, name)?, &[], true)
        .await
        .context("error seeding fixture stream deployment marker")
}

/// Spawn a task standing in for the worker-side collaborator.
///
/// Real containers watch their own deployments directory, start the module,
/// and then write the mirrored per-stream record. This confirmer mirrors
/// every per-container record it observes, immediately.
pub async fn spawn_confirmer(tree: MemoryTree) -> Result<JoinHandle<()>> {
    let mut events = tree.subscribe(&paths::module_deployments_root(NS)).await.context("error subscribing confirmer")?;
    Ok(tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let path = match event {
                TreeEvent::ChildAdded { path, .. } => path,
                TreeEvent::ConnectionLost => return,
                _ => continue,
            };
            // Intermediate directory nodes do not parse as records.
            let record = match ModuleDeploymentPath::parse(NS, &path) {
                Ok(record) => record,
                Err(_) => continue,
            };
            let mirror = crate::paths::StreamDeploymentPath {
                stream: record.stream,
                module_type: record.module_type,
                label: record.label,
                container: record.container,
            };
            let mirror_path = match mirror.build(NS) {
                Ok(path) => path,
                Err(_) => continue,
            };
            if let Err(err) = tree.create(&mirror_path, &[], true).await {
                if !err.is_node_exists() {
                    return;
                }
            }
        }
    }))
}

/// All containers recorded as hosting the given module.
pub async fn module_hosts(tree: &MemoryTree, stream: &str, module_type: crate::stream::ModuleType, label: &str) -> Result<Vec<String>> {
    crate::coordination::children_or_empty(tree, &paths::stream_module_dir(NS, stream, module_type, label)?)
        .await
        .context("error listing module hosts")
}

/// All deployment record names held by the given container.
pub async fn container_records(tree: &MemoryTree, container: &str) -> Result<Vec<String>> {
    crate::coordination::children_or_empty(tree, &paths::container_deployments_dir(NS, container)?)
        .await
        .context("error listing container records")
}
