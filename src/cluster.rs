#![allow(dead_code)]

//! Container registry model.
//!
//! A container is a worker process holding a registration node in the
//! coordination tree. The node's payload is a string map of attributes; the
//! in-memory types here are snapshots decoded from tree reads and are never
//! the authoritative copy.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};

use crate::coordination::{self, CoordinationTree};
use crate::paths;
use crate::utils;

/// The attribute key of a container's unique id.
pub const ATTR_ID: &str = "id";
/// The attribute key of a container's hostname.
pub const ATTR_HOST: &str = "host";
/// The attribute key of a container's process id.
pub const ATTR_PID: &str = "pid";
/// The attribute key of a container's IP address.
pub const ATTR_IP: &str = "ip";
/// The attribute key of a container's comma-delimited group list.
pub const ATTR_GROUPS: &str = "groups";

const COMMON_ATTRS: [&str; 5] = [ATTR_ID, ATTR_HOST, ATTR_PID, ATTR_IP, ATTR_GROUPS];

/// The attribute map a container publishes at its registration node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerAttributes(BTreeMap<String, String>);

impl ContainerAttributes {
    /// Create a new attribute set for the given container id.
    pub fn new(id: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(ATTR_ID.into(), id.into());
        Self(map)
    }

    /// Create a new attribute set with a generated id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Decode attributes from a registration node payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        utils::decode_map(data).map(Self).context("error decoding container attributes")
    }

    /// Encode attributes into a registration node payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        utils::encode_map(&self.0)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get(ATTR_ID).map(String::as_str)
    }

    pub fn host(&self) -> Option<&str> {
        self.0.get(ATTR_HOST).map(String::as_str)
    }

    pub fn ip(&self) -> Option<&str> {
        self.0.get(ATTR_IP).map(String::as_str)
    }

    pub fn pid(&self) -> Option<u32> {
        self.0.get(ATTR_PID).and_then(|pid| pid.parse().ok())
    }

    /// The container's group set, parsed from its comma-delimited form.
    ///
    /// An absent or empty attribute yields an empty set; entries are
    /// deduplicated and order carries no meaning.
    pub fn groups(&self) -> BTreeSet<String> {
        self.0.get(ATTR_GROUPS).map(|groups| utils::comma_delimited_set(groups)).unwrap_or_default()
    }

    /// Any attributes beyond the common set, passed through untouched.
    pub fn custom_attributes(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|(key, _)| !COMMON_ATTRS.contains(&key.as_str()))
            .map(|(key, val)| (key.clone(), val.clone()))
            .collect()
    }

    pub fn set_host(mut self, host: impl Into<String>) -> Self {
        self.0.insert(ATTR_HOST.into(), host.into());
        self
    }

    pub fn set_ip(mut self, ip: impl Into<String>) -> Self {
        self.0.insert(ATTR_IP.into(), ip.into());
        self
    }

    pub fn set_pid(mut self, pid: u32) -> Self {
        self.0.insert(ATTR_PID.into(), pid.to_string());
        self
    }

    pub fn set_groups(mut self, groups: impl Into<String>) -> Self {
        self.0.insert(ATTR_GROUPS.into(), groups.into());
        self
    }
}

/// A snapshot of a registered container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    /// The container's unique id, taken from its registration path.
    pub id: String,
    /// The attributes published at the registration node.
    pub attributes: ContainerAttributes,
}

impl Container {
    pub fn new(id: impl Into<String>, attributes: ContainerAttributes) -> Self {
        Self { id: id.into(), attributes }
    }

    /// The container's group set.
    pub fn groups(&self) -> BTreeSet<String> {
        self.attributes.groups()
    }
}

/// Read the current fleet membership from the container registry.
///
/// An absent registry path means an empty fleet. A child which disappears
/// between the listing and its data read is skipped; that is just a
/// departure the orchestrator has not been told about yet.
pub async fn all_containers(tree: &dyn CoordinationTree, ns: &str) -> Result<Vec<Container>> {
    let root = paths::containers_root(ns);
    let children = coordination::children_or_empty(tree, &root).await.context("error listing container registry")?;
    let mut containers = Vec::with_capacity(children.len());
    for id in children {
        let path = paths::container(ns, &id)?;
        match tree.get_data(&path).await {
            Ok(data) => containers.push(Container::new(id, ContainerAttributes::from_bytes(&data)?)),
            Err(err) if err.is_no_node() => continue,
            Err(err) => return Err(err).context("error reading container attributes"),
        }
    }
    Ok(containers)
}
