//! Stream model.
//!
//! A `Stream` is an immutable snapshot built from the bytes persisted at the
//! stream's definition node. Snapshots are rebuilt from a fresh read whenever
//! needed and never cached across membership events.
//!
//! The persisted form is a string map carrying a `definition` key with a
//! pipe-delimited module list, where each element is `module` or
//! `label: module`, plus optional per-module deployment properties:
//!
//! - `module.{label}.count`: target instance count, `0` meaning every
//!   eligible container. Defaults to `1`.
//! - `module.{label}.group`: container group constraint. Defaults to empty,
//!   meaning unconstrained.
//! - `module.{label}.type`: explicit module type override. Types otherwise
//!   derive from position: first module is a source, last is a sink,
//!   everything between is a processor.


use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::error::ModelError;
use crate::utils;

/// The definition key within a stream's persisted map.
pub const KEY_DEFINITION: &str = "definition";

/// The type of a stream-processing module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleType {
    Source,
    Processor,
    Sink,
    Job,
}

impl ModuleType {
    /// The rank of this type within a stream's deployment order.
    ///
    /// Sources deploy before processors, processors before sinks. Jobs are
    /// single-assignment units and share the processor rank.
    fn deployment_rank(&self) -> u8 {
        match self {
            ModuleType::Source => 0,
            ModuleType::Processor | ModuleType::Job => 1,
            ModuleType::Sink => 2,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleType::Source => write!(f, "source"),
            ModuleType::Processor => write!(f, "processor"),
            ModuleType::Sink => write!(f, "sink"),
            ModuleType::Job => write!(f, "job"),
        }
    }
}

impl FromStr for ModuleType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(ModuleType::Source),
            "processor" => Ok(ModuleType::Processor),
            "sink" => Ok(ModuleType::Sink),
            "job" => Ok(ModuleType::Job),
            _ => Err(()),
        }
    }
}

/// A module of a stream together with its placement policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// The name of the owning stream.
    pub stream: String,
    /// The module name.
    pub name: String,
    /// The per-stream-unique label of this module instance.
    pub label: String,
    /// The module type.
    pub module_type: ModuleType,
    /// Target instance count. `0` means "deploy to every eligible container".
    pub count: u32,
    /// Container group constraint. Empty means unconstrained.
    pub group: String,
}

impl ModuleDescriptor {
    /// Check if this module carries a group constraint.
    pub fn has_group(&self) -> bool {
        !self.group.is_empty()
    }
}

/// An immutable snapshot of a stream's module graph.
#[derive(Clone, Debug)]
pub struct Stream {
    /// The stream's unique name.
    pub name: String,
    /// The stream's modules, held in deployment order.
    modules: Vec<ModuleDescriptor>,
}

impl Stream {
    /// Build a stream snapshot from the bytes persisted at its definition node.
    ///
    /// Deterministic and side-effect-free: the same name and bytes always
    /// produce the same snapshot.
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self> {
        let map = utils::decode_map(data).with_context(|| format!("error decoding definition of stream `{}`", name))?;
        let definition = map
            .get(KEY_DEFINITION)
            .ok_or_else(|| invalid(name, format!("missing `{}` key", KEY_DEFINITION)))?;

        let elements: Vec<&str> = definition.split('|').map(str::trim).collect();
        let mut modules = Vec::with_capacity(elements.len());
        for (idx, element) in elements.iter().enumerate() {
            let (label, module_name) = match element.split_once(':') {
                Some((label, module_name)) => (label.trim(), module_name.trim()),
                None => (*element, *element),
            };
            if module_name.is_empty() || label.is_empty() {
                return Err(invalid(name, format!("empty module element at position {}", idx)).into());
            }
            if modules.iter().any(|module: &ModuleDescriptor| module.label == label) {
                return Err(invalid(name, format!("duplicate module label `{}`", label)).into());
            }

            let positional = if idx == 0 {
                ModuleType::Source
            } else if idx == elements.len() - 1 {
                ModuleType::Sink
            } else {
                ModuleType::Processor
            };
            let module_type = match map.get(&module_property(label, "type")) {
                Some(val) => val
                    .parse()
                    .map_err(|()| invalid(name, format!("unknown module type `{}` for `{}`", val, label)))?,
                None => positional,
            };
            let count = match map.get(&module_property(label, "count")) {
                Some(val) => val
                    .parse()
                    .map_err(|_| invalid(name, format!("invalid count `{}` for module `{}`", val, label)))?,
                None => 1,
            };
            let group = map.get(&module_property(label, "group")).cloned().unwrap_or_default();

            modules.push(ModuleDescriptor {
                stream: name.into(),
                name: module_name.into(),
                label: label.into(),
                module_type,
                count,
                group,
            });
        }
        if modules.is_empty() {
            return Err(invalid(name, "definition contains no modules").into());
        }

        // Definition order already runs source to sink; a stable sort keeps
        // that order within each rank while honoring explicit type overrides.
        modules.sort_by_key(|module| module.module_type.deployment_rank());
        Ok(Self { name: name.into(), modules })
    }

    /// The stream's modules in deployment order.
    ///
    /// The returned iterator is finite and restartable.
    pub fn deployment_order(&self) -> impl Iterator<Item = &ModuleDescriptor> + '_ {
        self.modules.iter()
    }

    /// Look up a module by its label and type.
    pub fn find_module(&self, label: &str, module_type: ModuleType) -> Result<&ModuleDescriptor, ModelError> {
        self.modules
            .iter()
            .find(|module| module.label == label && module.module_type == module_type)
            .ok_or_else(|| ModelError::NoSuchModule {
                stream: self.name.clone(),
                label: label.into(),
                module_type: module_type.to_string(),
            })
    }
}

/// Build the map key of a per-module deployment property.
pub fn module_property(label: &str, property: &str) -> String {
    format!("module.{}.{}", label, property)
}

fn invalid(stream: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidDefinition { stream: stream.into(), reason: reason.into() }
}
