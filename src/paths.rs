#![allow(dead_code)]

//! Coordination tree path codec.
//!
//! Four path families are written by the orchestrator, all rooted under the
//! configured namespace:
//!
//! - container registry: `/{ns}/containers/{container}`
//! - stream definitions: `/{ns}/streams/{stream}`
//! - stream deployments: `/{ns}/deployments/streams/{stream}/{type}/{label}/{container}`
//! - module deployments: `/{ns}/deployments/modules/{container}/{stream}.{type}.{label}`
//!
//! Encoding and decoding round-trip exactly on well-formed paths. Field
//! values containing a reserved separator (`/` everywhere, additionally `.`
//! within the dotted module-deployment child name) are rejected at encode
//! time rather than escaped.

use crate::error::PathError;
use crate::stream::ModuleType;

/// The top-level segment of the container registry.
pub const CONTAINERS: &str = "containers";
/// The top-level segment of stream definitions.
pub const STREAMS: &str = "streams";
/// The segments under which per-stream deployment records live.
pub const STREAM_DEPLOYMENTS: &str = "deployments/streams";
/// The segments under which per-container deployment records live.
pub const MODULE_DEPLOYMENTS: &str = "deployments/modules";

/// Extract the final segment of a path.
pub fn child_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Check a path field for reserved characters, `/` plus any extras given.
fn check_field(field: &'static str, value: &str, extra: &[char]) -> Result<(), PathError> {
    if value.is_empty() {
        return Err(PathError::malformed(value, format!("field `{}` must not be empty", field)));
    }
    if value.contains('/') {
        return Err(PathError::ReservedCharacter { field, reserved: '/', value: value.into() });
    }
    for &reserved in extra {
        if value.contains(reserved) {
            return Err(PathError::ReservedCharacter { field, reserved, value: value.into() });
        }
    }
    Ok(())
}

/// The root of the container registry.
pub fn containers_root(ns: &str) -> String {
    format!("/{}/{}", ns, CONTAINERS)
}

/// The registration path of the given container.
pub fn container(ns: &str, container: &str) -> Result<String, PathError> {
    check_field("container", container, &[])?;
    Ok(format!("/{}/{}/{}", ns, CONTAINERS, container))
}

/// The root under which deployed streams are enumerated.
pub fn stream_deployments_root(ns: &str) -> String {
    format!("/{}/{}", ns, STREAM_DEPLOYMENTS)
}

/// The root under which per-container deployment records are grouped.
pub fn module_deployments_root(ns: &str) -> String {
    format!("/{}/{}", ns, MODULE_DEPLOYMENTS)
}

/// The definition path of the given stream.
pub fn stream_definition(ns: &str, stream: &str) -> Result<String, PathError> {
    check_field("stream", stream, &[])?;
    Ok(format!("/{}/{}/{}", ns, STREAMS, stream))
}

/// The deployment marker path of the given stream.
pub fn stream_deployment(ns: &str, stream: &str) -> Result<String, PathError> {
    check_field("stream", stream, &[])?;
    Ok(format!("/{}/{}/{}", ns, STREAM_DEPLOYMENTS, stream))
}

/// The directory listing which containers currently host the given module.
pub fn stream_module_dir(ns: &str, stream: &str, module_type: ModuleType, label: &str) -> Result<String, PathError> {
    check_field("stream", stream, &[])?;
    check_field("label", label, &[])?;
    Ok(format!("/{}/{}/{}/{}/{}", ns, STREAM_DEPLOYMENTS, stream, module_type, label))
}

/// The directory holding every deployment record of the given container.
pub fn container_deployments_dir(ns: &str, container: &str) -> Result<String, PathError> {
    check_field("container", container, &[])?;
    Ok(format!("/{}/{}/{}", ns, MODULE_DEPLOYMENTS, container))
}

/// A per-stream deployment record path.
///
/// Existence of this node is the container-side confirmation that the module
/// instance is running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDeploymentPath {
    pub stream: String,
    pub module_type: ModuleType,
    pub label: String,
    pub container: String,
}

impl StreamDeploymentPath {
    /// Encode this record as an absolute tree path.
    pub fn build(&self, ns: &str) -> Result<String, PathError> {
        check_field("stream", &self.stream, &[])?;
        check_field("label", &self.label, &[])?;
        check_field("container", &self.container, &[])?;
        Ok(format!("/{}/{}/{}/{}/{}/{}", ns, STREAM_DEPLOYMENTS, self.stream, self.module_type, self.label, self.container))
    }

    /// Decode an absolute tree path into its record fields.
    pub fn parse(ns: &str, path: &str) -> Result<Self, PathError> {
        let prefix = format!("/{}/{}/", ns, STREAM_DEPLOYMENTS);
        let rest = path
            .strip_prefix(&prefix)
            .ok_or_else(|| PathError::malformed(path, format!("expected prefix `{}`", prefix)))?;
        match rest.split('/').collect::<Vec<_>>().as_slice() {
            [stream, module_type, label, container] => Ok(Self {
                stream: (*stream).into(),
                module_type: module_type.parse().map_err(|()| PathError::malformed(path, format!("unknown module type `{}`", module_type)))?,
                label: (*label).into(),
                container: (*container).into(),
            }),
            parts => Err(PathError::malformed(path, format!("expected 4 segments after prefix, got {}", parts.len()))),
        }
    }
}

/// A per-container deployment record path.
///
/// The child name is dot-delimited so that a single-level children listing of
/// a container's directory yields every record it holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDeploymentPath {
    pub container: String,
    pub stream: String,
    pub module_type: ModuleType,
    pub label: String,
}

impl ModuleDeploymentPath {
    /// Encode this record as an absolute tree path.
    pub fn build(&self, ns: &str) -> Result<String, PathError> {
        check_field("container", &self.container, &[])?;
        check_field("stream", &self.stream, &['.'])?;
        check_field("label", &self.label, &['.'])?;
        Ok(format!("/{}/{}/{}/{}.{}.{}", ns, MODULE_DEPLOYMENTS, self.container, self.stream, self.module_type, self.label))
    }

    /// Decode an absolute tree path into its record fields.
    pub fn parse(ns: &str, path: &str) -> Result<Self, PathError> {
        let prefix = format!("/{}/{}/", ns, MODULE_DEPLOYMENTS);
        let rest = path
            .strip_prefix(&prefix)
            .ok_or_else(|| PathError::malformed(path, format!("expected prefix `{}`", prefix)))?;
        match rest.split('/').collect::<Vec<_>>().as_slice() {
            [container, record] => Self::parse_record(path, container, record),
            parts => Err(PathError::malformed(path, format!("expected 2 segments after prefix, got {}", parts.len()))),
        }
    }

    /// Decode a dot-delimited child name from a container's deployments directory.
    pub fn parse_child(container: &str, child: &str) -> Result<Self, PathError> {
        Self::parse_record(child, container, child)
    }

    /// The same record re-targeted at a different container.
    pub fn for_container(&self, container: &str) -> Self {
        Self { container: container.into(), ..self.clone() }
    }

    fn parse_record(path: &str, container: &str, record: &str) -> Result<Self, PathError> {
        match record.split('.').collect::<Vec<_>>().as_slice() {
            [stream, module_type, label] => Ok(Self {
                container: container.into(),
                stream: (*stream).into(),
                module_type: module_type.parse().map_err(|()| PathError::malformed(path, format!("unknown module type `{}`", module_type)))?,
                label: (*label).into(),
            }),
            parts => Err(PathError::malformed(path, format!("expected 3 dotted fields in record name, got {}", parts.len()))),
        }
    }
}
