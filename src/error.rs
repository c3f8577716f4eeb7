//! Rill error abstractions.

/// Errors surfaced by a coordination tree backend.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The target path does not exist.
    ///
    /// Callers enumerating children or reading data defensively must treat
    /// this as an empty collection, never as a fatal condition.
    #[error("no node at path: {0}")]
    NoNode(String),
    /// The target leaf already exists.
    #[error("node already exists at path: {0}")]
    NodeExists(String),
    /// The session with the coordination store has been lost.
    #[error("coordination store connection lost")]
    ConnectionLost,
    /// Any other store-side failure. Generally fatal to the current event's processing.
    #[error("coordination store error: {0}")]
    Store(String),
}

impl TreeError {
    /// Check if this error is a `NoNode` error.
    pub fn is_no_node(&self) -> bool {
        matches!(self, TreeError::NoNode(_))
    }

    /// Check if this error is a `NodeExists` error.
    pub fn is_node_exists(&self) -> bool {
        matches!(self, TreeError::NodeExists(_))
    }
}

/// Errors from encoding or decoding coordination tree paths.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The given path does not belong to the expected path family.
    #[error("malformed path `{path}`: {reason}")]
    Malformed { path: String, reason: String },
    /// A path field contains a reserved separator character.
    #[error("path field `{field}` contains reserved character `{reserved}`: {value}")]
    ReservedCharacter { field: &'static str, reserved: char, value: String },
}

impl PathError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed { path: path.into(), reason: reason.into() }
    }
}

/// Errors from building or querying a stream model.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The stream definition does not contain the referenced module.
    #[error("stream `{stream}` has no module with label `{label}` of type `{module_type}`")]
    NoSuchModule { stream: String, label: String, module_type: String },
    /// The persisted stream definition could not be interpreted.
    #[error("invalid definition for stream `{stream}`: {reason}")]
    InvalidDefinition { stream: String, reason: String },
}

/// The error type used to indicate that a module deployment was written but
/// never confirmed by the target container within the configured bound.
///
/// This is fatal to the arrival scan which produced it, and the unconfirmed
/// per-container record is deliberately left in place.
#[derive(Debug, thiserror::Error)]
#[error("deployment of module {module} to container {container} timed out")]
pub struct DeploymentTimeout {
    pub module: String,
    pub container: String,
}
