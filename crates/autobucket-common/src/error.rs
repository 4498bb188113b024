//! Error types for Bucket reconciliation
//!
//! Every variant carries the resource kind and name it concerns so that
//! failures logged by the error policy can be traced back to one object.
//! NotFound is never an error here: store reads return `Ok(None)` instead.

use thiserror::Error;

/// Errors surfaced by a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading a resource from the API server failed
    #[error("failed to get {kind} {name}: {source}")]
    StoreRead {
        /// Resource kind (e.g. "Deployment", "Bucket")
        kind: String,
        /// Namespaced name ("namespace/name")
        name: String,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// Writing a resource to the API server failed
    #[error("failed to {operation} {kind} {name}: {source}")]
    StoreWrite {
        /// Resource kind
        kind: String,
        /// Namespaced name ("namespace/name")
        name: String,
        /// Write operation ("create", "update")
        operation: String,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// A write lost a race: the object already exists or was modified concurrently
    #[error("conflict on {operation} {kind} {name}")]
    Conflict {
        /// Resource kind
        kind: String,
        /// Namespaced name ("namespace/name")
        name: String,
        /// Write operation ("create", "update")
        operation: String,
    },

    /// The desired resource could not be built from its source object
    #[error("cannot build {name}: {message}")]
    SchemaBuild {
        /// Namespaced name ("namespace/name") of the resource being built
        name: String,
        /// Description of what's missing or invalid
        message: String,
    },
}

impl ReconcileError {
    /// Create a read error for the given kind and name
    pub fn read(kind: impl Into<String>, name: impl Into<String>, source: kube::Error) -> Self {
        Self::StoreRead {
            kind: kind.into(),
            name: name.into(),
            source,
        }
    }

    /// Classify a failed write: HTTP 409 becomes `Conflict`, anything else `StoreWrite`
    pub fn write(
        kind: impl Into<String>,
        name: impl Into<String>,
        operation: impl Into<String>,
        source: kube::Error,
    ) -> Self {
        match source {
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict {
                kind: kind.into(),
                name: name.into(),
                operation: operation.into(),
            },
            source => Self::StoreWrite {
                kind: kind.into(),
                name: name.into(),
                operation: operation.into(),
                source,
            },
        }
    }

    /// Create a schema build error
    pub fn schema_build(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaBuild {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a benign lost race that a fresh pass resolves
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Get the kind of the resource this error concerns, if known
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::StoreRead { kind, .. }
            | Self::StoreWrite { kind, .. }
            | Self::Conflict { kind, .. } => Some(kind),
            Self::SchemaBuild { .. } => None,
        }
    }

    /// Get the namespaced name of the resource this error concerns
    pub fn name(&self) -> &str {
        match self {
            Self::StoreRead { name, .. }
            | Self::StoreWrite { name, .. }
            | Self::Conflict { name, .. }
            | Self::SchemaBuild { name, .. } => name,
        }
    }
}
