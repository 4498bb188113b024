//! Common types for autobucket: the Bucket CRD, errors, events, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod telemetry;

pub use error::ReconcileError;
pub use events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};

/// Result type alias using the reconciliation error type
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// API group of the Bucket CRD, also used as the annotation domain
pub const BUCKET_GROUP: &str = "bm.bmutziu.me";

/// Annotation on a Deployment that opts it into a managed Bucket and names the cloud
pub const CLOUD_ANNOTATION: &str = "bm.bmutziu.me/cloud";

/// Annotation on a Deployment overriding the bucket name prefix
pub const NAME_PREFIX_ANNOTATION: &str = "bm.bmutziu.me/name-prefix";

/// Annotation on a Deployment selecting the bucket on-delete policy
pub const ON_DELETE_POLICY_ANNOTATION: &str = "bm.bmutziu.me/on-delete-policy";

/// Bucket name prefix used when the Deployment does not set one
pub const DEFAULT_NAME_PREFIX: &str = "ab";

/// Label key on a Bucket carrying the owning Deployment's name
pub const DEPLOYMENT_LABEL_KEY: &str = "deployment_cr";

/// Field manager / reporting component name for this operator
pub const CONTROLLER_NAME: &str = "autobucket-controller";
