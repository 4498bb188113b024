//! Reconciler configuration
//!
//! Annotation keys and defaults are plain values handed to the controller
//! at construction, so tests and deployments can override them without
//! touching process-wide state.

use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;

use autobucket_common::crd::{BucketOnDeletePolicy, ParseEnumError};
use autobucket_common::{
    CLOUD_ANNOTATION, DEFAULT_NAME_PREFIX, NAME_PREFIX_ANNOTATION, ON_DELETE_POLICY_ANNOTATION,
};

/// Default delay before retrying a failed pass
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Default delay before retrying a pass that lost a write race
pub const DEFAULT_CONFLICT_REQUEUE: Duration = Duration::from_secs(1);

/// Which Deployment annotations drive a Bucket, and what they default to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Annotation whose non-empty value opts a Deployment in and names the cloud
    pub cloud_annotation: String,
    /// Annotation overriding the bucket name prefix
    pub name_prefix_annotation: String,
    /// Annotation selecting the on-delete policy
    pub on_delete_policy_annotation: String,
    /// Prefix used when the name-prefix annotation is absent or empty
    pub default_name_prefix: String,
    /// Policy used when the on-delete-policy annotation is absent or empty
    pub default_on_delete_policy: BucketOnDeletePolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            cloud_annotation: CLOUD_ANNOTATION.to_string(),
            name_prefix_annotation: NAME_PREFIX_ANNOTATION.to_string(),
            on_delete_policy_annotation: ON_DELETE_POLICY_ANNOTATION.to_string(),
            default_name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            default_on_delete_policy: BucketOnDeletePolicy::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Override the default name prefix
    pub fn with_default_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_name_prefix = prefix.into();
        self
    }

    /// Raw cloud annotation value, if the Deployment opted in
    pub fn cloud_intent<'a>(&self, deployment: &'a Deployment) -> Option<&'a str> {
        non_empty_annotation(deployment, &self.cloud_annotation)
    }

    /// Bucket name prefix for the Deployment
    pub fn name_prefix<'a>(&'a self, deployment: &'a Deployment) -> &'a str {
        non_empty_annotation(deployment, &self.name_prefix_annotation)
            .unwrap_or(&self.default_name_prefix)
    }

    /// On-delete policy currently requested by the Deployment
    ///
    /// Absent and empty both mean the default. Used for creation and for the
    /// drift check alike, so the two never disagree about the same annotations.
    pub fn on_delete_policy(
        &self,
        deployment: &Deployment,
    ) -> Result<BucketOnDeletePolicy, ParseEnumError> {
        match non_empty_annotation(deployment, &self.on_delete_policy_annotation) {
            Some(value) => value.parse(),
            None => Ok(self.default_on_delete_policy),
        }
    }
}

/// Requeue behavior of the controller around the reconciler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Annotation keys and defaults
    pub reconciler: ReconcilerConfig,
    /// Delay before retrying a failed pass
    pub error_requeue: Duration,
    /// Delay before retrying a pass that lost a write race
    pub conflict_requeue: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            error_requeue: DEFAULT_ERROR_REQUEUE,
            conflict_requeue: DEFAULT_CONFLICT_REQUEUE,
        }
    }
}

fn non_empty_annotation<'a>(deployment: &'a Deployment, key: &str) -> Option<&'a str> {
    deployment
        .annotations()
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}
