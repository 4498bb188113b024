//! State-store port for the Bucket controller
//!
//! The reconciler only talks to the API server through [`BucketKubeClient`],
//! so tests substitute a mock or an in-memory store.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use kube::Client;

#[cfg(test)]
use mockall::automock;

use autobucket_common::crd::Bucket;
use autobucket_common::{ReconcileError, CONTROLLER_NAME};

use crate::bucket::object_key;

/// Trait abstracting Kubernetes client operations for the Bucket controller
///
/// Reads return `Ok(None)` when the object does not exist. Writes report a
/// lost race (HTTP 409) as [`ReconcileError::Conflict`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BucketKubeClient: Send + Sync {
    /// Get a Deployment by name and namespace
    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, ReconcileError>;

    /// Get a Bucket by name and namespace
    async fn get_bucket(&self, name: &str, namespace: &str)
        -> Result<Option<Bucket>, ReconcileError>;

    /// Create a Bucket; fails with `Conflict` if it already exists
    async fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket, ReconcileError>;

    /// Replace a Bucket; fails with `Conflict` if its resourceVersion is stale
    async fn update_bucket(&self, bucket: &Bucket) -> Result<Bucket, ReconcileError>;
}

/// Real Kubernetes client implementation
pub struct BucketKubeClientImpl {
    client: Client,
}

impl BucketKubeClientImpl {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn buckets(&self, bucket: &Bucket) -> Result<(Api<Bucket>, String), ReconcileError> {
        let namespace = bucket.metadata.namespace.as_deref().ok_or_else(|| {
            ReconcileError::schema_build(object_key(bucket), "bucket has no namespace")
        })?;
        let name = bucket.metadata.name.clone().ok_or_else(|| {
            ReconcileError::schema_build(object_key(bucket), "bucket has no name")
        })?;
        Ok((Api::namespaced(self.client.clone(), namespace), name))
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(CONTROLLER_NAME.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BucketKubeClient for BucketKubeClientImpl {
    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, ReconcileError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| ReconcileError::read("Deployment", format!("{}/{}", namespace, name), e))
    }

    async fn get_bucket(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Bucket>, ReconcileError> {
        let api: Api<Bucket> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .map_err(|e| ReconcileError::read("Bucket", format!("{}/{}", namespace, name), e))
    }

    async fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket, ReconcileError> {
        let (api, _) = self.buckets(bucket)?;
        api.create(&Self::post_params(), bucket)
            .await
            .map_err(|e| ReconcileError::write("Bucket", object_key(bucket), "create", e))
    }

    async fn update_bucket(&self, bucket: &Bucket) -> Result<Bucket, ReconcileError> {
        let (api, name) = self.buckets(bucket)?;
        api.replace(&name, &Self::post_params(), bucket)
            .await
            .map_err(|e| ReconcileError::write("Bucket", object_key(bucket), "update", e))
    }
}
