//! In-memory state store for multi-pass reconciliation tests
//!
//! Behaves like the API server for the operations the reconciler uses:
//! create fails if the object exists, update fails on a stale
//! resourceVersion. Every read and write is recorded.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::core::ErrorResponse;

use autobucket_common::crd::Bucket;
use autobucket_common::ReconcileError;

use crate::bucket::object_key;
use crate::client::BucketKubeClient;

type Key = (String, String);

/// A store call, in the order it happened
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    GetDeployment(String),
    GetBucket(String),
    CreateBucket(String),
    UpdateBucket(String),
}

#[derive(Default)]
pub struct InMemoryStore {
    deployments: Mutex<BTreeMap<Key, Deployment>>,
    buckets: Mutex<BTreeMap<Key, Bucket>>,
    calls: Mutex<Vec<Call>>,
    concurrent_create: Mutex<Option<Bucket>>,
}

fn key_of(name: &str, namespace: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn bucket_key(bucket: &Bucket) -> Key {
    key_of(
        bucket.metadata.name.as_deref().unwrap_or_default(),
        bucket.metadata.namespace.as_deref().unwrap_or_default(),
    )
}

impl InMemoryStore {
    pub fn put_deployment(&self, deployment: Deployment) {
        let key = key_of(
            deployment.metadata.name.as_deref().unwrap_or_default(),
            deployment.metadata.namespace.as_deref().unwrap_or_default(),
        );
        self.deployments.lock().unwrap().insert(key, deployment);
    }

    pub fn remove_deployment(&self, name: &str, namespace: &str) {
        self.deployments
            .lock()
            .unwrap()
            .remove(&key_of(name, namespace));
    }

    pub fn put_bucket(&self, mut bucket: Bucket) {
        bucket.metadata.resource_version = Some("1".to_string());
        self.buckets.lock().unwrap().insert(bucket_key(&bucket), bucket);
    }

    pub fn bucket(&self, name: &str, namespace: &str) -> Option<Bucket> {
        self.buckets
            .lock()
            .unwrap()
            .get(&key_of(name, namespace))
            .cloned()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }

    /// Another writer creates `bucket` just before our next create lands
    pub fn race_next_create(&self, bucket: Bucket) {
        *self.concurrent_create.lock().unwrap() = Some(bucket);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CreateBucket(_) | Call::UpdateBucket(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(name: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("buckets \"{}\" not found", name),
        reason: "NotFound".to_string(),
        code: 404,
    })
}

fn conflict(reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: reason.to_string(),
        reason: reason.to_string(),
        code: 409,
    })
}

fn next_version(version: Option<&str>) -> String {
    let current: u64 = version.and_then(|v| v.parse().ok()).unwrap_or(0);
    (current + 1).to_string()
}

#[async_trait]
impl BucketKubeClient for InMemoryStore {
    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, ReconcileError> {
        self.record(Call::GetDeployment(format!("{}/{}", namespace, name)));
        Ok(self
            .deployments
            .lock()
            .unwrap()
            .get(&key_of(name, namespace))
            .cloned())
    }

    async fn get_bucket(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Bucket>, ReconcileError> {
        self.record(Call::GetBucket(format!("{}/{}", namespace, name)));
        Ok(self.bucket(name, namespace))
    }

    async fn create_bucket(&self, bucket: &Bucket) -> Result<Bucket, ReconcileError> {
        self.record(Call::CreateBucket(object_key(bucket)));
        if let Some(racer) = self.concurrent_create.lock().unwrap().take() {
            self.put_bucket(racer);
        }

        let mut buckets = self.buckets.lock().unwrap();
        let key = bucket_key(bucket);
        if buckets.contains_key(&key) {
            return Err(ReconcileError::write(
                "Bucket",
                object_key(bucket),
                "create",
                conflict("AlreadyExists"),
            ));
        }
        let mut stored = bucket.clone();
        stored.metadata.resource_version = Some("1".to_string());
        buckets.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_bucket(&self, bucket: &Bucket) -> Result<Bucket, ReconcileError> {
        self.record(Call::UpdateBucket(object_key(bucket)));
        let mut buckets = self.buckets.lock().unwrap();
        let key = bucket_key(bucket);
        let Some(current) = buckets.get(&key) else {
            return Err(ReconcileError::write(
                "Bucket",
                object_key(bucket),
                "update",
                not_found(&key.1),
            ));
        };
        if current.metadata.resource_version != bucket.metadata.resource_version {
            return Err(ReconcileError::write(
                "Bucket",
                object_key(bucket),
                "update",
                conflict("Conflict"),
            ));
        }
        let mut stored = bucket.clone();
        stored.metadata.resource_version =
            Some(next_version(bucket.metadata.resource_version.as_deref()));
        buckets.insert(key, stored.clone());
        Ok(stored)
    }
}
