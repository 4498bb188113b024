//! Desired Bucket construction
//!
//! Builds the Bucket that a Deployment asks for on first creation: same
//! name and namespace as the Deployment, labelled, and controller-owned by
//! it so the garbage collector removes it with the Deployment.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;

use autobucket_common::crd::{Bucket, BucketCloud, BucketSpec};
use autobucket_common::{ReconcileError, DEFAULT_NAME_PREFIX, DEPLOYMENT_LABEL_KEY};

use crate::config::ReconcilerConfig;

/// Full cloud name of a bucket: `prefix-namespace-deployment`
pub fn bucket_full_name(prefix: &str, namespace: &str, deployment_name: &str) -> String {
    format!("{}-{}-{}", prefix, namespace, deployment_name)
}

/// Labels set on every Bucket created for a Deployment
pub fn bucket_labels(deployment_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), DEFAULT_NAME_PREFIX.to_string()),
        (
            DEPLOYMENT_LABEL_KEY.to_string(),
            deployment_name.to_string(),
        ),
    ])
}

/// Controller owner reference pointing at the Deployment
///
/// Requires the Deployment's name and uid; a Deployment read from the API
/// server always has both.
pub fn controller_owner_reference(deployment: &Deployment) -> Result<OwnerReference, ReconcileError> {
    let key = object_key(deployment);
    let name = deployment
        .metadata
        .name
        .clone()
        .ok_or_else(|| ReconcileError::schema_build(&key, "deployment has no name"))?;
    let uid = deployment
        .metadata
        .uid
        .clone()
        .ok_or_else(|| ReconcileError::schema_build(&key, "deployment has no uid"))?;

    Ok(OwnerReference {
        api_version: Deployment::api_version(&()).to_string(),
        kind: Deployment::kind(&()).to_string(),
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Build the Bucket to create for a Deployment that has none yet
///
/// `cloud` and `fullName` are fixed here from the annotations at this
/// moment; only `onDeletePolicy` is tracked afterwards.
pub fn build_bucket(
    deployment: &Deployment,
    config: &ReconcilerConfig,
) -> Result<Bucket, ReconcileError> {
    let key = object_key(deployment);
    let name = deployment
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ReconcileError::schema_build(&key, "deployment has no name"))?;
    let namespace = deployment
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| ReconcileError::schema_build(&key, "deployment has no namespace"))?;

    let cloud: BucketCloud = config
        .cloud_intent(deployment)
        .ok_or_else(|| {
            ReconcileError::schema_build(
                &key,
                format!("annotation {} is not set", config.cloud_annotation),
            )
        })?
        .parse()
        .map_err(|e| ReconcileError::schema_build(&key, format!("{}", e)))?;

    let on_delete_policy = config
        .on_delete_policy(deployment)
        .map_err(|e| ReconcileError::schema_build(&key, format!("{}", e)))?;

    let full_name = bucket_full_name(config.name_prefix(deployment), namespace, name);

    Ok(Bucket {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(bucket_labels(name)),
            owner_references: Some(vec![controller_owner_reference(deployment)?]),
            ..Default::default()
        },
        spec: BucketSpec {
            cloud,
            full_name,
            on_delete_policy,
        },
        status: None,
    })
}

/// `namespace/name` of an object, for error context
pub(crate) fn object_key<K: Resource>(obj: &K) -> String {
    let meta = obj.meta();
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    )
}
