//! Bucket Custom Resource Definition
//!
//! A Bucket records the intent for one cloud storage bucket. It is derived
//! from an annotated Deployment and owned by it; provisioning the physical
//! bucket is left to whatever watches Buckets and fills in `status.createdAt`.

use std::fmt;
use std::str::FromStr;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cloud platform hosting the bucket
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BucketCloud {
    /// Google Cloud Storage
    Gcp,
}

impl BucketCloud {
    /// Wire value as stored in the CRD and in annotations
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for BucketCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketCloud {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gcp" => Ok(Self::Gcp),
            other => Err(ParseEnumError {
                field: "cloud",
                value: other.to_string(),
            }),
        }
    }
}

/// What happens to the storage bucket when the Bucket object is deleted
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum BucketOnDeletePolicy {
    /// Leave the storage bucket in place
    #[default]
    Ignore,
    /// Destroy the storage bucket
    Destroy,
}

impl BucketOnDeletePolicy {
    /// Wire value as stored in the CRD and in annotations
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for BucketOnDeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketOnDeletePolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "destroy" => Ok(Self::Destroy),
            other => Err(ParseEnumError {
                field: "onDeletePolicy",
                value: other.to_string(),
            }),
        }
    }
}

/// An enumerated Bucket field was given a value outside its allowed set
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported {field} value '{value}'")]
pub struct ParseEnumError {
    /// Spec field being parsed
    pub field: &'static str,
    /// The rejected value
    pub value: String,
}

/// Observed state of a Bucket
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    /// Creation time of the cloud storage bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Desired state of a Bucket
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "bm.bmutziu.me",
    version = "v1",
    kind = "Bucket",
    plural = "buckets",
    namespaced,
    derive = "PartialEq",
    status = "BucketStatus",
    printcolumn = r#"{"name":"Cloud","type":"string","jsonPath":".spec.cloud"}"#,
    printcolumn = r#"{"name":"FullName","type":"string","jsonPath":".spec.fullName"}"#,
    printcolumn = r#"{"name":"CreatedAt","type":"string","jsonPath":".status.createdAt"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    /// Cloud platform
    pub cloud: BucketCloud,

    /// Full name of the cloud storage bucket
    pub full_name: String,

    /// Behavior when the Deployment/Bucket objects are deleted
    pub on_delete_policy: BucketOnDeletePolicy,
}
