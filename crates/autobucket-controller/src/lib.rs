//! Bucket controller for autobucket
//!
//! Derives a `Bucket` from the annotations of each Deployment that opts in
//! and keeps its on-delete policy in sync:
//!
//! - **Config**: annotation keys and defaults, injected at construction
//! - **Bucket**: builds the desired Bucket (full name, labels, owner reference)
//! - **Client**: state-store port over the Kubernetes API
//! - **Controller**: the reconcile pass and its error policy

#![deny(missing_docs)]

pub mod bucket;
pub mod client;
pub mod config;
pub mod controller;

#[cfg(test)]
mod fake;

pub use bucket::{bucket_full_name, build_bucket};
pub use client::{BucketKubeClient, BucketKubeClientImpl};
pub use config::{ControllerConfig, ReconcilerConfig};
pub use controller::{
    determine_action, error_policy, reconcile, reconcile_workload, BucketAction, BucketContext,
    Directive, WorkloadRef,
};
