//! Integration tests for the autobucket operator
//!
//! These tests require a Kubernetes cluster (kind) and tell the story of how
//! a platform user opts a Deployment into a Bucket.
//!
//! - `bucket_lifecycle`: creating, updating and garbage-collecting Buckets
//!   through Deployment annotations
//!
//! # Running These Tests
//!
//! These tests are ignored by default because they require a cluster:
//!
//! ```bash
//! kind create cluster --name autobucket-integration-test
//! cargo test -p autobucket-operator --test kind -- --ignored --nocapture
//! ```

mod helpers;
