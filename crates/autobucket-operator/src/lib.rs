//! autobucket operator: wires the Bucket controller into the kube runtime

#![deny(missing_docs)]

/// Controller runner (builds the Deployment → Bucket controller future)
pub mod controller_runner;
/// Startup utilities (CRD install)
pub mod startup;
