//! Startup utilities for the autobucket operator

mod crds;

pub use crds::{bucket_crd_yaml, ensure_crds_installed, BUCKET_CRD_NAME};
