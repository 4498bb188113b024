//! CRD installation utilities
//!
//! The operator installs the Bucket CRD on startup using server-side apply,
//! so the stored schema always matches the binary.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use autobucket_common::crd::Bucket;
use autobucket_common::CONTROLLER_NAME;

/// Name of the Bucket CRD object
pub const BUCKET_CRD_NAME: &str = "buckets.bm.bmutziu.me";

/// Bucket CRD rendered as YAML
pub fn bucket_crd_yaml() -> anyhow::Result<String> {
    serde_yaml::to_string(&Bucket::crd())
        .map_err(|e| anyhow::anyhow!("failed to serialize Bucket CRD: {}", e))
}

/// Ensure the Bucket CRD is installed and up to date
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(CONTROLLER_NAME).force();

    tracing::info!("Installing {} CRD...", BUCKET_CRD_NAME);
    crds.patch(BUCKET_CRD_NAME, &params, &Patch::Apply(&Bucket::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", BUCKET_CRD_NAME, e))?;
    tracing::info!("Bucket CRD installed/updated");

    Ok(())
}
