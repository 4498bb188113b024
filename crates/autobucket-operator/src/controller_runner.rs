//! Controller runner - builds the Bucket controller future
//!
//! The controller watches Deployments and the Buckets they own, so a change
//! to either side schedules a pass for the owning Deployment.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use autobucket_common::crd::Bucket;
use autobucket_controller::{error_policy, reconcile, BucketContext, ControllerConfig};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the Deployment → Bucket controller future
///
/// The future completes once a shutdown signal has been received and
/// in-flight passes have drained.
pub fn build_bucket_controller(
    client: Client,
    config: ControllerConfig,
) -> impl Future<Output = ()> + Send {
    let ctx = Arc::new(BucketContext::from_client(client.clone(), config));
    let deployments: Api<Deployment> = Api::all(client.clone());
    let buckets: Api<Bucket> = Api::all(client);

    tracing::info!("- Bucket controller (Deployment → Bucket)");

    Controller::new(
        deployments,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .owns(buckets, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
    .shutdown_on_signal()
    .run(reconcile, error_policy, ctx)
    .for_each(log_reconcile_result("Bucket"))
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::warn!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
