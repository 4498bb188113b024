//! Test helpers for integration tests

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Client;
use tokio::sync::OnceCell;
use tokio::time::sleep;

use autobucket_controller::ControllerConfig;
use autobucket_operator::controller_runner::build_bucket_controller;
use autobucket_operator::startup::ensure_crds_installed;

/// Namespace the tests create their Deployments in
pub const TEST_NAMESPACE: &str = "default";

/// How long to wait for the controller to converge
pub const CONVERGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Track if CRD has been installed (async-safe)
static CRD_INSTALLED: OnceCell<Result<(), String>> = OnceCell::const_new();

/// Controller thread, started once per test binary
static CONTROLLER_THREAD: OnceLock<thread::JoinHandle<()>> = OnceLock::new();

/// Start the controller on its own thread and runtime
///
/// Each `#[tokio::test]` owns a runtime that is dropped when the test
/// returns, taking any task it spawned with it. The controller must outlive
/// every test, so it gets a runtime of its own, and builds its client there.
fn start_controller_thread() -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("autobucket-controller".to_string())
        .spawn(|| {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build controller runtime");
            runtime.block_on(async {
                let client = Client::try_default()
                    .await
                    .expect("failed to create controller client");
                build_bucket_controller(client, ControllerConfig::default()).await;
            });
        })
        .expect("failed to spawn controller thread")
}

/// Client for the current kubeconfig context, with the CRD installed and
/// the controller running in the background
pub async fn ensure_operator_running() -> Client {
    let client = Client::try_default()
        .await
        .expect("failed to create client; is the kind cluster running?");

    let crd_result = CRD_INSTALLED
        .get_or_init(|| async {
            ensure_crds_installed(&client)
                .await
                .map_err(|e| format!("failed to install CRD: {e}"))?;
            // Give the API server a moment to establish the new CRD
            sleep(Duration::from_secs(2)).await;
            Ok(())
        })
        .await;
    if let Err(e) = crd_result {
        panic!("{e}");
    }

    let controller = CONTROLLER_THREAD.get_or_init(start_controller_thread);
    assert!(
        !controller.is_finished(),
        "controller thread exited; check its panic output"
    );

    client
}

/// Minimal Deployment carrying the given annotations
pub fn annotated_deployment(name: &str, annotations: &[(&str, &str)]) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(0),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "app".to_string(),
                        image: Some("registry.k8s.io/pause:3.9".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Poll `check` until it returns `Some`, or panic after `timeout`
pub async fn wait_for<T, F, Fut>(what: &str, timeout: Duration, mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(value) = check().await {
            return value;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        sleep(Duration::from_millis(500)).await;
    }
}
