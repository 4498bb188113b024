//! Bucket controller implementation
//!
//! Each pass reads the Deployment, decides what its Bucket should look like,
//! and performs at most one write (create or update). After a write the pass
//! asks to be run again, so repeated passes converge on a fixed point where
//! nothing differs and the directive is [`Directive::Done`].
//!
//! Deleting a Bucket is never done here: the Bucket carries a controller
//! owner reference and the garbage collector removes it with its Deployment.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use autobucket_common::crd::Bucket;
use autobucket_common::events::{actions, reasons};
use autobucket_common::{
    EventPublisher, KubeEventPublisher, ReconcileError, CONTROLLER_NAME,
};
#[cfg(test)]
use autobucket_common::NoopEventPublisher;

use crate::bucket::{bucket_full_name, build_bucket, object_key};
use crate::client::{BucketKubeClient, BucketKubeClientImpl};
use crate::config::{ControllerConfig, ReconcilerConfig};

/// Namespaced identity of a Deployment, as delivered by the scheduler
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    /// Deployment name
    pub name: String,
    /// Deployment namespace
    pub namespace: String,
}

impl WorkloadRef {
    /// Create a reference from name and namespace
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Reference to a Deployment object; `None` if it has no namespace
    pub fn from_deployment(deployment: &Deployment) -> Option<Self> {
        Some(Self::new(deployment.name_any(), deployment.namespace()?))
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Outcome of a successful pass
///
/// A failed pass returns a [`ReconcileError`] instead, which the scheduler
/// retries through [`error_policy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Converged, or nothing to manage; wait for the next change
    Done,
    /// A write was made; run again right away to observe it
    RetryNow,
}

impl From<Directive> for Action {
    fn from(directive: Directive) -> Self {
        match directive {
            Directive::Done => Action::await_change(),
            Directive::RetryNow => Action::requeue(Duration::ZERO),
        }
    }
}

/// Write needed to converge a Bucket on its Deployment
#[derive(Clone, Debug, PartialEq)]
pub enum BucketAction {
    /// No Bucket exists yet; create this one
    Create(Bucket),
    /// The stored on-delete policy drifted; write back this updated Bucket
    UpdateOnDeletePolicy(Bucket),
    /// The Bucket matches the Deployment
    NoOp,
}

/// Decide what write, if any, brings `existing` in line with `deployment`
///
/// Only the on-delete policy is compared; `cloud` and `fullName` keep the
/// values chosen at creation.
pub fn determine_action(
    deployment: &Deployment,
    existing: Option<&Bucket>,
    config: &ReconcilerConfig,
) -> Result<BucketAction, ReconcileError> {
    let Some(existing) = existing else {
        return Ok(BucketAction::Create(build_bucket(deployment, config)?));
    };

    let ignored = ignored_annotation_changes(deployment, existing, config);
    if !ignored.is_empty() {
        debug!(
            fields = ?ignored,
            cloud = %existing.spec.cloud,
            full_name = %existing.spec.full_name,
            "fields are fixed at creation; ignoring changed annotations"
        );
    }

    let desired = config
        .on_delete_policy(deployment)
        .map_err(|e| ReconcileError::schema_build(object_key(existing), e.to_string()))?;

    if desired == existing.spec.on_delete_policy {
        return Ok(BucketAction::NoOp);
    }

    let mut updated = existing.clone();
    updated.spec.on_delete_policy = desired;
    Ok(BucketAction::UpdateOnDeletePolicy(updated))
}

/// Stored fields the annotations would now set differently
///
/// These are fixed at creation and never written back. The check runs on
/// every pass, so callers report it at debug level only.
fn ignored_annotation_changes(
    deployment: &Deployment,
    existing: &Bucket,
    config: &ReconcilerConfig,
) -> Vec<&'static str> {
    let mut fields = Vec::new();

    if config.cloud_intent(deployment).unwrap_or_default() != existing.spec.cloud.as_str() {
        fields.push("cloud");
    }

    let full_name = bucket_full_name(
        config.name_prefix(deployment),
        &deployment.namespace().unwrap_or_default(),
        &deployment.name_any(),
    );
    if full_name != existing.spec.full_name {
        fields.push("fullName");
    }

    fields
}

/// Shared context for the Bucket controller
pub struct BucketContext {
    /// State-store access
    pub kube: Arc<dyn BucketKubeClient>,
    /// Event publisher for emitting Kubernetes Events
    pub events: Arc<dyn EventPublisher>,
    /// Annotation keys, defaults and requeue delays
    pub config: ControllerConfig,
}

impl BucketContext {
    /// Create a context from its parts
    pub fn new(
        kube: Arc<dyn BucketKubeClient>,
        events: Arc<dyn EventPublisher>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            kube,
            events,
            config,
        }
    }

    /// Create a context backed by a real Kubernetes client
    pub fn from_client(client: Client, config: ControllerConfig) -> Self {
        let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
        Self::new(Arc::new(BucketKubeClientImpl::new(client)), events, config)
    }

    /// Create a context for testing with default configuration
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn BucketKubeClient>) -> Self {
        Self::new(kube, Arc::new(NoopEventPublisher), ControllerConfig::default())
    }
}

/// Run one read-decide-write pass for a Deployment
///
/// 1. Deployment gone → `Done` (its Bucket is garbage collected).
/// 2. No cloud annotation → `Done` without reading any Bucket.
/// 3. No Bucket → create it, `RetryNow`.
/// 4. On-delete policy drifted → update it, `RetryNow`; otherwise `Done`.
#[instrument(skip(ctx), fields(deployment = %workload.name, namespace = %workload.namespace))]
pub async fn reconcile_workload(
    workload: &WorkloadRef,
    ctx: &BucketContext,
) -> Result<Directive, ReconcileError> {
    let Some(deployment) = ctx
        .kube
        .get_deployment(&workload.name, &workload.namespace)
        .await?
    else {
        info!("deployment not found, ignoring since object must be deleted");
        return Ok(Directive::Done);
    };

    let reconciler = &ctx.config.reconciler;
    if reconciler.cloud_intent(&deployment).is_none() {
        debug!("deployment has no cloud annotation");
        return Ok(Directive::Done);
    }

    let existing = ctx
        .kube
        .get_bucket(&workload.name, &workload.namespace)
        .await?;

    match determine_action(&deployment, existing.as_ref(), reconciler)? {
        BucketAction::Create(bucket) => {
            info!(
                full_name = %bucket.spec.full_name,
                cloud = %bucket.spec.cloud,
                on_delete_policy = %bucket.spec.on_delete_policy,
                "creating bucket"
            );
            ctx.kube.create_bucket(&bucket).await?;
            publish(
                ctx,
                &deployment,
                reasons::BUCKET_CREATED,
                actions::CREATE,
                format!("Created Bucket {}", bucket.spec.full_name),
            )
            .await;
            Ok(Directive::RetryNow)
        }
        BucketAction::UpdateOnDeletePolicy(bucket) => {
            info!(
                on_delete_policy = %bucket.spec.on_delete_policy,
                "updating bucket on-delete policy"
            );
            ctx.kube.update_bucket(&bucket).await?;
            publish(
                ctx,
                &deployment,
                reasons::BUCKET_UPDATED,
                actions::UPDATE,
                format!(
                    "Set Bucket {} onDeletePolicy to {}",
                    bucket.spec.full_name, bucket.spec.on_delete_policy
                ),
            )
            .await;
            Ok(Directive::RetryNow)
        }
        BucketAction::NoOp => {
            debug!("bucket is up to date");
            Ok(Directive::Done)
        }
    }
}

async fn publish(
    ctx: &BucketContext,
    deployment: &Deployment,
    reason: &str,
    action: &str,
    note: String,
) {
    ctx.events
        .publish(
            &deployment.object_ref(&()),
            EventType::Normal,
            reason,
            action,
            Some(note),
        )
        .await;
}

/// Reconcile a Deployment delivered by the controller runtime
///
/// The delivered object only identifies the Deployment; state is read
/// fresh through the context's client.
pub async fn reconcile(
    deployment: Arc<Deployment>,
    ctx: Arc<BucketContext>,
) -> Result<Action, ReconcileError> {
    let Some(workload) = WorkloadRef::from_deployment(&deployment) else {
        warn!(deployment = %deployment.name_any(), "deployment has no namespace, skipping");
        return Ok(Action::await_change());
    };
    reconcile_workload(&workload, &ctx).await.map(Action::from)
}

/// Error policy for the Bucket controller
///
/// Every failure is retried: lost write races after a short delay, anything
/// else after the configured error backoff.
pub fn error_policy(
    deployment: Arc<Deployment>,
    error: &ReconcileError,
    ctx: Arc<BucketContext>,
) -> Action {
    if error.is_conflict() {
        debug!(
            %error,
            deployment = %deployment.name_any(),
            "bucket write lost a race, retrying"
        );
        return Action::requeue(ctx.config.conflict_requeue);
    }

    error!(
        ?error,
        deployment = %deployment.name_any(),
        kind = error.kind().unwrap_or("unknown"),
        "bucket reconciliation failed"
    );
    Action::requeue(ctx.config.error_requeue)
}
