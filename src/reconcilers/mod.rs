// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tenant reconciliation controllers.
//!
//! Each parent kind has a [`Reconciler`] describing how to recognize,
//! validate and converge it. The shared [`reconcile`] function drives one
//! pass over a key:
//!
//! 1. **Fetch** - load the parent; a missing parent is done
//! 2. **Validate** - a parent lacking required metadata is skipped and logged,
//!    never retried
//! 3. **Deletion check** - a parent being deleted is skipped; derived objects
//!    go away through owner references
//! 4. **Sync** - run the kind's syncers strictly in order; the first failure
//!    aborts the pass and the key is requeued
//!
//! One event is recorded on the parent per syncer outcome.
//!
//! # Available Reconcilers
//!
//! - [`organization::OrganizationReconciler`] - owner and member role bindings
//! - [`project::ProjectReconciler`] - limit range, quota and owner binding
//! - [`site::SiteReconciler`] - credentials, deployment, service, ingress and
//!   the `Ready` condition

pub mod organization;
pub mod project;
pub mod resources;
pub mod site;
pub mod status;
pub mod validation;

use crate::errors::{Error, Result};
use crate::events::EventRecorder;
use crate::metrics;
use crate::store::{ObjectKey, ObjectStore, StoreObject};
use crate::sync::{SyncOutcome, SyncReport, Syncer};
use async_trait::async_trait;
use kube::Resource;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared state handed to every reconciler.
pub struct Context<S> {
    /// Store acting with the operator's own identity
    pub store: S,
    /// Where per-syncer events go
    pub recorder: Arc<dyn EventRecorder>,
}

impl<S> Context<S> {
    /// Bundle a store and an event recorder.
    pub fn new(store: S, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { store, recorder }
    }
}

/// How one parent kind is recognized, validated and converged.
#[async_trait]
pub trait Reconciler<S: ObjectStore>: Send + Sync + 'static {
    /// Stored type of the parent
    type Parent: StoreObject;
    /// Validated parent with precomputed lineage and owner reference
    type Tenant: Send + Sync;

    /// Logical kind, used in logs and metrics.
    fn kind(&self) -> &'static str;

    /// Whether parents are namespaced.
    fn namespaced(&self) -> bool;

    /// Label selector narrowing the parent watch.
    fn parent_selector(&self) -> Option<&'static str> {
        None
    }

    /// Static predicate: does this object belong to this reconciler at all?
    fn matches(&self, parent: &Self::Parent) -> bool;

    /// Check required metadata and wrap the parent.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMetadata`] when the parent must be skipped.
    fn validate(&self, parent: Self::Parent) -> Result<Self::Tenant>;

    /// Ordered derived-object syncers for a tenant.
    fn syncers(&self, tenant: &Self::Tenant) -> Vec<Box<dyn Syncer<S>>>;

    /// Runs after the syncers, with the error that aborted the pass if any.
    ///
    /// # Errors
    ///
    /// Store failures; the pass is then requeued.
    async fn finalize(
        &self,
        store: &S,
        tenant: &Self::Tenant,
        failure: Option<&Error>,
    ) -> Result<()> {
        let _ = (store, tenant, failure);
        Ok(())
    }
}

/// How a reconcile pass ended without error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The parent no longer exists
    NotFound,
    /// The object does not belong to this reconciler
    Ignored,
    /// The parent lacks required metadata and was skipped
    Invalid(String),
    /// The parent is being deleted
    Deleting,
    /// Every syncer succeeded
    Synced(Vec<SyncReport>),
}

impl ReconcileOutcome {
    /// Short lowercase name for logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::NotFound => "not_found",
            ReconcileOutcome::Ignored => "ignored",
            ReconcileOutcome::Invalid(_) => "invalid",
            ReconcileOutcome::Deleting => "deleting",
            ReconcileOutcome::Synced(_) => "synced",
        }
    }
}

/// Run one reconcile pass over `key`.
///
/// # Errors
///
/// The error of the first failing syncer, or a store failure while fetching
/// the parent or finalizing. Whether to requeue is up to the caller
/// ([`Error::is_retryable`]).
pub async fn reconcile<S, R>(
    reconciler: &R,
    ctx: &Context<S>,
    key: &ObjectKey,
) -> Result<ReconcileOutcome>
where
    S: ObjectStore,
    R: Reconciler<S>,
{
    let kind = reconciler.kind();
    let start = Instant::now();
    let result = run_pass(reconciler, ctx, key).await;

    match &result {
        Ok(outcome) => metrics::record_reconciliation(kind, outcome.as_str(), start.elapsed()),
        Err(err) => {
            metrics::record_reconciliation(kind, "error", start.elapsed());
            metrics::record_error(kind, err.category());
        }
    }
    result
}

async fn run_pass<S, R>(
    reconciler: &R,
    ctx: &Context<S>,
    key: &ObjectKey,
) -> Result<ReconcileOutcome>
where
    S: ObjectStore,
    R: Reconciler<S>,
{
    let kind = reconciler.kind();
    debug!(kind, key = %key, "Reconciling");

    let parent = match ctx.store.get::<R::Parent>(key).await {
        Ok(parent) => parent,
        Err(err) if err.is_not_found() => {
            debug!(kind, key = %key, "Parent no longer exists, nothing to do");
            return Ok(ReconcileOutcome::NotFound);
        }
        Err(err) => return Err(err),
    };

    if !reconciler.matches(&parent) {
        return Ok(ReconcileOutcome::Ignored);
    }

    let terminating = parent.meta().deletion_timestamp.is_some();
    let reference = parent.object_ref(&());
    let generation = parent.meta().generation;

    let tenant = match reconciler.validate(parent) {
        Ok(tenant) => tenant,
        Err(err) => {
            warn!(kind, key = %key, error = %err, "Skipping parent with invalid metadata");
            metrics::record_error(kind, err.category());
            return Ok(ReconcileOutcome::Invalid(err.to_string()));
        }
    };

    if terminating {
        debug!(kind, key = %key, "Parent is being deleted, skipping");
        return Ok(ReconcileOutcome::Deleting);
    }

    let mut reports = Vec::new();
    for syncer in reconciler.syncers(&tenant) {
        let report = syncer.sync(&ctx.store).await;
        metrics::record_sync(&report.kind, report.outcome.as_str());
        ctx.recorder.record(
            &reference,
            report.event_kind(),
            report.reason(),
            report.message(),
        );

        if let SyncOutcome::Failed(err) = &report.outcome {
            let err = err.clone();
            warn!(
                kind,
                key = %key,
                component = syncer.component(),
                error = %err,
                "Sync failed, aborting pass"
            );
            if let Err(status_err) = reconciler.finalize(&ctx.store, &tenant, Some(&err)).await {
                warn!(kind, key = %key, error = %status_err, "Failed to record failure on parent");
            }
            return Err(err);
        }
        reports.push(report);
    }

    reconciler.finalize(&ctx.store, &tenant, None).await?;

    info!(
        kind,
        key = %key,
        generation = ?generation,
        derived = reports.len(),
        "Reconciled"
    );
    Ok(ReconcileOutcome::Synced(reports))
}
