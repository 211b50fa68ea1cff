// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Idempotent synchronization of derived objects.
//!
//! [`sync`] converges one derived object:
//!
//! 1. fetch the object, or start from `K::default()` when it does not exist
//! 2. apply the caller's transform to it in place
//! 3. pin name/namespace and set the controller owner reference
//! 4. create it, update it when it differs from what was fetched, or leave
//!    it alone
//!
//! At most one write is issued per call, and the update carries the
//! `resourceVersion` captured at fetch time. Running the same sync twice
//! without outside changes yields zero writes the second time.
//!
//! [`ObjectSyncer`] packages one such call with its component name, key,
//! owner and transform, so reconcilers can describe a parent's derived
//! objects as an ordered list of [`Syncer`]s.

pub mod component;

pub use component::Component;

use crate::errors::{Error, Result};
use crate::events::EventKind;
use crate::status_reasons::{
    REASON_CREATED, REASON_SYNC_FAILED, REASON_UNCHANGED, REASON_UPDATED,
};
use crate::store::{ObjectKey, ObjectStore, StoreObject};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::fmt;
use tracing::{debug, warn};

/// Result of converging one derived object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The object did not exist and was created
    Created,
    /// The object existed and differed; it was updated
    Updated,
    /// The object already matched; nothing was written
    Unchanged,
    /// Nothing was written because of this error
    Failed(Error),
}

impl SyncOutcome {
    /// Short lowercase name for logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Created => "created",
            SyncOutcome::Updated => "updated",
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Failed(_) => "failed",
        }
    }

    /// Whether the sync failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a syncer did, with enough context to log and record an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// Component name (e.g. `credentials`)
    pub component: String,
    /// Kind of the derived object
    pub kind: String,
    /// Key of the derived object
    pub key: ObjectKey,
    /// What happened
    pub outcome: SyncOutcome,
}

impl SyncReport {
    /// Event severity for this report.
    #[must_use]
    pub fn event_kind(&self) -> EventKind {
        if self.outcome.is_failed() {
            EventKind::Warning
        } else {
            EventKind::Normal
        }
    }

    /// Event reason for this report.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self.outcome {
            SyncOutcome::Created => REASON_CREATED,
            SyncOutcome::Updated => REASON_UPDATED,
            SyncOutcome::Unchanged => REASON_UNCHANGED,
            SyncOutcome::Failed(_) => REASON_SYNC_FAILED,
        }
    }

    /// Human-readable event message.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.outcome {
            SyncOutcome::Failed(err) => {
                format!("{} {} ({}) failed: {err}", self.kind, self.key, self.component)
            }
            outcome => format!("{} {} ({}) {outcome}", self.kind, self.key, self.component),
        }
    }
}

/// Mutates a derived object toward its desired state.
pub type Transform<K> = Box<dyn Fn(&mut K) -> Result<()> + Send + Sync>;

/// One unit of convergence in a reconciler's ordered list.
#[async_trait]
pub trait Syncer<S: ObjectStore>: Send + Sync {
    /// Component name, used in logs, events and metrics.
    fn component(&self) -> &str;

    /// Converge the derived object. Never panics; failures are reported in
    /// the outcome.
    async fn sync(&self, store: &S) -> SyncReport;
}

/// [`Syncer`] for one derived object of type `K`.
pub struct ObjectSyncer<K> {
    component: String,
    key: ObjectKey,
    owner: OwnerReference,
    transform: Transform<K>,
}

impl<K> ObjectSyncer<K> {
    /// Build a syncer converging `key`, owned by `owner`, with `transform`.
    pub fn new<F>(component: &str, key: ObjectKey, owner: OwnerReference, transform: F) -> Self
    where
        F: Fn(&mut K) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            component: component.to_string(),
            key,
            owner,
            transform: Box::new(transform),
        }
    }

    /// Key of the derived object.
    #[must_use]
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }
}

#[async_trait]
impl<S, K> Syncer<S> for ObjectSyncer<K>
where
    S: ObjectStore,
    K: StoreObject + Default + PartialEq,
{
    fn component(&self) -> &str {
        &self.component
    }

    async fn sync(&self, store: &S) -> SyncReport {
        let outcome = sync(store, &self.owner, &self.key, &self.transform).await;
        SyncReport {
            component: self.component.clone(),
            kind: K::kind(&()).to_string(),
            key: self.key.clone(),
            outcome,
        }
    }
}

/// Converge the derived object at `key`. See the module docs.
pub async fn sync<S, K, F>(
    store: &S,
    owner: &OwnerReference,
    key: &ObjectKey,
    transform: F,
) -> SyncOutcome
where
    S: ObjectStore,
    K: StoreObject + Default + PartialEq,
    F: Fn(&mut K) -> Result<()> + Send + Sync,
{
    match try_sync(store, owner, key, transform).await {
        Ok(outcome) => {
            debug!(kind = %K::kind(&()), key = %key, outcome = %outcome, "Synced derived object");
            outcome
        }
        Err(err) => {
            warn!(kind = %K::kind(&()), key = %key, error = %err, "Failed to sync derived object");
            SyncOutcome::Failed(err)
        }
    }
}

async fn try_sync<S, K, F>(
    store: &S,
    owner: &OwnerReference,
    key: &ObjectKey,
    transform: F,
) -> Result<SyncOutcome>
where
    S: ObjectStore,
    K: StoreObject + Default + PartialEq,
    F: Fn(&mut K) -> Result<()> + Send + Sync,
{
    let current = match store.get::<K>(key).await {
        Ok(obj) => Some(obj),
        Err(err) if err.is_not_found() => None,
        Err(err) => return Err(err),
    };

    let mut desired = current.clone().unwrap_or_default();
    transform(&mut desired)?;

    let meta = desired.meta_mut();
    meta.name = Some(key.name.clone());
    meta.namespace.clone_from(&key.namespace);
    meta.resource_version = current.as_ref().and_then(ResourceExt::resource_version);
    set_controller_reference(&mut desired, owner)?;

    match current {
        None => {
            store.create(&desired).await?;
            Ok(SyncOutcome::Created)
        }
        Some(current) if current == desired => Ok(SyncOutcome::Unchanged),
        Some(_) => {
            store.update(&desired).await?;
            Ok(SyncOutcome::Updated)
        }
    }
}

/// Controller owner reference pointing at `parent`.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] when the parent has no name or uid yet.
pub fn controller_reference<P>(parent: &P) -> Result<OwnerReference>
where
    P: Resource<DynamicType = ()>,
{
    parent.controller_owner_ref(&()).ok_or_else(|| {
        Error::InvalidMetadata(format!(
            "{} {} has no uid; cannot own derived objects",
            P::kind(&()),
            parent.name_any()
        ))
    })
}

/// Ensure `owner` is recorded on `obj` as its controller.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] when a different controller already owns `obj`.
pub fn set_controller_reference<K: Resource>(obj: &mut K, owner: &OwnerReference) -> Result<()> {
    let name = obj.name_any();
    let refs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);

    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner.uid)
    {
        return Err(Error::InvalidMetadata(format!(
            "{name} is already controlled by {} {}",
            other.kind, other.name
        )));
    }

    match refs.iter_mut().find(|r| r.uid == owner.uid) {
        Some(existing) => {
            if existing != owner {
                existing.clone_from(owner);
            }
        }
        None => refs.push(owner.clone()),
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
