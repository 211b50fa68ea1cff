// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store client abstraction.
//!
//! Reconcilers and the tenant API never talk to a concrete store. They are
//! generic over [`ObjectStore`], which offers typed CRUD with optimistic
//! concurrency plus a watch stream. Two implementations ship with the crate:
//!
//! - [`KubeStore`] - backed by the Kubernetes API server through `kube`
//! - [`MemoryStore`] - in-process, watchable, with owner-reference garbage
//!   collection; used by tests and local dry runs
//!
//! Every failure leaving a store is already classified into
//! [`crate::errors::Error`], so callers can tell not-found and version
//! conflicts apart without looking at store-specific details.

pub mod kubernetes;
pub mod memory;

pub use kubernetes::{KubeImpersonator, KubeStore};
pub use memory::MemoryStore;

use crate::errors::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Any typed object the store can hold.
///
/// Blanket-implemented for every `k8s-openapi` type and every derived custom
/// resource.
pub trait StoreObject:
    Resource<DynamicType = ()>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = ()>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Store coordinates of one object: namespace (absent for cluster-scoped
/// kinds) and name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Key of a namespaced object.
    #[must_use]
    pub fn namespaced(namespace: &str, name: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }

    /// Key of a cluster-scoped object.
    #[must_use]
    pub fn cluster(name: &str) -> Self {
        Self {
            namespace: None,
            name: name.to_string(),
        }
    }

    /// Key of an existing object.
    #[must_use]
    pub fn from_resource<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// What happened to a watched object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEventType {
    /// Created, updated, or listed during the initial snapshot
    Applied,
    /// Removed from the store
    Deleted,
}

/// One change notification.
#[derive(Clone, Debug)]
pub struct WatchEvent<K> {
    /// Kind of change
    pub event_type: WatchEventType,
    /// Object as of the change
    pub object: K,
}

impl<K: Resource> WatchEvent<K> {
    /// Key of the changed object.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::from_resource(&self.object)
    }
}

/// Typed access to a watchable object store with optimistic concurrency.
///
/// All writes are compare-and-write: `update` and `update_status` carry the
/// `resourceVersion` read earlier and fail with
/// [`crate::errors::Error::Conflict`] when it is stale.
#[async_trait]
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// Fetch one object.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::NotFound`] when the object does not exist.
    async fn get<K: StoreObject>(&self, key: &ObjectKey) -> Result<K>;

    /// List objects of a kind, optionally restricted to a namespace and an
    /// equality/existence label selector.
    ///
    /// # Errors
    ///
    /// Store failures; [`crate::errors::Error::InvalidInput`] for a malformed selector.
    async fn list<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<K>>;

    /// Create an object, returning it as stored.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::Conflict`] when it already exists.
    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K>;

    /// Replace an object's metadata and spec. `status` is left untouched.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::Conflict`] on a stale `resourceVersion`.
    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K>;

    /// Replace an object's `status` only.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::Conflict`] on a stale `resourceVersion`.
    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K>;

    /// Delete an object. Owned objects are garbage collected by the store.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::NotFound`] when the object does not exist.
    async fn delete<K: StoreObject>(&self, key: &ObjectKey) -> Result<()>;

    /// Stream changes to objects of a kind. The stream starts with one
    /// `Applied` event per existing object, then follows live changes.
    fn watch<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> BoxStream<'static, Result<WatchEvent<K>>>;
}

/// Hands out stores that act as a given principal.
///
/// Used by the tenant API so caller-driven reads and writes go through the
/// store's own access control. Reconcilers never impersonate.
pub trait Impersonator: Send + Sync {
    /// Store type returned for a principal.
    type Store: ObjectStore;

    /// Build a store acting as `principal`.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::InvalidInput`] for an empty principal; store
    /// construction failures.
    fn impersonate(&self, principal: &str) -> Result<Self::Store>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
