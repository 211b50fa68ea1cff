// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Turning store watch streams into reconcile keys.
//!
//! A controller watches its parent kind, filtered by a static predicate, and
//! every derived kind it owns. Changes to a derived object are mapped back to
//! the parent named by its controller owner reference, which is what makes
//! out-of-band edits and deletions self-heal.

use crate::errors::Result;
use crate::store::{ObjectKey, StoreObject, WatchEvent};
use futures::future;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use tracing::{trace, warn};

/// Stream of keys to reconcile.
pub type KeyStream = BoxStream<'static, ObjectKey>;

/// Key of the parent controlling an object, if its controller has the given
/// `api_version`/`kind`.
///
/// Owner references always point into the dependent's own namespace (or to a
/// cluster-scoped owner), so `namespaced` decides whether the dependent's
/// namespace is carried over.
#[must_use]
pub fn owner_key(
    meta: &ObjectMeta,
    api_version: &str,
    kind: &str,
    namespaced: bool,
) -> Option<ObjectKey> {
    let owner = meta
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))?;
    if owner.kind != kind || owner.api_version != api_version {
        return None;
    }
    if namespaced {
        Some(ObjectKey::namespaced(meta.namespace.as_deref()?, &owner.name))
    } else {
        Some(ObjectKey::cluster(&owner.name))
    }
}

/// Keys of parents whose change passes `predicate`.
pub fn parent_keys<K, F>(
    events: BoxStream<'static, Result<WatchEvent<K>>>,
    predicate: F,
) -> KeyStream
where
    K: StoreObject,
    F: Fn(&K) -> bool + Send + 'static,
{
    events
        .filter_map(move |event| {
            let key = match event {
                Ok(event) if predicate(&event.object) => {
                    trace!(kind = %K::kind(&()), key = %event.key(), "Parent changed");
                    Some(event.key())
                }
                Ok(_) => None,
                Err(err) => {
                    warn!(kind = %K::kind(&()), error = %err, "Watch error on parent kind");
                    None
                }
            };
            future::ready(key)
        })
        .boxed()
}

/// Keys of parents owning changed objects of kind `K`.
pub fn owned_keys<K>(
    events: BoxStream<'static, Result<WatchEvent<K>>>,
    parent_api_version: String,
    parent_kind: String,
    namespaced: bool,
) -> KeyStream
where
    K: StoreObject,
{
    events
        .filter_map(move |event| {
            let key = match event {
                Ok(event) => owner_key(
                    event.object.meta(),
                    &parent_api_version,
                    &parent_kind,
                    namespaced,
                ),
                Err(err) => {
                    warn!(kind = %K::kind(&()), error = %err, "Watch error on owned kind");
                    None
                }
            };
            future::ready(key)
        })
        .boxed()
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
