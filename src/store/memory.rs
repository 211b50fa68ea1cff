// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-process object store.
//!
//! Behaves like the API server for everything the operator relies on:
//!
//! - monotonically increasing `resourceVersion`, checked on every update
//! - `uid`, `generation` and `creationTimestamp` assignment
//! - `status` only writable through [`ObjectStore::update_status`]
//! - deletion marker for objects carrying finalizers
//! - cascading garbage collection over owner references
//! - watch streams that start with the current state
//!
//! Test helpers on top: a write counter, one-shot fault injection, and
//! per-principal namespace denial for impersonated clones.

use super::{Impersonator, ObjectKey, ObjectStore, StoreObject, WatchEvent, WatchEventType};
use crate::errors::{Error, Result};
use crate::selector::LabelSelector;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

const WATCH_BUFFER: usize = 1024;

/// (apiVersion, kind, key)
type TypedKey = (String, String, ObjectKey);

#[derive(Clone, Debug)]
struct Change {
    api_version: String,
    kind: String,
    event_type: WatchEventType,
    object: Value,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<TypedKey, Value>,
    last_version: u64,
    last_uid: u64,
    writes: u64,
    faults: VecDeque<Error>,
    denied: BTreeSet<(String, String)>,
}

struct Shared {
    state: Mutex<State>,
    changes: broadcast::Sender<Change>,
}

/// Watchable in-memory [`ObjectStore`]. Clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    principal: Option<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store acting as the operator itself.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(WATCH_BUFFER);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                changes,
            }),
            principal: None,
        }
    }

    /// Principal this handle acts as; `None` for the operator identity.
    #[must_use]
    pub fn acting_as(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Number of successful mutations (create, update, status, delete) so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    /// Number of objects currently stored, across all kinds.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Make the next store call (of any kind) fail with `err`.
    pub fn inject_failure(&self, err: Error) {
        self.lock().faults.push_back(err);
    }

    /// Forbid `principal` from touching anything in `namespace`.
    pub fn deny(&self, principal: &str, namespace: &str) {
        self.lock()
            .denied
            .insert((principal.to_string(), namespace.to_string()));
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, changes: Vec<Change>) {
        for change in changes {
            // No receivers is fine: nobody is watching yet.
            let _ = self.shared.changes.send(change);
        }
    }

    /// Pending fault or access denial for a call touching `scope`.
    fn admit(&self, state: &mut State, scope: &str) -> Result<()> {
        if let Some(fault) = state.faults.pop_front() {
            return Err(fault);
        }
        if let Some(principal) = &self.principal {
            if state
                .denied
                .contains(&(principal.clone(), scope.to_string()))
            {
                return Err(Error::Forbidden(format!(
                    "{principal} may not access {scope}"
                )));
            }
        }
        Ok(())
    }

    fn get_value<K: StoreObject>(&self, key: &ObjectKey) -> Result<Value> {
        let mut state = self.lock();
        self.admit(&mut state, scope_of(key))?;
        state
            .objects
            .get(&typed_key::<K>(key.clone()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {key}", K::kind(&()))))
    }

    fn list_values<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: &LabelSelector,
    ) -> Result<Vec<Value>> {
        let mut state = self.lock();
        self.admit(&mut state, namespace.unwrap_or(""))?;
        let filter = Filter::new::<K>(namespace, selector.clone());
        Ok(state
            .objects
            .iter()
            .filter(|((api_version, kind, _), value)| filter.accepts(api_version, kind, value))
            .map(|(_, value)| value.clone())
            .collect())
    }

    fn create_value<K: StoreObject>(&self, mut value: Value) -> Result<Value> {
        let key = key_of(&value)?;
        let mut state = self.lock();
        self.admit(&mut state, scope_of(&key))?;
        let typed = typed_key::<K>(key.clone());
        if state.objects.contains_key(&typed) {
            return Err(Error::Conflict(format!(
                "{} {key} already exists",
                K::kind(&())
            )));
        }

        state.last_uid += 1;
        state.last_version += 1;
        let uid = format!("uid-{}", state.last_uid);
        let version = state.last_version.to_string();
        let metadata = metadata_mut(&mut value)?;
        metadata.insert("uid".into(), Value::String(uid));
        metadata.insert("resourceVersion".into(), Value::String(version));
        metadata.insert("generation".into(), Value::from(1));
        metadata.insert("creationTimestamp".into(), Value::String(now()));
        metadata.remove("deletionTimestamp");

        state.writes += 1;
        state.objects.insert(typed, value.clone());
        drop(state);

        debug!(kind = %K::kind(&()), key = %key, "memory store: created");
        self.publish(vec![change::<K>(WatchEventType::Applied, &value)]);
        Ok(value)
    }

    fn update_value<K: StoreObject>(&self, mut value: Value, status_only: bool) -> Result<Value> {
        let key = key_of(&value)?;
        let Some(version) = string_at(&value, "resourceVersion") else {
            return Err(Error::InvalidInput(format!(
                "{} {key}: update requires a resourceVersion",
                K::kind(&())
            )));
        };

        let mut state = self.lock();
        self.admit(&mut state, scope_of(&key))?;
        let typed = typed_key::<K>(key.clone());
        let Some(stored) = state.objects.get(&typed).cloned() else {
            return Err(Error::NotFound(format!("{} {key}", K::kind(&()))));
        };
        if string_at(&stored, "resourceVersion").as_deref() != Some(version.as_str()) {
            return Err(Error::Conflict(format!(
                "{} {key}: resourceVersion {version} is stale",
                K::kind(&())
            )));
        }

        let mut next = if status_only {
            let mut next = stored.clone();
            set_field(&mut next, "status", value.get("status").cloned());
            next
        } else {
            set_field(&mut value, "status", stored.get("status").cloned());
            let metadata = metadata_mut(&mut value)?;
            for field in ["uid", "creationTimestamp", "deletionTimestamp", "generation"] {
                match stored.get("metadata").and_then(|m| m.get(field)) {
                    Some(kept) => metadata.insert(field.into(), kept.clone()),
                    None => metadata.remove(field),
                };
            }
            if value.get("spec") != stored.get("spec") {
                let generation = stored
                    .get("metadata")
                    .and_then(|m| m.get("generation"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                metadata_mut(&mut value)?.insert("generation".into(), Value::from(generation + 1));
            }
            value
        };

        state.last_version += 1;
        let version = state.last_version.to_string();
        metadata_mut(&mut next)?.insert("resourceVersion".into(), Value::String(version));
        state.writes += 1;

        let changes = if is_terminating(&next) && finalizers_empty(&next) {
            remove_cascading(&mut state, &typed)
        } else {
            state.objects.insert(typed, next.clone());
            vec![change::<K>(WatchEventType::Applied, &next)]
        };
        drop(state);

        debug!(kind = %K::kind(&()), key = %key, status_only, "memory store: updated");
        self.publish(changes);
        Ok(next)
    }

    fn delete_value<K: StoreObject>(&self, key: &ObjectKey) -> Result<()> {
        let mut state = self.lock();
        self.admit(&mut state, scope_of(key))?;
        let typed = typed_key::<K>(key.clone());
        let Some(stored) = state.objects.get(&typed).cloned() else {
            return Err(Error::NotFound(format!("{} {key}", K::kind(&()))));
        };
        state.writes += 1;

        let changes = if finalizers_empty(&stored) {
            remove_cascading(&mut state, &typed)
        } else if is_terminating(&stored) {
            Vec::new()
        } else {
            let mut marked = stored;
            state.last_version += 1;
            let version = state.last_version.to_string();
            let metadata = metadata_mut(&mut marked)?;
            metadata.insert("deletionTimestamp".into(), Value::String(now()));
            metadata.insert("resourceVersion".into(), Value::String(version));
            state.objects.insert(typed, marked.clone());
            vec![change::<K>(WatchEventType::Applied, &marked)]
        };
        drop(state);

        debug!(kind = %K::kind(&()), key = %key, "memory store: deleted");
        self.publish(changes);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: StoreObject>(&self, key: &ObjectKey) -> Result<K> {
        decode(self.get_value::<K>(key)?)
    }

    async fn list<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<K>> {
        let selector = LabelSelector::parse_optional(selector)?;
        self.list_values::<K>(namespace, &selector)?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K> {
        decode(self.create_value::<K>(serde_json::to_value(obj)?)?)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K> {
        decode(self.update_value::<K>(serde_json::to_value(obj)?, false)?)
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K> {
        decode(self.update_value::<K>(serde_json::to_value(obj)?, true)?)
    }

    async fn delete<K: StoreObject>(&self, key: &ObjectKey) -> Result<()> {
        self.delete_value::<K>(key)
    }

    fn watch<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> BoxStream<'static, Result<WatchEvent<K>>> {
        let selector = match LabelSelector::parse_optional(selector) {
            Ok(selector) => selector,
            Err(err) => return stream::once(async move { Err(err) }).boxed(),
        };
        let filter = Filter::new::<K>(namespace, selector);

        // Subscribe while holding the lock so no change slips between the
        // snapshot and the live feed.
        let (snapshot, receiver) = {
            let state = self.lock();
            let receiver = self.shared.changes.subscribe();
            let snapshot: Vec<Value> = state
                .objects
                .iter()
                .filter(|((api_version, kind, _), value)| filter.accepts(api_version, kind, value))
                .map(|(_, value)| value.clone())
                .collect();
            (snapshot, receiver)
        };

        let initial = stream::iter(
            snapshot
                .into_iter()
                .map(|object| decode_event::<K>(WatchEventType::Applied, object)),
        );
        let live = stream::unfold((receiver, filter), |(mut receiver, filter)| async move {
            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        if filter.accepts(&change.api_version, &change.kind, &change.object) {
                            let event = decode_event::<K>(change.event_type, change.object);
                            return Some((event, (receiver, filter)));
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "memory store watcher lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        initial.chain(live).boxed()
    }
}

impl Impersonator for MemoryStore {
    type Store = MemoryStore;

    fn impersonate(&self, principal: &str) -> Result<MemoryStore> {
        if principal.trim().is_empty() {
            return Err(Error::InvalidInput(
                "cannot impersonate an empty principal".to_string(),
            ));
        }
        Ok(Self {
            shared: Arc::clone(&self.shared),
            principal: Some(principal.to_string()),
        })
    }
}

/// Kind, namespace and label filter shared by list and watch.
struct Filter {
    api_version: String,
    kind: String,
    namespace: Option<String>,
    selector: LabelSelector,
}

impl Filter {
    fn new<K: StoreObject>(namespace: Option<&str>, selector: LabelSelector) -> Self {
        Self {
            api_version: K::api_version(&()).to_string(),
            kind: K::kind(&()).to_string(),
            namespace: namespace.map(str::to_string),
            selector,
        }
    }

    fn accepts(&self, api_version: &str, kind: &str, value: &Value) -> bool {
        if api_version != self.api_version || kind != self.kind {
            return false;
        }
        if let Some(namespace) = &self.namespace {
            if string_at(value, "namespace").as_deref() != Some(namespace.as_str()) {
                return false;
            }
        }
        self.selector.matches(&labels_of(value))
    }
}

fn typed_key<K: StoreObject>(key: ObjectKey) -> TypedKey {
    (K::api_version(&()).to_string(), K::kind(&()).to_string(), key)
}

/// Namespace for namespaced keys, the object name for cluster-scoped ones.
fn scope_of(key: &ObjectKey) -> &str {
    key.namespace.as_deref().unwrap_or(&key.name)
}

fn change<K: StoreObject>(event_type: WatchEventType, object: &Value) -> Change {
    Change {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        event_type,
        object: object.clone(),
    }
}

fn decode<K: StoreObject>(value: Value) -> Result<K> {
    Ok(serde_json::from_value(value)?)
}

fn decode_event<K: StoreObject>(event_type: WatchEventType, object: Value) -> Result<WatchEvent<K>> {
    decode(object).map(|object| WatchEvent { event_type, object })
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn metadata_mut(value: &mut Value) -> Result<&mut serde_json::Map<String, Value>> {
    value
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::InvalidInput("object has no metadata".to_string()))
}

fn string_at(value: &Value, field: &str) -> Option<String> {
    value
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn set_field(value: &mut Value, field: &str, content: Option<Value>) {
    if let Some(object) = value.as_object_mut() {
        match content {
            Some(content) if !content.is_null() => {
                object.insert(field.to_string(), content);
            }
            _ => {
                object.remove(field);
            }
        }
    }
}

fn key_of(value: &Value) -> Result<ObjectKey> {
    let name = string_at(value, "name")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidInput("object has no name".to_string()))?;
    Ok(ObjectKey {
        namespace: string_at(value, "namespace"),
        name,
    })
}

fn labels_of(value: &Value) -> BTreeMap<String, String> {
    value
        .get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn is_terminating(value: &Value) -> bool {
    string_at(value, "deletionTimestamp").is_some()
}

fn finalizers_empty(value: &Value) -> bool {
    value
        .get("metadata")
        .and_then(|m| m.get("finalizers"))
        .and_then(Value::as_array)
        .is_none_or(Vec::is_empty)
}

fn owner_uids(value: &Value) -> Vec<String> {
    value
        .get("metadata")
        .and_then(|m| m.get("ownerReferences"))
        .and_then(Value::as_array)
        .map(|refs| {
            refs.iter()
                .filter_map(|r| r.get("uid").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Remove an object and, transitively, every object listing it as owner.
fn remove_cascading(state: &mut State, root: &TypedKey) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut pending = vec![root.clone()];
    while let Some(typed) = pending.pop() {
        let Some(removed) = state.objects.remove(&typed) else {
            continue;
        };
        if let Some(uid) = string_at(&removed, "uid") {
            pending.extend(
                state
                    .objects
                    .iter()
                    .filter(|(_, value)| owner_uids(value).contains(&uid))
                    .map(|(key, _)| key.clone()),
            );
        }
        let (api_version, kind, key) = typed;
        // A namespace takes everything inside it.
        if api_version == "v1" && kind == "Namespace" {
            pending.extend(
                state
                    .objects
                    .keys()
                    .filter(|(_, _, inner)| inner.namespace.as_deref() == Some(key.name.as_str()))
                    .cloned(),
            );
        }
        changes.push(Change {
            api_version,
            kind,
            event_type: WatchEventType::Deleted,
            object: removed,
        });
    }
    changes
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
