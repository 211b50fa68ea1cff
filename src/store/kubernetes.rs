// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object store backed by the Kubernetes API server.
//!
//! All calls go through `Api<DynamicObject>` built from the erased
//! [`ApiResource`] of the requested type, so one code path serves both
//! cluster-scoped kinds (`Namespace`) and namespaced kinds (`Secret`, `Site`).
//! Typed values are converted at the boundary with `serde_json`.

use super::{Impersonator, ObjectKey, ObjectStore, StoreObject, WatchEvent, WatchEventType};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject, TypeMeta};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Client, Config, ResourceExt};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// [`ObjectStore`] over a `kube::Client`.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    request_timeout: Duration,
}

impl KubeStore {
    /// Wrap a client. Every API call is bounded by `request_timeout`.
    #[must_use]
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    /// Underlying client, for collaborators such as the event recorder.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }

    async fn bounded<T, F>(&self, context: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>> + Send,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Error::from_kube(&err, context)),
            Err(_) => Err(Error::Transient(format!(
                "{context}: no response within {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }
}

fn resource_of<K: StoreObject>() -> ApiResource {
    ApiResource::erase::<K>(&())
}

fn to_dynamic<K: StoreObject>(obj: &K) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

/// List and watch responses may omit `apiVersion`/`kind` on items; restore
/// them before handing the object to the typed deserializer.
fn from_dynamic<K: StoreObject>(mut obj: DynamicObject, resource: &ApiResource) -> Result<K> {
    obj.types = Some(TypeMeta {
        api_version: resource.api_version.clone(),
        kind: resource.kind.clone(),
    });
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

fn describe(resource: &ApiResource, key: &ObjectKey) -> String {
    format!("{} {key}", resource.kind)
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(&self, key: &ObjectKey) -> Result<K> {
        let resource = resource_of::<K>();
        let api = self.api(&resource, key.namespace.as_deref());
        let context = describe(&resource, key);
        let obj = self.bounded(&context, api.get(&key.name)).await?;
        from_dynamic(obj, &resource)
    }

    async fn list<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<K>> {
        let resource = resource_of::<K>();
        let api = self.api(&resource, namespace);
        let mut params = ListParams::default();
        if let Some(selector) = selector {
            params = params.labels(selector);
        }
        let context = format!("{} list in {}", resource.kind, namespace.unwrap_or("<all>"));
        let list = self.bounded(&context, api.list(&params)).await?;
        list.items
            .into_iter()
            .map(|obj| from_dynamic(obj, &resource))
            .collect()
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K> {
        let resource = resource_of::<K>();
        let key = ObjectKey::from_resource(obj);
        let api = self.api(&resource, key.namespace.as_deref());
        let payload = to_dynamic(obj)?;
        let context = describe(&resource, &key);
        debug!(kind = %resource.kind, key = %key, "Creating object");
        let created = self
            .bounded(&context, api.create(&PostParams::default(), &payload))
            .await?;
        from_dynamic(created, &resource)
    }

    async fn update<K: StoreObject>(&self, obj: &K) -> Result<K> {
        let resource = resource_of::<K>();
        let key = ObjectKey::from_resource(obj);
        if obj.resource_version().is_none() {
            return Err(Error::InvalidInput(format!(
                "{}: update requires a resourceVersion",
                describe(&resource, &key)
            )));
        }
        let api = self.api(&resource, key.namespace.as_deref());
        let payload = to_dynamic(obj)?;
        let context = describe(&resource, &key);
        debug!(kind = %resource.kind, key = %key, "Replacing object");
        let updated = self
            .bounded(
                &context,
                api.replace(&key.name, &PostParams::default(), &payload),
            )
            .await?;
        from_dynamic(updated, &resource)
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K> {
        let resource = resource_of::<K>();
        let key = ObjectKey::from_resource(obj);
        let Some(resource_version) = obj.resource_version() else {
            return Err(Error::InvalidInput(format!(
                "{}: status update requires a resourceVersion",
                describe(&resource, &key)
            )));
        };
        let status = serde_json::to_value(obj)?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        // resourceVersion in a merge patch turns it into a compare-and-write
        let patch = json!({
            "metadata": { "resourceVersion": resource_version },
            "status": status,
        });
        let api = self.api(&resource, key.namespace.as_deref());
        let context = describe(&resource, &key);
        debug!(kind = %resource.kind, key = %key, "Patching status");
        let updated = self
            .bounded(
                &context,
                api.patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch)),
            )
            .await?;
        from_dynamic(updated, &resource)
    }

    async fn delete<K: StoreObject>(&self, key: &ObjectKey) -> Result<()> {
        let resource = resource_of::<K>();
        let api = self.api(&resource, key.namespace.as_deref());
        let context = describe(&resource, key);
        debug!(kind = %resource.kind, key = %key, "Deleting object");
        self.bounded(&context, api.delete(&key.name, &DeleteParams::background()))
            .await?;
        Ok(())
    }

    fn watch<K: StoreObject>(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> BoxStream<'static, Result<WatchEvent<K>>> {
        let resource = resource_of::<K>();
        let api = self.api(&resource, namespace);
        let mut config = watcher::Config::default();
        if let Some(selector) = selector {
            config = config.labels(selector);
        }
        let kind = resource.kind.clone();

        watcher::watcher(api, config)
            .default_backoff()
            .map_err(move |err| {
                warn!(kind = %kind, error = %err, "Watch stream error, backing off");
                Error::Transient(format!("watch {kind}: {err}"))
            })
            .filter_map(move |event| {
                let resource = resource.clone();
                async move {
                    let (event_type, obj) = match event {
                        Ok(Event::Apply(obj) | Event::InitApply(obj)) => {
                            (WatchEventType::Applied, obj)
                        }
                        Ok(Event::Delete(obj)) => (WatchEventType::Deleted, obj),
                        Ok(Event::Init | Event::InitDone) => return None,
                        Err(err) => return Some(Err(err)),
                    };
                    Some(
                        from_dynamic(obj, &resource)
                            .map(|object| WatchEvent { event_type, object }),
                    )
                }
            })
            .boxed()
    }
}

/// [`Impersonator`] that clones the operator's client configuration and sets
/// the impersonated user on it.
#[derive(Clone)]
pub struct KubeImpersonator {
    config: Config,
    request_timeout: Duration,
}

impl KubeImpersonator {
    /// Build from the operator's own client configuration.
    #[must_use]
    pub fn new(config: Config, request_timeout: Duration) -> Self {
        Self {
            config,
            request_timeout,
        }
    }
}

impl Impersonator for KubeImpersonator {
    type Store = KubeStore;

    fn impersonate(&self, principal: &str) -> Result<KubeStore> {
        if principal.trim().is_empty() {
            return Err(Error::InvalidInput(
                "cannot impersonate an empty principal".to_string(),
            ));
        }
        let mut config = self.config.clone();
        config.auth_info.impersonate = Some(principal.to_string());
        let client = Client::try_from(config).map_err(|err| {
            Error::Internal(format!("building client impersonating {principal}: {err}"))
        })?;
        Ok(KubeStore::new(client, self.request_timeout))
    }
}

#[cfg(test)]
#[path = "kubernetes_tests.rs"]
mod kubernetes_tests;
