// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controller.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::{Error, Result};
    use crate::events::NoopEventRecorder;
    use crate::labels::{K8S_MANAGED_BY, MANAGED_BY_OPERATOR};
    use crate::store::{MemoryStore, ObjectKey};
    use crate::sync::{controller_reference, ObjectSyncer, SyncOutcome, SyncReport, Syncer};
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{ConfigMap, Secret};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    /// What the fake syncer does on each call.
    #[derive(Clone, Copy)]
    enum Behavior {
        /// Sleep, then succeed
        Slow,
        /// Fail transiently this many times, then succeed
        FlakyFor(usize),
        /// Always fail with a non-retryable error
        Broken,
    }

    #[derive(Default)]
    struct Stats {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    struct FakeSyncer {
        behavior: Behavior,
        stats: Arc<Stats>,
    }

    #[async_trait]
    impl Syncer<MemoryStore> for FakeSyncer {
        fn component(&self) -> &str {
            "fake"
        }

        async fn sync(&self, _store: &MemoryStore) -> SyncReport {
            let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let call = self.stats.calls.fetch_add(1, Ordering::SeqCst);

            let outcome = match self.behavior {
                Behavior::Slow => {
                    sleep(Duration::from_millis(40)).await;
                    SyncOutcome::Unchanged
                }
                Behavior::FlakyFor(n) if call < n => {
                    SyncOutcome::Failed(Error::Transient("flaky".to_string()))
                }
                Behavior::FlakyFor(_) => SyncOutcome::Unchanged,
                Behavior::Broken => {
                    SyncOutcome::Failed(Error::InvalidInput("broken".to_string()))
                }
            };

            self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
            SyncReport {
                component: "fake".to_string(),
                kind: "Secret".to_string(),
                key: ObjectKey::namespaced("default", "fake"),
                outcome,
            }
        }
    }

    struct FakeReconciler {
        behavior: Behavior,
        stats: Arc<Stats>,
    }

    impl Reconciler<MemoryStore> for FakeReconciler {
        type Parent = ConfigMap;
        type Tenant = ();

        fn kind(&self) -> &'static str {
            "Fake"
        }

        fn namespaced(&self) -> bool {
            true
        }

        fn matches(&self, _: &ConfigMap) -> bool {
            true
        }

        fn validate(&self, _: ConfigMap) -> Result<()> {
            Ok(())
        }

        fn syncers(&self, _: &()) -> Vec<Box<dyn Syncer<MemoryStore>>> {
            vec![Box::new(FakeSyncer {
                behavior: self.behavior,
                stats: Arc::clone(&self.stats),
            })]
        }
    }

    /// Derives `<name>-derived`, a managed secret, from each ConfigMap.
    struct DerivingReconciler;

    struct Derived {
        key: ObjectKey,
        owner: OwnerReference,
    }

    impl Reconciler<MemoryStore> for DerivingReconciler {
        type Parent = ConfigMap;
        type Tenant = Derived;

        fn kind(&self) -> &'static str {
            "Deriving"
        }

        fn namespaced(&self) -> bool {
            true
        }

        fn matches(&self, _: &ConfigMap) -> bool {
            true
        }

        fn validate(&self, parent: ConfigMap) -> Result<Derived> {
            let namespace = parent.metadata.namespace.clone().unwrap_or_default();
            let name = parent.metadata.name.clone().unwrap_or_default();
            Ok(Derived {
                key: ObjectKey::namespaced(&namespace, &format!("{name}-derived")),
                owner: controller_reference(&parent)?,
            })
        }

        fn syncers(&self, tenant: &Derived) -> Vec<Box<dyn Syncer<MemoryStore>>> {
            vec![Box::new(ObjectSyncer::new(
                "derived",
                tenant.key.clone(),
                tenant.owner.clone(),
                |secret: &mut Secret| {
                    secret
                        .metadata
                        .labels
                        .get_or_insert_with(BTreeMap::new)
                        .insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_OPERATOR.to_string());
                    secret.type_ = Some("Opaque".to_string());
                    Ok(())
                },
            ))]
        }
    }

    fn fast_config(workers: usize, max_retries: u32) -> ControllerConfig {
        ControllerConfig {
            workers,
            queue: QueueConfig {
                debounce: Duration::from_millis(10),
                max_retries,
                initial_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(20),
            },
        }
    }

    fn config_map(name: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("value".to_string(), value.to_string())])),
            ..Default::default()
        }
    }

    fn context(store: &MemoryStore) -> Arc<Context<MemoryStore>> {
        Arc::new(Context::new(store.clone(), Arc::new(NoopEventRecorder)))
    }

    async fn eventually<F>(mut condition: F)
    where
        F: FnMut() -> bool,
    {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_one_pass_in_flight_per_key() {
        let store = MemoryStore::new();
        let stats = Arc::new(Stats::default());
        let (stop, shutdown) = watch::channel(false);
        let controller = Controller::new(
            FakeReconciler {
                behavior: Behavior::Slow,
                stats: Arc::clone(&stats),
            },
            context(&store),
            fast_config(4, 3),
            shutdown,
        );
        let task = tokio::spawn(controller.run());

        let created = store.create(&config_map("web", "0")).await.unwrap();
        eventually(|| stats.in_flight.load(Ordering::SeqCst) == 1).await;

        let mut current = created;
        for i in 1..6 {
            current.data = Some(BTreeMap::from([("value".to_string(), i.to_string())]));
            current = store.update(&current).await.unwrap();
        }

        eventually(|| stats.calls.load(Ordering::SeqCst) >= 2).await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(stats.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(stats.calls.load(Ordering::SeqCst) <= 3);

        stop.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_run_concurrently() {
        let store = MemoryStore::new();
        let stats = Arc::new(Stats::default());
        let (stop, shutdown) = watch::channel(false);
        for name in ["a", "b", "c"] {
            store.create(&config_map(name, "0")).await.unwrap();
        }
        let controller = Controller::new(
            FakeReconciler {
                behavior: Behavior::Slow,
                stats: Arc::clone(&stats),
            },
            context(&store),
            fast_config(3, 3),
            shutdown,
        );
        let task = tokio::spawn(controller.run());

        eventually(|| stats.calls.load(Ordering::SeqCst) >= 3).await;
        assert!(stats.max_in_flight.load(Ordering::SeqCst) >= 2);

        stop.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = MemoryStore::new();
        let stats = Arc::new(Stats::default());
        let (stop, shutdown) = watch::channel(false);
        store.create(&config_map("web", "0")).await.unwrap();
        let controller = Controller::new(
            FakeReconciler {
                behavior: Behavior::FlakyFor(2),
                stats: Arc::clone(&stats),
            },
            context(&store),
            fast_config(1, 5),
            shutdown,
        );
        let queue = controller.queue();
        let task = tokio::spawn(controller.run());

        eventually(|| stats.calls.load(Ordering::SeqCst) >= 3).await;
        eventually(|| queue.failures(&ObjectKey::namespaced("default", "web")) == 0).await;

        stop.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_retries_stop_at_the_limit() {
        let store = MemoryStore::new();
        let stats = Arc::new(Stats::default());
        let (stop, shutdown) = watch::channel(false);
        store.create(&config_map("web", "0")).await.unwrap();
        let controller = Controller::new(
            FakeReconciler {
                behavior: Behavior::FlakyFor(usize::MAX),
                stats: Arc::clone(&stats),
            },
            context(&store),
            fast_config(1, 2),
            shutdown,
        );
        let task = tokio::spawn(controller.run());

        // First pass plus two retries.
        eventually(|| stats.calls.load(Ordering::SeqCst) >= 3).await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(stats.calls.load(Ordering::SeqCst), 3);

        stop.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let store = MemoryStore::new();
        let stats = Arc::new(Stats::default());
        let (stop, shutdown) = watch::channel(false);
        store.create(&config_map("web", "0")).await.unwrap();
        let controller = Controller::new(
            FakeReconciler {
                behavior: Behavior::Broken,
                stats: Arc::clone(&stats),
            },
            context(&store),
            fast_config(1, 5),
            shutdown,
        );
        let task = tokio::spawn(controller.run());

        eventually(|| stats.calls.load(Ordering::SeqCst) >= 1).await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(stats.calls.load(Ordering::SeqCst), 1);

        stop.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_deleted_derived_object_is_recreated() {
        let store = MemoryStore::new();
        let (stop, shutdown) = watch::channel(false);
        let controller = Controller::new(
            DerivingReconciler,
            context(&store),
            fast_config(2, 3),
            shutdown,
        )
        .owns::<Secret>();
        let task = tokio::spawn(controller.run());

        store.create(&config_map("web", "0")).await.unwrap();
        let derived = ObjectKey::namespaced("default", "web-derived");

        let reader = store.clone();
        let exists = move || {
            let reader = reader.clone();
            let key = derived.clone();
            async move { reader.get::<Secret>(&key).await.is_ok() }
        };

        timeout(Duration::from_secs(5), async {
            while !exists().await {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        let first_uid = store
            .get::<Secret>(&ObjectKey::namespaced("default", "web-derived"))
            .await
            .unwrap()
            .metadata
            .uid;

        store
            .delete::<Secret>(&ObjectKey::namespaced("default", "web-derived"))
            .await
            .unwrap();

        timeout(Duration::from_secs(5), async {
            while !exists().await {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        let second_uid = store
            .get::<Secret>(&ObjectKey::namespaced("default", "web-derived"))
            .await
            .unwrap()
            .metadata
            .uid;
        assert_ne!(first_uid, second_uid);

        stop.send(true).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_closed_shutdown_channel_stops_controller() {
        let store = MemoryStore::new();
        let (stop, shutdown) = watch::channel(false);
        let controller = Controller::new(
            DerivingReconciler,
            context(&store),
            fast_config(1, 3),
            shutdown,
        );
        let task = tokio::spawn(controller.run());
        drop(stop);
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
}
