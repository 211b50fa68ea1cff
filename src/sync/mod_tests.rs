// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the sync primitive

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::store::MemoryStore;
    use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    async fn parent(store: &MemoryStore) -> OwnerReference {
        let ns = store
            .create(&Namespace {
                metadata: ObjectMeta {
                    name: Some("proj-acme".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        controller_reference(&ns).unwrap()
    }

    fn key() -> ObjectKey {
        ObjectKey::namespaced("proj-acme", "settings")
    }

    fn set_value(value: &'static str) -> impl Fn(&mut ConfigMap) -> Result<()> + Send + Sync {
        move |cm: &mut ConfigMap| {
            cm.data
                .get_or_insert_with(BTreeMap::new)
                .insert("key".to_string(), value.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sync_creates_then_is_idempotent() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;
        let baseline = store.writes();

        let first = sync(&store, &owner, &key(), set_value("a")).await;
        assert_eq!(first, SyncOutcome::Created);
        let after_first: ConfigMap = store.get(&key()).await.unwrap();

        let second = sync(&store, &owner, &key(), set_value("a")).await;
        assert_eq!(second, SyncOutcome::Unchanged);
        assert_eq!(store.writes(), baseline + 1);

        let after_second: ConfigMap = store.get(&key()).await.unwrap();
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_sync_updates_then_unchanged() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;
        sync(&store, &owner, &key(), set_value("a")).await;

        assert_eq!(
            sync(&store, &owner, &key(), set_value("b")).await,
            SyncOutcome::Updated
        );
        assert_eq!(
            sync(&store, &owner, &key(), set_value("b")).await,
            SyncOutcome::Unchanged
        );

        let cm: ConfigMap = store.get(&key()).await.unwrap();
        assert_eq!(cm.data.unwrap()["key"], "b");
    }

    #[tokio::test]
    async fn test_sync_sets_identity_and_owner() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;

        // The transform cannot move the object elsewhere.
        sync(&store, &owner, &key(), |cm: &mut ConfigMap| {
            cm.metadata.name = Some("elsewhere".to_string());
            Ok(())
        })
        .await;

        let cm: ConfigMap = store.get(&key()).await.unwrap();
        let refs = cm.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, owner.uid);
        assert_eq!(refs[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_transform_error_writes_nothing() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;
        let baseline = store.writes();

        let outcome = sync(&store, &owner, &key(), |_: &mut ConfigMap| {
            Err(Error::InvalidInput("no domains".to_string()))
        })
        .await;

        assert!(matches!(outcome, SyncOutcome::Failed(Error::InvalidInput(_))));
        assert_eq!(store.writes(), baseline);
    }

    #[tokio::test]
    async fn test_fetch_error_is_propagated() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;
        store.inject_failure(Error::Transient("timeout".to_string()));

        let outcome = sync(&store, &owner, &key(), set_value("a")).await;
        assert!(matches!(outcome, SyncOutcome::Failed(Error::Transient(_))));
    }

    #[tokio::test]
    async fn test_foreign_controller_is_rejected() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;
        let mut other = owner.clone();
        other.uid = "someone-else".to_string();
        other.name = "proj-other".to_string();
        sync(&store, &other, &key(), set_value("a")).await;

        let outcome = sync(&store, &owner, &key(), set_value("a")).await;
        assert!(matches!(
            outcome,
            SyncOutcome::Failed(Error::InvalidMetadata(_))
        ));
    }

    #[tokio::test]
    async fn test_object_syncer_reports() {
        let store = MemoryStore::new();
        let owner = parent(&store).await;
        let syncer = ObjectSyncer::new("settings", key(), owner, set_value("a"));

        let report = Syncer::<MemoryStore>::sync(&syncer, &store).await;
        assert_eq!(report.kind, "ConfigMap");
        assert_eq!(report.component, "settings");
        assert_eq!(report.outcome, SyncOutcome::Created);
        assert_eq!(report.reason(), "Created");
        assert_eq!(report.event_kind(), EventKind::Normal);
        assert_eq!(
            report.message(),
            "ConfigMap proj-acme/settings (settings) created"
        );
    }

    #[test]
    fn test_failed_report_is_warning() {
        let report = SyncReport {
            component: "web".to_string(),
            kind: "Deployment".to_string(),
            key: ObjectKey::namespaced("proj-acme", "blog-web"),
            outcome: SyncOutcome::Failed(Error::Conflict("stale".to_string())),
        };
        assert_eq!(report.event_kind(), EventKind::Warning);
        assert_eq!(report.reason(), "SyncFailed");
        assert!(report.message().contains("conflict: stale"));
    }

    #[test]
    fn test_controller_reference_requires_uid() {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some("proj-acme".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            controller_reference(&ns),
            Err(Error::InvalidMetadata(_))
        ));
    }
}
