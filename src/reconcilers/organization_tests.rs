// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `organization.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::Error;
    use crate::events::CollectingEventRecorder;
    use crate::reconcilers::{reconcile, Context, ReconcileOutcome};
    use crate::store::{MemoryStore, ObjectKey};
    use crate::sync::SyncOutcome;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn org_namespace(name: &str, slug: &str, created_by: Option<&str>) -> Namespace {
        let mut annotations = BTreeMap::new();
        if let Some(principal) = created_by {
            annotations.insert(CREATED_BY_ANNOTATION.to_string(), principal.to_string());
        }
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                uid: Some("uid-org".to_string()),
                labels: Some(BTreeMap::from([
                    (TENANT_KIND_LABEL.to_string(), KIND_ORGANIZATION_VALUE.to_string()),
                    (TENANT_ORGANIZATION_LABEL.to_string(), slug.to_string()),
                ])),
                annotations: Some(annotations),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_from_namespace_valid() {
        let org = Organization::from_namespace(org_namespace("org-wonder", "wonder", Some("alice")))
            .unwrap();
        assert_eq!(org.slug(), "wonder");
        assert_eq!(org.namespace_name(), "org-wonder");
        assert_eq!(org.created_by(), "alice");
        assert_eq!(org.owner().kind, "Namespace");
        assert_eq!(org.owner().controller, Some(true));
    }

    #[test]
    fn test_from_namespace_rejects_missing_creator() {
        let err =
            Organization::from_namespace(org_namespace("org-wonder", "wonder", None)).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata(_)));
    }

    #[test]
    fn test_from_namespace_rejects_mismatched_name() {
        let err = Organization::from_namespace(org_namespace("org-other", "wonder", Some("alice")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata(_)));
    }

    #[test]
    fn test_matches_only_organizations() {
        let reconciler = OrganizationReconciler;
        let org = org_namespace("org-wonder", "wonder", Some("alice"));
        assert!(Reconciler::<MemoryStore>::matches(&reconciler, &org));

        let mut project = org.clone();
        project
            .metadata
            .labels
            .as_mut()
            .unwrap()
            .insert(TENANT_KIND_LABEL.to_string(), "project".to_string());
        assert!(!Reconciler::<MemoryStore>::matches(&reconciler, &project));
    }

    #[tokio::test]
    async fn test_reconcile_creates_role_bindings_then_converges() {
        let store = MemoryStore::new();
        let recorder = Arc::new(CollectingEventRecorder::new());
        let ctx = Context::new(store.clone(), recorder.clone());
        let mut ns = org_namespace("org-wonder", "wonder", Some("alice"));
        ns.metadata.uid = None;
        store.create(&ns).await.unwrap();
        let key = ObjectKey::cluster("org-wonder");

        let first = reconcile(&OrganizationReconciler, &ctx, &key).await.unwrap();
        let ReconcileOutcome::Synced(reports) = first else {
            panic!("expected a synced pass");
        };
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome == SyncOutcome::Created));

        let owners: RoleBinding = store
            .get(&ObjectKey::namespaced("org-wonder", "owners"))
            .await
            .unwrap();
        assert_eq!(owners.role_ref.name, CLUSTER_ROLE_ORGANIZATION_OWNER);
        assert_eq!(owners.subjects.unwrap()[0].name, "alice");
        assert_eq!(
            owners.metadata.labels.unwrap()[TENANT_ORGANIZATION_LABEL],
            "wonder"
        );

        let writes = store.writes();
        let second = reconcile(&OrganizationReconciler, &ctx, &key).await.unwrap();
        let ReconcileOutcome::Synced(reports) = second else {
            panic!("expected a synced pass");
        };
        assert!(reports.iter().all(|r| r.outcome == SyncOutcome::Unchanged));
        assert_eq!(store.writes(), writes);
        assert_eq!(recorder.events_for("org-wonder").len(), 4);
    }
}
