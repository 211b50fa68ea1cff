// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `project.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::Error;
    use crate::events::NoopEventRecorder;
    use crate::labels::{K8S_COMPONENT, K8S_MANAGED_BY};
    use crate::reconcilers::{reconcile, Context, ReconcileOutcome};
    use crate::store::{MemoryStore, ObjectKey};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn project_namespace_object(name: &str, project: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([
                    (TENANT_KIND_LABEL.to_string(), KIND_PROJECT_VALUE.to_string()),
                    (TENANT_ORGANIZATION_LABEL.to_string(), "wonder".to_string()),
                    (TENANT_PROJECT_LABEL.to_string(), project.to_string()),
                ])),
                annotations: Some(BTreeMap::from([(
                    CREATED_BY_ANNOTATION.to_string(),
                    "alice".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_from_namespace_requires_uid() {
        let err = Project::from_namespace(project_namespace_object("proj-acme", "acme")).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata(_)));
    }

    #[test]
    fn test_from_namespace_rejects_wrong_kind() {
        let mut ns = project_namespace_object("proj-acme", "acme");
        ns.metadata.uid = Some("uid-1".to_string());
        ns.metadata
            .labels
            .as_mut()
            .unwrap()
            .insert(TENANT_KIND_LABEL.to_string(), "organization".to_string());
        assert!(Project::from_namespace(ns).is_err());
    }

    #[test]
    fn test_from_namespace_valid() {
        let mut ns = project_namespace_object("proj-acme", "acme");
        ns.metadata.uid = Some("uid-1".to_string());
        let project = Project::from_namespace(ns).unwrap();
        assert_eq!(project.slug(), "acme");
        assert_eq!(project.organization(), "wonder");
        assert_eq!(project.namespace_name(), "proj-acme");
        assert_eq!(project.created_by(), "alice");
    }

    #[tokio::test]
    async fn test_reconcile_creates_policy_objects_in_order() {
        let store = MemoryStore::new();
        let ctx = Context::new(store.clone(), Arc::new(NoopEventRecorder));
        store
            .create(&project_namespace_object("proj-acme", "acme"))
            .await
            .unwrap();

        let outcome = reconcile(&ProjectReconciler, &ctx, &ObjectKey::cluster("proj-acme"))
            .await
            .unwrap();
        let ReconcileOutcome::Synced(reports) = outcome else {
            panic!("expected a synced pass");
        };
        let kinds: Vec<&str> = reports.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["LimitRange", "ResourceQuota", "RoleBinding"]);

        let quota: ResourceQuota = store
            .get(&ObjectKey::namespaced("proj-acme", "default"))
            .await
            .unwrap();
        let labels = quota.metadata.labels.unwrap();
        assert_eq!(labels[K8S_MANAGED_BY], "tenant-operator");
        assert_eq!(labels[K8S_COMPONENT], "quota");
        assert_eq!(labels[TENANT_PROJECT_LABEL], "acme");
        assert_eq!(quota.metadata.owner_references.unwrap()[0].name, "proj-acme");
    }

    #[tokio::test]
    async fn test_invalid_project_is_skipped_without_writes() {
        let store = MemoryStore::new();
        let ctx = Context::new(store.clone(), Arc::new(NoopEventRecorder));
        let mut ns = project_namespace_object("proj-acme", "acme");
        ns.metadata.annotations = None;
        store.create(&ns).await.unwrap();
        let writes = store.writes();

        let outcome = reconcile(&ProjectReconciler, &ctx, &ObjectKey::cluster("proj-acme"))
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Invalid(_)));
        assert_eq!(store.writes(), writes);
    }
}
