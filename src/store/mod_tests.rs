// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the store module

#[cfg(test)]
mod tests {
    use super::super::*;
    use k8s_openapi::api::core::v1::{Namespace, Secret};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_object_key_display() {
        assert_eq!(
            ObjectKey::namespaced("proj-acme", "blog-web").to_string(),
            "proj-acme/blog-web"
        );
        assert_eq!(ObjectKey::cluster("org-wonder").to_string(), "org-wonder");
    }

    #[test]
    fn test_object_key_from_resource() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("blog-credentials".to_string()),
                namespace: Some("proj-acme".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            ObjectKey::from_resource(&secret),
            ObjectKey::namespaced("proj-acme", "blog-credentials")
        );

        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some("proj-acme".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            ObjectKey::from_resource(&ns),
            ObjectKey::cluster("proj-acme")
        );
    }

    #[test]
    fn test_watch_event_key() {
        let event = WatchEvent {
            event_type: WatchEventType::Deleted,
            object: Namespace {
                metadata: ObjectMeta {
                    name: Some("org-wonder".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
        };
        assert_eq!(event.key(), ObjectKey::cluster("org-wonder"));
    }
}
