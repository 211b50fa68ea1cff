// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-state transforms for derived objects.
//!
//! Each function mutates an object fetched from the store (or a default
//! placeholder) toward its desired state, in place. Fields the operator does
//! not own, such as values defaulted by the API server or labels added by
//! other tools, are left as they are, so converged objects compare equal and
//! no write is issued.
//!
//! Generated values (role binding subjects, credentials) are filled only when
//! absent and never regenerated.

use crate::constants::{
    DEFAULT_SITE_IMAGE, DEFAULT_SITE_REPLICAS, PROJECT_DEFAULT_CPU_LIMIT,
    PROJECT_DEFAULT_CPU_REQUEST, PROJECT_DEFAULT_MEMORY_LIMIT, PROJECT_DEFAULT_MEMORY_REQUEST,
    PROJECT_QUOTA_CPU, PROJECT_QUOTA_MEMORY, PROJECT_QUOTA_PODS, RBAC_API_GROUP,
    SITE_CONTAINER_NAME, SITE_CREDENTIAL_KEYS, SITE_CREDENTIAL_LENGTH, SITE_HTTP_PORT,
};
use crate::crd::SiteSpec;
use crate::sync::component::apply_labels;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, LimitRange, LimitRangeItem, LimitRangeSpec,
    ResourceQuota, Secret, SecretKeySelector, Service, ServicePort,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, ServiceBackendPort,
};
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::ByteString;
use kube::Resource;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;

/// Name of the HTTP port on site containers and services.
pub const HTTP_PORT_NAME: &str = "http";

fn quantities(pairs: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Quantity((*v).to_string())))
        .collect()
}

fn labelled<K: Resource>(obj: &mut K, labels: &BTreeMap<String, String>) {
    apply_labels(&mut obj.meta_mut().labels, labels);
}

// ============================================================================
// RBAC
// ============================================================================

fn cluster_role_ref(role: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: "ClusterRole".to_string(),
        name: role.to_string(),
    }
}

/// A `User` subject for `principal`.
#[must_use]
pub fn user_subject(principal: &str) -> Subject {
    Subject {
        api_group: Some(RBAC_API_GROUP.to_string()),
        kind: "User".to_string(),
        name: principal.to_string(),
        namespace: None,
    }
}

/// Owners binding: grants `role`, seeded once with `creator` as the only
/// subject. Subjects edited later are kept.
pub fn owners_role_binding(
    binding: &mut RoleBinding,
    labels: &BTreeMap<String, String>,
    role: &str,
    creator: &str,
) {
    labelled(binding, labels);
    binding.role_ref = cluster_role_ref(role);
    if binding.subjects.as_ref().is_none_or(Vec::is_empty) {
        binding.subjects = Some(vec![user_subject(creator)]);
    }
}

/// Members binding: grants `role`, subjects are managed by people.
pub fn members_role_binding(
    binding: &mut RoleBinding,
    labels: &BTreeMap<String, String>,
    role: &str,
) {
    labelled(binding, labels);
    binding.role_ref = cluster_role_ref(role);
}

// ============================================================================
// Project policy
// ============================================================================

/// Default container requests and limits for a project namespace.
pub fn project_limit_range(limit_range: &mut LimitRange, labels: &BTreeMap<String, String>) {
    labelled(limit_range, labels);
    limit_range.spec = Some(LimitRangeSpec {
        limits: vec![LimitRangeItem {
            type_: "Container".to_string(),
            default: Some(quantities(&[
                ("cpu", PROJECT_DEFAULT_CPU_LIMIT),
                ("memory", PROJECT_DEFAULT_MEMORY_LIMIT),
            ])),
            default_request: Some(quantities(&[
                ("cpu", PROJECT_DEFAULT_CPU_REQUEST),
                ("memory", PROJECT_DEFAULT_MEMORY_REQUEST),
            ])),
            ..Default::default()
        }],
    });
}

/// Hard resource caps for a project namespace.
pub fn project_resource_quota(quota: &mut ResourceQuota, labels: &BTreeMap<String, String>) {
    labelled(quota, labels);
    quota.spec.get_or_insert_with(Default::default).hard = Some(quantities(&[
        ("pods", PROJECT_QUOTA_PODS),
        ("requests.cpu", PROJECT_QUOTA_CPU),
        ("requests.memory", PROJECT_QUOTA_MEMORY),
    ]));
}

// ============================================================================
// Site workload
// ============================================================================

fn random_credential() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SITE_CREDENTIAL_LENGTH)
        .map(char::from)
        .collect()
}

/// Site credentials. Each key is generated once and kept afterwards.
pub fn site_credentials(secret: &mut Secret, labels: &BTreeMap<String, String>) {
    labelled(secret, labels);
    secret.type_ = Some("Opaque".to_string());
    let data = secret.data.get_or_insert_with(BTreeMap::new);
    for key in SITE_CREDENTIAL_KEYS {
        let present = data.get(*key).is_some_and(|value| !value.0.is_empty());
        if !present {
            data.insert(
                (*key).to_string(),
                ByteString(random_credential().into_bytes()),
            );
        }
    }
}

/// Site web deployment. Credentials are read from `secret_name` through
/// environment variables.
pub fn site_deployment(
    deployment: &mut Deployment,
    labels: &BTreeMap<String, String>,
    selector: &BTreeMap<String, String>,
    site: &SiteSpec,
    secret_name: &str,
) {
    labelled(deployment, labels);

    let mut pod_labels = labels.clone();
    pod_labels.extend(selector.clone());

    let spec = deployment.spec.get_or_insert_with(Default::default);
    spec.replicas = Some(site.replicas.unwrap_or(DEFAULT_SITE_REPLICAS));
    spec.selector = LabelSelector {
        match_labels: Some(selector.clone()),
        ..Default::default()
    };

    let template = &mut spec.template;
    apply_labels(
        &mut template.metadata.get_or_insert_with(Default::default).labels,
        &pod_labels,
    );

    let containers = &mut template.spec.get_or_insert_with(Default::default).containers;
    let index = match containers.iter().position(|c| c.name == SITE_CONTAINER_NAME) {
        Some(index) => index,
        None => {
            containers.push(Container {
                name: SITE_CONTAINER_NAME.to_string(),
                ..Default::default()
            });
            containers.len() - 1
        }
    };
    let container = &mut containers[index];
    container.image = Some(
        site.image
            .clone()
            .unwrap_or_else(|| DEFAULT_SITE_IMAGE.to_string()),
    );
    container.ports = Some(vec![ContainerPort {
        name: Some(HTTP_PORT_NAME.to_string()),
        container_port: SITE_HTTP_PORT,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }]);
    container.env = Some(
        SITE_CREDENTIAL_KEYS
            .iter()
            .map(|key| EnvVar {
                name: (*key).to_string(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: secret_name.to_string(),
                        key: (*key).to_string(),
                        optional: Some(false),
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
    );
}

/// Site web service in front of the deployment's pods.
pub fn site_service(
    service: &mut Service,
    labels: &BTreeMap<String, String>,
    selector: &BTreeMap<String, String>,
) {
    labelled(service, labels);
    let spec = service.spec.get_or_insert_with(Default::default);
    spec.type_ = Some("ClusterIP".to_string());
    spec.selector = Some(selector.clone());
    spec.ports = Some(vec![ServicePort {
        name: Some(HTTP_PORT_NAME.to_string()),
        port: SITE_HTTP_PORT,
        target_port: Some(IntOrString::String(HTTP_PORT_NAME.to_string())),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }]);
}

/// Site ingress: one rule per domain, all routed to `service_name`.
pub fn site_ingress(
    ingress: &mut Ingress,
    labels: &BTreeMap<String, String>,
    service_name: &str,
    domains: &[String],
) {
    labelled(ingress, labels);
    let rules = domains
        .iter()
        .map(|host| IngressRule {
            host: Some(host.clone()),
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path: Some("/".to_string()),
                    path_type: "Prefix".to_string(),
                    backend: IngressBackend {
                        service: Some(IngressServiceBackend {
                            name: service_name.to_string(),
                            port: Some(ServiceBackendPort {
                                name: Some(HTTP_PORT_NAME.to_string()),
                                number: None,
                            }),
                        }),
                        resource: None,
                    },
                }],
            }),
        })
        .collect();
    ingress.spec.get_or_insert_with(Default::default).rules = Some(rules);
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
