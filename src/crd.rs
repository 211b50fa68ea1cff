// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for hosted sites.
//!
//! Organizations and projects are plain `Namespace` objects carrying tenant
//! labels; only sites need a custom resource.
//!
//! # Example: A Site
//!
//! ```yaml
//! apiVersion: tenancy.dev/v1alpha1
//! kind: Site
//! metadata:
//!   name: blog
//!   namespace: proj-acme
//!   labels:
//!     tenancy.dev/kind: site
//!     tenancy.dev/organization: wonder
//!     tenancy.dev/project: acme
//!     tenancy.dev/site: blog
//!   annotations:
//!     tenancy.dev/created-by: alice@example.com
//!     tenancy.dev/display-name: Blog
//! spec:
//!   domains:
//!     - blog.example.com
//!   replicas: 2
//! ```
//!
//! ```rust
//! use tenant_operator::crd::{Site, SiteSpec};
//!
//! let site = Site::new(
//!     "blog",
//!     SiteSpec {
//!         domains: vec!["blog.example.com".to_string()],
//!         image: None,
//!         replicas: Some(2),
//!     },
//! );
//! assert_eq!(site.spec.replicas, Some(2));
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Sites report a single `Ready` condition.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `Site` status, written only by the site reconciler.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatus {
    /// Current conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// `metadata.generation` of the spec the conditions describe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// A hosted web site inside a project.
///
/// The site reconciler derives a credentials `Secret`, a web `Deployment`, a
/// `Service` and an `Ingress` with one rule per domain.
#[derive(
    CustomResource, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema,
)]
#[kube(
    group = "tenancy.dev",
    version = "v1alpha1",
    kind = "Site",
    namespaced,
    shortname = "site",
    doc = "Site is a hosted web application inside a project namespace. The operator keeps its credentials, deployment, service and ingress converged with this spec."
)]
#[kube(status = "SiteStatus")]
#[kube(derive = "PartialEq")]
#[kube(
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SiteSpec {
    /// Host names served by the site. One ingress rule is generated per domain.
    #[serde(default)]
    pub domains: Vec<String>,

    /// Container image. Defaults to the operator's stock web image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Number of web replicas. Defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
