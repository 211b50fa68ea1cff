// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and tenant-specific labels/annotations
//! to ensure consistency across all resources created by the operator, plus the
//! [`Lineage`] value that turns a tenant's identity into its label set.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "web", "credentials")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application (e.g., "wordpress")
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

// ============================================================================
// Tenant Lineage Labels
// ============================================================================

/// Label carrying the organization slug
pub const TENANT_ORGANIZATION_LABEL: &str = "tenancy.dev/organization";

/// Label carrying the project slug
pub const TENANT_PROJECT_LABEL: &str = "tenancy.dev/project";

/// Label carrying the site slug
pub const TENANT_SITE_LABEL: &str = "tenancy.dev/site";

/// Label discriminating the parent kind (`organization`, `project`, `site`)
pub const TENANT_KIND_LABEL: &str = "tenancy.dev/kind";

// ============================================================================
// Tenant Kind Label Values
// ============================================================================

/// `tenancy.dev/kind` value for organization namespaces
pub const KIND_ORGANIZATION_VALUE: &str = "organization";

/// `tenancy.dev/kind` value for project namespaces
pub const KIND_PROJECT_VALUE: &str = "project";

/// `tenancy.dev/kind` value for sites
pub const KIND_SITE_VALUE: &str = "site";

// ============================================================================
// Annotations
// ============================================================================

/// Annotation recording the principal that created the tenant
pub const CREATED_BY_ANNOTATION: &str = "tenancy.dev/created-by";

/// Annotation carrying the mutable human-readable name
pub const DISPLAY_NAME_ANNOTATION: &str = "tenancy.dev/display-name";

// ============================================================================
// Managed-By
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on every derived object
pub const MANAGED_BY_OPERATOR: &str = crate::constants::OPERATOR_NAME;

/// Label selector matching every object this operator manages
pub const MANAGED_BY_SELECTOR: &str = "app.kubernetes.io/managed-by=tenant-operator";

/// Tenant lineage: the chain of slugs identifying where a resource lives.
///
/// Lineage labels are written once when a tenant is created and never change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lineage {
    /// Organization slug
    pub organization: String,
    /// Project slug, for projects and sites
    pub project: Option<String>,
    /// Site slug, for sites
    pub site: Option<String>,
}

impl Lineage {
    /// Lineage of an organization.
    #[must_use]
    pub fn organization(organization: &str) -> Self {
        Self {
            organization: organization.to_string(),
            project: None,
            site: None,
        }
    }

    /// Lineage of a project within an organization.
    #[must_use]
    pub fn project(organization: &str, project: &str) -> Self {
        Self {
            organization: organization.to_string(),
            project: Some(project.to_string()),
            site: None,
        }
    }

    /// Lineage of a site within a project.
    #[must_use]
    pub fn site(organization: &str, project: &str, site: &str) -> Self {
        Self {
            organization: organization.to_string(),
            project: Some(project.to_string()),
            site: Some(site.to_string()),
        }
    }

    /// The lineage labels (`organization`, and `project`/`site` when set).
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(
            TENANT_ORGANIZATION_LABEL.to_string(),
            self.organization.clone(),
        );
        if let Some(project) = &self.project {
            labels.insert(TENANT_PROJECT_LABEL.to_string(), project.clone());
        }
        if let Some(site) = &self.site {
            labels.insert(TENANT_SITE_LABEL.to_string(), site.clone());
        }
        labels
    }

    /// Equality selector over the lineage labels, e.g. `tenancy.dev/organization=acme`.
    #[must_use]
    pub fn selector(&self) -> String {
        crate::selector::format_selector(&self.labels())
    }
}
