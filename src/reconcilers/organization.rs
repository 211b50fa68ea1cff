// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Organization reconciler.
//!
//! An organization is a `Namespace` named `org-<slug>` labeled
//! `tenancy.dev/kind=organization`. Inside it the operator keeps two role
//! bindings:
//!
//! - `owners` - the organization owner role, seeded with the creator
//! - `members` - the organization member role, subjects managed by owners

use super::resources::{members_role_binding, owners_role_binding};
use super::validation::{
    annotation, label, require, require_match, ORGANIZATION_REQUIRED_LABELS, REQUIRED_ANNOTATIONS,
};
use super::Reconciler;
use crate::constants::{
    CLUSTER_ROLE_ORGANIZATION_MEMBER, CLUSTER_ROLE_ORGANIZATION_OWNER, KIND_ORGANIZATION,
};
use crate::dispatch::{ControllerTask, Manager};
use crate::errors::Result;
use crate::labels::{
    Lineage, CREATED_BY_ANNOTATION, KIND_ORGANIZATION_VALUE, TENANT_KIND_LABEL,
    TENANT_ORGANIZATION_LABEL,
};
use crate::names::organization_namespace;
use crate::store::ObjectStore;
use crate::sync::{controller_reference, Component, ObjectSyncer, Syncer};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::RoleBinding;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;

/// Selector matching organization namespaces.
pub const ORGANIZATION_SELECTOR: &str = "tenancy.dev/kind=organization";

/// Role binding granting the organization owner role.
pub const OWNERS: Component = Component::new("owners", "organization", "owners");

/// Role binding granting the organization member role.
pub const MEMBERS: Component = Component::new("members", "organization", "members");

/// A validated organization namespace.
#[derive(Clone, Debug)]
pub struct Organization {
    namespace: Namespace,
    lineage: Lineage,
    owner: OwnerReference,
    created_by: String,
}

impl Organization {
    /// Validate an organization namespace.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::InvalidMetadata`] when required labels or the
    /// creator annotation are missing, or the namespace name disagrees with
    /// the organization label.
    pub fn from_namespace(namespace: Namespace) -> Result<Self> {
        let meta = &namespace.metadata;
        require(meta, ORGANIZATION_REQUIRED_LABELS, REQUIRED_ANNOTATIONS)?;
        require_match(
            meta,
            TENANT_KIND_LABEL,
            KIND_ORGANIZATION_VALUE,
            label(meta, TENANT_KIND_LABEL)?,
        )?;
        let slug = label(meta, TENANT_ORGANIZATION_LABEL)?.to_string();
        require_match(
            meta,
            "namespace name",
            &organization_namespace(&slug),
            &namespace.name_any(),
        )?;
        let created_by = annotation(meta, CREATED_BY_ANNOTATION)?.to_string();
        let owner = controller_reference(&namespace)?;

        Ok(Self {
            lineage: Lineage::organization(&slug),
            namespace,
            owner,
            created_by,
        })
    }

    /// Organization slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.lineage.organization
    }

    /// Name of the organization namespace.
    #[must_use]
    pub fn namespace_name(&self) -> String {
        self.namespace.name_any()
    }

    /// Lineage labels of everything in this organization.
    #[must_use]
    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    /// Principal that created the organization.
    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Owner reference derived objects point at.
    #[must_use]
    pub fn owner(&self) -> &OwnerReference {
        &self.owner
    }
}

/// Reconciler for organization namespaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrganizationReconciler;

impl<S: ObjectStore> Reconciler<S> for OrganizationReconciler {
    type Parent = Namespace;
    type Tenant = Organization;

    fn kind(&self) -> &'static str {
        KIND_ORGANIZATION
    }

    fn namespaced(&self) -> bool {
        false
    }

    fn parent_selector(&self) -> Option<&'static str> {
        Some(ORGANIZATION_SELECTOR)
    }

    fn matches(&self, parent: &Namespace) -> bool {
        parent.labels().get(TENANT_KIND_LABEL).map(String::as_str) == Some(KIND_ORGANIZATION_VALUE)
    }

    fn validate(&self, parent: Namespace) -> Result<Organization> {
        Organization::from_namespace(parent)
    }

    fn syncers(&self, org: &Organization) -> Vec<Box<dyn Syncer<S>>> {
        let namespace = org.namespace_name();

        let owners_labels = OWNERS.labels(org.lineage());
        let creator = org.created_by().to_string();
        let owners = ObjectSyncer::new(
            OWNERS.name,
            OWNERS.object_key(&namespace, org.slug()),
            org.owner().clone(),
            move |binding: &mut RoleBinding| {
                owners_role_binding(
                    binding,
                    &owners_labels,
                    CLUSTER_ROLE_ORGANIZATION_OWNER,
                    &creator,
                );
                Ok(())
            },
        );

        let members_labels = MEMBERS.labels(org.lineage());
        let members = ObjectSyncer::new(
            MEMBERS.name,
            MEMBERS.object_key(&namespace, org.slug()),
            org.owner().clone(),
            move |binding: &mut RoleBinding| {
                members_role_binding(binding, &members_labels, CLUSTER_ROLE_ORGANIZATION_MEMBER);
                Ok(())
            },
        );

        vec![Box::new(owners), Box::new(members)]
    }
}

/// Register the organization controller.
pub fn register<S: ObjectStore>(manager: &Manager<S>) -> ControllerTask {
    manager
        .controller(OrganizationReconciler)
        .owns::<RoleBinding>()
        .run()
}

#[cfg(test)]
#[path = "organization_tests.rs"]
mod organization_tests;
