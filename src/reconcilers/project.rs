// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Project reconciler.
//!
//! A project is a `Namespace` named `proj-<slug>` labeled
//! `tenancy.dev/kind=project`. Its derived objects, in order:
//!
//! 1. `default` `LimitRange` - container request/limit defaults
//! 2. `default` `ResourceQuota` - hard caps on pods, CPU and memory
//! 3. `owners` `RoleBinding` - the project owner role, seeded with the creator

use super::resources::{owners_role_binding, project_limit_range, project_resource_quota};
use super::validation::{
    annotation, label, require, require_match, PROJECT_REQUIRED_LABELS, REQUIRED_ANNOTATIONS,
};
use super::Reconciler;
use crate::constants::{CLUSTER_ROLE_PROJECT_OWNER, KIND_PROJECT};
use crate::dispatch::{ControllerTask, Manager};
use crate::errors::Result;
use crate::labels::{
    Lineage, CREATED_BY_ANNOTATION, KIND_PROJECT_VALUE, TENANT_KIND_LABEL,
    TENANT_ORGANIZATION_LABEL, TENANT_PROJECT_LABEL,
};
use crate::names::project_namespace;
use crate::store::ObjectStore;
use crate::sync::{controller_reference, Component, ObjectSyncer, Syncer};
use k8s_openapi::api::core::v1::{LimitRange, Namespace, ResourceQuota};
use k8s_openapi::api::rbac::v1::RoleBinding;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;

/// Selector matching project namespaces.
pub const PROJECT_SELECTOR: &str = "tenancy.dev/kind=project";

/// Container defaults for the project.
pub const LIMIT_RANGE: Component = Component::new("limits", "project", "default");

/// Resource caps for the project.
pub const RESOURCE_QUOTA: Component = Component::new("quota", "project", "default");

/// Role binding granting the project owner role.
pub const OWNERS: Component = Component::new("owners", "project", "owners");

/// A validated project namespace.
#[derive(Clone, Debug)]
pub struct Project {
    namespace: Namespace,
    lineage: Lineage,
    owner: OwnerReference,
    created_by: String,
}

impl Project {
    /// Validate a project namespace.
    ///
    /// # Errors
    ///
    /// [`crate::errors::Error::InvalidMetadata`] when required metadata is
    /// missing or the namespace name disagrees with the project label.
    pub fn from_namespace(namespace: Namespace) -> Result<Self> {
        let meta = &namespace.metadata;
        require(meta, PROJECT_REQUIRED_LABELS, REQUIRED_ANNOTATIONS)?;
        require_match(
            meta,
            TENANT_KIND_LABEL,
            KIND_PROJECT_VALUE,
            label(meta, TENANT_KIND_LABEL)?,
        )?;
        let organization = label(meta, TENANT_ORGANIZATION_LABEL)?;
        let slug = label(meta, TENANT_PROJECT_LABEL)?;
        require_match(
            meta,
            "namespace name",
            &project_namespace(slug),
            &namespace.name_any(),
        )?;
        let lineage = Lineage::project(organization, slug);
        let created_by = annotation(meta, CREATED_BY_ANNOTATION)?.to_string();
        let owner = controller_reference(&namespace)?;

        Ok(Self {
            namespace,
            lineage,
            owner,
            created_by,
        })
    }

    /// Project slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.lineage.project.as_deref().unwrap_or_default()
    }

    /// Owning organization slug.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.lineage.organization
    }

    /// Name of the project namespace.
    #[must_use]
    pub fn namespace_name(&self) -> String {
        self.namespace.name_any()
    }

    /// Lineage labels of everything in this project.
    #[must_use]
    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    /// Principal that created the project.
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

/// Reconciler for project namespaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectReconciler;

impl<S: ObjectStore> Reconciler<S> for ProjectReconciler {
    type Parent = Namespace;
    type Tenant = Project;

    fn kind(&self) -> &'static str {
        KIND_PROJECT
    }

    fn namespaced(&self) -> bool {
        false
    }

    fn parent_selector(&self) -> Option<&'static str> {
        Some(PROJECT_SELECTOR)
    }

    fn matches(&self, parent: &Namespace) -> bool {
        parent.labels().get(TENANT_KIND_LABEL).map(String::as_str) == Some(KIND_PROJECT_VALUE)
    }

    fn validate(&self, parent: Namespace) -> Result<Project> {
        Project::from_namespace(parent)
    }

    fn syncers(&self, project: &Project) -> Vec<Box<dyn Syncer<S>>> {
        let namespace = project.namespace_name();
        let slug = project.slug();

        let limits_labels = LIMIT_RANGE.labels(project.lineage());
        let limits = ObjectSyncer::new(
            LIMIT_RANGE.name,
            LIMIT_RANGE.object_key(&namespace, slug),
            project.owner().clone(),
            move |limit_range: &mut LimitRange| {
                project_limit_range(limit_range, &limits_labels);
                Ok(())
            },
        );

        let quota_labels = RESOURCE_QUOTA.labels(project.lineage());
        let quota = ObjectSyncer::new(
            RESOURCE_QUOTA.name,
            RESOURCE_QUOTA.object_key(&namespace, slug),
            project.owner().clone(),
            move |quota: &mut ResourceQuota| {
                project_resource_quota(quota, &quota_labels);
                Ok(())
            },
        );

        let owners_labels = OWNERS.labels(project.lineage());
        let creator = project.created_by().to_string();
        let owners = ObjectSyncer::new(
            OWNERS.name,
            OWNERS.object_key(&namespace, slug),
            project.owner().clone(),
            move |binding: &mut RoleBinding| {
                owners_role_binding(binding, &owners_labels, CLUSTER_ROLE_PROJECT_OWNER, &creator);
                Ok(())
            },
        );

        vec![Box::new(limits), Box::new(quota), Box::new(owners)]
    }
}

/// Register the project controller.
pub fn register<S: ObjectStore>(manager: &Manager<S>) -> ControllerTask {
    manager
        .controller(ProjectReconciler)
        .owns::<LimitRange>()
        .owns::<ResourceQuota>()
        .owns::<RoleBinding>()
        .run()
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod project_tests;
