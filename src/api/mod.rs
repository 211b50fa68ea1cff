// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Caller-facing tenant operations.
//!
//! [`TenantApi`] is the library surface a transport (RPC, HTTP) sits on. It
//! creates, reads, updates and deletes parent resources only; derived
//! objects are left to the reconcilers.
//!
//! Every call:
//!
//! - addresses tenants by FQN, resolved strictly (see [`crate::names`])
//! - runs against a store impersonating the caller, so the store's own
//!   access control applies
//! - treats the caller's organization as ambient: projects and sites outside
//!   it are reported as not found
//! - retries transient store failures, so callers only ever see a final
//!   outcome
//!
//! Failures map to caller-visible codes through [`status::map_error`].
//!
//! # Example
//!
//! ```rust
//! use tenant_operator::api::{CallerContext, NewOrganization, NewProject, TenantApi};
//! use tenant_operator::store::MemoryStore;
//!
//! # async fn example() -> tenant_operator::errors::Result<()> {
//! let api = TenantApi::new(MemoryStore::new());
//! let alice = CallerContext::new("alice", "orgs/wonder");
//!
//! api.create_organization(&alice, NewOrganization::named("orgs/wonder")).await?;
//! let project = api.create_project(&alice, NewProject::named("project/acme")).await?;
//! assert_eq!(project.name, "project/acme");
//! # Ok(())
//! # }
//! ```

pub mod status;

use crate::crd::{Site, SiteSpec};
use crate::errors::{Error, Result};
use crate::labels::{
    Lineage, CREATED_BY_ANNOTATION, DISPLAY_NAME_ANNOTATION, KIND_ORGANIZATION_VALUE,
    KIND_PROJECT_VALUE, KIND_SITE_VALUE, TENANT_KIND_LABEL, TENANT_ORGANIZATION_LABEL,
    TENANT_PROJECT_LABEL, TENANT_SITE_LABEL,
};
use crate::names::{
    generate_slug_name, organization_fq_name, organization_namespace, project_fq_name,
    project_namespace, resolve, resolve_organization, resolve_project, resolve_site,
    site_fq_name, TenantKind, TenantScope,
};
use crate::reconcilers::status::find_condition;
use crate::retry::retry_transient;
use crate::selector::format_selector;
use crate::status_reasons::CONDITION_TYPE_READY;
use crate::store::{Impersonator, ObjectKey, ObjectStore, StoreObject};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Who is calling, and under which organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerContext {
    /// Authenticated principal; store calls impersonate it
    pub principal: String,
    /// Ambient organization FQN, `orgs/<org>`
    pub organization: String,
}

impl CallerContext {
    /// Caller `principal` acting within `organization` (an `orgs/<org>` FQN).
    #[must_use]
    pub fn new(principal: &str, organization: &str) -> Self {
        Self {
            principal: principal.to_string(),
            organization: organization.to_string(),
        }
    }

    fn scope(&self) -> Result<TenantScope> {
        TenantScope::from_fq_name(&self.organization)
    }
}

/// An organization as callers see it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    /// `orgs/<org>`
    pub name: String,
    pub display_name: Option<String>,
    pub created_by: Option<String>,
    /// Deletion has been requested
    pub deleting: bool,
}

/// A project as callers see it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    /// `project/<project>`
    pub name: String,
    /// `orgs/<org>`
    pub organization: String,
    pub display_name: Option<String>,
    pub created_by: Option<String>,
    pub deleting: bool,
}

/// A site as callers see it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteView {
    /// `project/<project>/site/<site>`
    pub name: String,
    /// `project/<project>`
    pub project: String,
    pub display_name: Option<String>,
    pub created_by: Option<String>,
    pub spec: SiteSpec,
    /// Value of the `Ready` condition, once the site has been reconciled
    pub ready: Option<bool>,
    pub deleting: bool,
}

/// Request to create an organization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewOrganization {
    /// `orgs/<org>`, or empty to derive the name from `display_name`
    pub name: String,
    pub display_name: String,
}

impl NewOrganization {
    /// Request for an explicitly named organization.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: String::new(),
        }
    }
}

/// Request to create a project in the caller's organization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewProject {
    /// `project/<project>`, or empty to derive the name from `display_name`
    pub name: String,
    pub display_name: String,
}

impl NewProject {
    /// Request for an explicitly named project.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: String::new(),
        }
    }
}

/// Request to create a site.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewSite {
    /// Owning project, `project/<project>`
    pub project: String,
    /// `project/<project>/site/<site>`, or empty to derive the name from
    /// `display_name`
    pub name: String,
    pub display_name: String,
    pub spec: SiteSpec,
}

/// Changes to a site. `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SiteUpdate {
    /// New display name; an empty string clears it
    pub display_name: Option<String>,
    /// Replacement spec
    pub spec: Option<SiteSpec>,
}

/// Tenant operations on behalf of callers.
#[derive(Clone)]
pub struct TenantApi<I> {
    impersonator: I,
}

impl<I: Impersonator> TenantApi<I> {
    /// API whose store calls go through `impersonator`.
    pub fn new(impersonator: I) -> Self {
        Self { impersonator }
    }

    fn store(&self, caller: &CallerContext) -> Result<I::Store> {
        self.impersonator.impersonate(&caller.principal)
    }

    // ------------------------------------------------------------------
    // Organizations
    // ------------------------------------------------------------------

    /// Create an organization namespace.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed name, `Conflict` when it exists.
    pub async fn create_organization(
        &self,
        caller: &CallerContext,
        request: NewOrganization,
    ) -> Result<OrganizationView> {
        let store = self.store(caller)?;
        let slug = local_name(TenantKind::Organization, &request.name, &request.display_name)?;

        let namespace = Namespace {
            metadata: parent_meta(
                organization_namespace(&slug),
                None,
                KIND_ORGANIZATION_VALUE,
                &Lineage::organization(&slug),
                &caller.principal,
                &request.display_name,
            ),
            ..Default::default()
        };
        let created = retry_transient(|| store.create(&namespace), "create organization").await?;

        info!(organization = %slug, principal = %caller.principal, "Created organization");
        Ok(organization_view(&created))
    }

    /// Fetch the caller's organization.
    ///
    /// # Errors
    ///
    /// `NotFound` for any organization other than the caller's.
    pub async fn get_organization(
        &self,
        caller: &CallerContext,
        name: &str,
    ) -> Result<OrganizationView> {
        let store = self.store(caller)?;
        let namespace = fetch_organization(&store, &caller.scope()?, name).await?;
        Ok(organization_view(&namespace))
    }

    /// Organizations the caller's identity may list.
    ///
    /// # Errors
    ///
    /// Store failures, including `Forbidden`.
    pub async fn list_organizations(&self, caller: &CallerContext) -> Result<Vec<OrganizationView>> {
        let store = self.store(caller)?;
        let selector = kind_selector(KIND_ORGANIZATION_VALUE, None);
        let namespaces: Vec<Namespace> = retry_transient(
            || store.list(None, Some(&selector)),
            "list organizations",
        )
        .await?;
        Ok(namespaces.iter().map(organization_view).collect())
    }

    /// Change the caller's organization display name.
    ///
    /// # Errors
    ///
    /// `NotFound` outside the caller's organization, `Conflict` on a
    /// concurrent write.
    pub async fn update_organization(
        &self,
        caller: &CallerContext,
        name: &str,
        display_name: &str,
    ) -> Result<OrganizationView> {
        let store = self.store(caller)?;
        let mut namespace = fetch_organization(&store, &caller.scope()?, name).await?;
        set_display_name(&mut namespace.metadata, display_name);
        let updated = retry_transient(|| store.update(&namespace), "update organization").await?;
        Ok(organization_view(&updated))
    }

    /// Request deletion of the caller's organization.
    ///
    /// # Errors
    ///
    /// `NotFound` outside the caller's organization.
    pub async fn delete_organization(&self, caller: &CallerContext, name: &str) -> Result<()> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        fetch_organization(&store, &scope, name).await?;
        let key = scope.organization_key();
        retry_transient(|| store.delete::<Namespace>(&key), "delete organization").await?;
        info!(
            organization = %scope.organization(),
            principal = %caller.principal,
            "Deleted organization"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    /// Create a project in the caller's organization.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed name, `NotFound` when the caller's
    /// organization does not exist, `Conflict` when the project exists.
    pub async fn create_project(
        &self,
        caller: &CallerContext,
        request: NewProject,
    ) -> Result<ProjectView> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        let slug = local_name(TenantKind::Project, &request.name, &request.display_name)?;
        fetch_organization(&store, &scope, &caller.organization).await?;

        let namespace = Namespace {
            metadata: parent_meta(
                project_namespace(&slug),
                None,
                KIND_PROJECT_VALUE,
                &Lineage::project(scope.organization(), &slug),
                &caller.principal,
                &request.display_name,
            ),
            ..Default::default()
        };
        let created = retry_transient(|| store.create(&namespace), "create project").await?;

        info!(
            organization = %scope.organization(),
            project = %slug,
            principal = %caller.principal,
            "Created project"
        );
        Ok(project_view(&created))
    }

    /// Fetch a project of the caller's organization.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed name, `NotFound` when absent or in
    /// another organization.
    pub async fn get_project(&self, caller: &CallerContext, name: &str) -> Result<ProjectView> {
        let store = self.store(caller)?;
        let namespace = fetch_project(&store, &caller.scope()?, name).await?;
        Ok(project_view(&namespace))
    }

    /// Projects of the caller's organization.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn list_projects(&self, caller: &CallerContext) -> Result<Vec<ProjectView>> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        let selector = kind_selector(KIND_PROJECT_VALUE, Some(scope.organization()));
        let namespaces: Vec<Namespace> =
            retry_transient(|| store.list(None, Some(&selector)), "list projects").await?;
        Ok(namespaces.iter().map(project_view).collect())
    }

    /// Change a project's display name.
    ///
    /// # Errors
    ///
    /// See [`TenantApi::get_project`]; `Conflict` on a concurrent write.
    pub async fn update_project(
        &self,
        caller: &CallerContext,
        name: &str,
        display_name: &str,
    ) -> Result<ProjectView> {
        let store = self.store(caller)?;
        let mut namespace = fetch_project(&store, &caller.scope()?, name).await?;
        set_display_name(&mut namespace.metadata, display_name);
        let updated = retry_transient(|| store.update(&namespace), "update project").await?;
        Ok(project_view(&updated))
    }

    /// Request deletion of a project. Its sites and derived objects go with
    /// the namespace.
    ///
    /// # Errors
    ///
    /// See [`TenantApi::get_project`].
    pub async fn delete_project(&self, caller: &CallerContext, name: &str) -> Result<()> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        fetch_project(&store, &scope, name).await?;
        let key = scope.project_key(name)?;
        retry_transient(|| store.delete::<Namespace>(&key), "delete project").await?;
        info!(project = %name, principal = %caller.principal, "Deleted project");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sites
    // ------------------------------------------------------------------

    /// Create a site in a project of the caller's organization.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for malformed names or a site name naming another
    /// project, `NotFound` for an unknown project, `Conflict` when the site
    /// exists.
    pub async fn create_site(&self, caller: &CallerContext, request: NewSite) -> Result<SiteView> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        let project = resolve_project(&request.project)?;
        let slug = if request.name.is_empty() {
            derived_name(TenantKind::Site, &request.display_name)?
        } else {
            let (site, site_project) = resolve_site(&request.name)?;
            if site_project != project {
                return Err(Error::InvalidInput(format!(
                    "site '{}' does not belong to '{}'",
                    request.name, request.project
                )));
            }
            site
        };
        fetch_project(&store, &scope, &request.project).await?;

        let mut site = Site::new(&slug, request.spec);
        site.metadata = parent_meta(
            slug.clone(),
            Some(project_namespace(&project)),
            KIND_SITE_VALUE,
            &Lineage::site(scope.organization(), &project, &slug),
            &caller.principal,
            &request.display_name,
        );
        let created = retry_transient(|| store.create(&site), "create site").await?;

        info!(project = %project, site = %slug, principal = %caller.principal, "Created site");
        Ok(site_view(&created))
    }

    /// Fetch a site.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed name, `NotFound` when the site or its
    /// project is absent or outside the caller's organization.
    pub async fn get_site(&self, caller: &CallerContext, name: &str) -> Result<SiteView> {
        let store = self.store(caller)?;
        let site = fetch_site(&store, &caller.scope()?, name).await?;
        Ok(site_view(&site))
    }

    /// Sites of a project.
    ///
    /// # Errors
    ///
    /// See [`TenantApi::get_project`].
    pub async fn list_sites(&self, caller: &CallerContext, project: &str) -> Result<Vec<SiteView>> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        let namespace = fetch_project(&store, &scope, project).await?;
        let namespace_name = namespace.metadata.name.unwrap_or_default();
        let selector = kind_selector(KIND_SITE_VALUE, Some(scope.organization()));
        let sites: Vec<Site> = retry_transient(
            || store.list(Some(&namespace_name), Some(&selector)),
            "list sites",
        )
        .await?;
        Ok(sites.iter().map(site_view).collect())
    }

    /// Change a site's display name and/or spec.
    ///
    /// # Errors
    ///
    /// See [`TenantApi::get_site`]; `Conflict` on a concurrent write.
    pub async fn update_site(
        &self,
        caller: &CallerContext,
        name: &str,
        update: SiteUpdate,
    ) -> Result<SiteView> {
        let store = self.store(caller)?;
        let mut site = fetch_site(&store, &caller.scope()?, name).await?;
        if let Some(display_name) = &update.display_name {
            set_display_name(&mut site.metadata, display_name);
        }
        if let Some(spec) = update.spec {
            site.spec = spec;
        }
        let updated = retry_transient(|| store.update(&site), "update site").await?;
        debug!(site = %name, "Updated site");
        Ok(site_view(&updated))
    }

    /// Request deletion of a site. Derived objects follow through owner
    /// references.
    ///
    /// # Errors
    ///
    /// See [`TenantApi::get_site`].
    pub async fn delete_site(&self, caller: &CallerContext, name: &str) -> Result<()> {
        let store = self.store(caller)?;
        let scope = caller.scope()?;
        fetch_site(&store, &scope, name).await?;
        let key = scope.site_key(name)?;
        retry_transient(|| store.delete::<Site>(&key), "delete site").await?;
        info!(site = %name, principal = %caller.principal, "Deleted site");
        Ok(())
    }
}

/// Resolve `name`, or derive a slug from `display_name` when it is empty.
fn local_name(kind: TenantKind, name: &str, display_name: &str) -> Result<String> {
    if name.is_empty() {
        derived_name(kind, display_name)
    } else {
        resolve(kind, name).map(|resolved| resolved.local_name)
    }
}

fn derived_name(kind: TenantKind, display_name: &str) -> Result<String> {
    if display_name.trim().is_empty() {
        return Err(Error::InvalidInput(
            "either a name or a display name is required".to_string(),
        ));
    }
    Ok(generate_slug_name(kind, display_name))
}

fn parent_meta(
    name: String,
    namespace: Option<String>,
    kind: &str,
    lineage: &Lineage,
    principal: &str,
    display_name: &str,
) -> ObjectMeta {
    let mut labels = lineage.labels();
    labels.insert(TENANT_KIND_LABEL.to_string(), kind.to_string());

    let mut meta = ObjectMeta {
        name: Some(name),
        namespace,
        labels: Some(labels),
        annotations: Some(BTreeMap::from([(
            CREATED_BY_ANNOTATION.to_string(),
            principal.to_string(),
        )])),
        ..Default::default()
    };
    set_display_name(&mut meta, display_name);
    meta
}

fn set_display_name(meta: &mut ObjectMeta, display_name: &str) {
    let annotations = meta.annotations.get_or_insert_with(BTreeMap::new);
    if display_name.is_empty() {
        annotations.remove(DISPLAY_NAME_ANNOTATION);
    } else {
        annotations.insert(
            DISPLAY_NAME_ANNOTATION.to_string(),
            display_name.to_string(),
        );
    }
}

fn kind_selector(kind: &str, organization: Option<&str>) -> String {
    let mut labels = BTreeMap::from([(TENANT_KIND_LABEL.to_string(), kind.to_string())]);
    if let Some(organization) = organization {
        labels.insert(
            TENANT_ORGANIZATION_LABEL.to_string(),
            organization.to_string(),
        );
    }
    format_selector(&labels)
}

fn label<'a>(meta: &'a ObjectMeta, key: &str) -> Option<&'a str> {
    meta.labels.as_ref()?.get(key).map(String::as_str)
}

fn annotation(meta: &ObjectMeta, key: &str) -> Option<String> {
    meta.annotations.as_ref()?.get(key).cloned()
}

/// Whether `meta` carries the given kind label and belongs to `organization`.
fn in_organization(meta: &ObjectMeta, kind: &str, organization: &str) -> bool {
    label(meta, TENANT_KIND_LABEL) == Some(kind)
        && label(meta, TENANT_ORGANIZATION_LABEL) == Some(organization)
}

/// Get `key`, mapping a missing object or one outside the caller's
/// organization to the same `NotFound`.
async fn fetch_scoped<S, K>(
    store: &S,
    key: &ObjectKey,
    kind: &str,
    organization: &str,
    fqn: &str,
) -> Result<K>
where
    S: ObjectStore,
    K: StoreObject,
{
    let not_found = || Error::NotFound(format!("{kind} '{fqn}'"));
    let object: K = match retry_transient(|| store.get::<K>(key), "get tenant").await {
        Ok(object) => object,
        Err(err) if err.is_not_found() => return Err(not_found()),
        Err(err) => return Err(err),
    };
    if in_organization(object.meta(), kind, organization) {
        Ok(object)
    } else {
        Err(not_found())
    }
}

async fn fetch_organization<S: ObjectStore>(
    store: &S,
    scope: &TenantScope,
    fqn: &str,
) -> Result<Namespace> {
    let slug = resolve_organization(fqn)?;
    if slug != scope.organization() {
        return Err(Error::NotFound(format!(
            "{KIND_ORGANIZATION_VALUE} '{fqn}'"
        )));
    }
    fetch_scoped(
        store,
        &scope.organization_key(),
        KIND_ORGANIZATION_VALUE,
        scope.organization(),
        fqn,
    )
    .await
}

async fn fetch_project<S: ObjectStore>(
    store: &S,
    scope: &TenantScope,
    fqn: &str,
) -> Result<Namespace> {
    let key = scope.project_key(fqn)?;
    fetch_scoped(store, &key, KIND_PROJECT_VALUE, scope.organization(), fqn).await
}

async fn fetch_site<S: ObjectStore>(store: &S, scope: &TenantScope, fqn: &str) -> Result<Site> {
    let key = scope.site_key(fqn)?;
    let (_, project) = resolve_site(fqn)?;
    fetch_project(store, scope, &project_fq_name(&project)).await?;
    fetch_scoped(store, &key, KIND_SITE_VALUE, scope.organization(), fqn).await
}

fn organization_view(namespace: &Namespace) -> OrganizationView {
    let meta = &namespace.metadata;
    OrganizationView {
        name: organization_fq_name(label(meta, TENANT_ORGANIZATION_LABEL).unwrap_or_default()),
        display_name: annotation(meta, DISPLAY_NAME_ANNOTATION),
        created_by: annotation(meta, CREATED_BY_ANNOTATION),
        deleting: meta.deletion_timestamp.is_some(),
    }
}

fn project_view(namespace: &Namespace) -> ProjectView {
    let meta = &namespace.metadata;
    ProjectView {
        name: project_fq_name(label(meta, TENANT_PROJECT_LABEL).unwrap_or_default()),
        organization: organization_fq_name(
            label(meta, TENANT_ORGANIZATION_LABEL).unwrap_or_default(),
        ),
        display_name: annotation(meta, DISPLAY_NAME_ANNOTATION),
        created_by: annotation(meta, CREATED_BY_ANNOTATION),
        deleting: meta.deletion_timestamp.is_some(),
    }
}

fn site_view(site: &Site) -> SiteView {
    let meta = &site.metadata;
    let project = label(meta, TENANT_PROJECT_LABEL).unwrap_or_default();
    let slug = label(meta, TENANT_SITE_LABEL).unwrap_or_default();
    let ready = site
        .status
        .as_ref()
        .and_then(|status| find_condition(&status.conditions, CONDITION_TYPE_READY))
        .map(|condition| condition.status == "True");
    SiteView {
        name: site_fq_name(project, slug),
        project: project_fq_name(project),
        display_name: annotation(meta, DISPLAY_NAME_ANNOTATION),
        created_by: annotation(meta, CREATED_BY_ANNOTATION),
        spec: site.spec.clone(),
        ready,
        deleting: meta.deletion_timestamp.is_some(),
    }
}
