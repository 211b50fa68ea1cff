// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Site reconciler.
//!
//! A [`Site`] lives in its project's namespace. Its derived objects, in order:
//!
//! 1. `<site>-credentials` `Secret` - generated once, never rotated here
//! 2. `<site>-web` `Deployment` - reads the credentials by secret name
//! 3. `<site>-web` `Service`
//! 4. `<site>` `Ingress` - one rule per domain, omitted while the site has
//!    no domains
//!
//! After the pass the `Ready` condition and `observedGeneration` are written
//! to the site's status, only when they changed.

use super::resources::{site_credentials, site_deployment, site_ingress, site_service};
use super::status::next_site_status;
use super::validation::{
    annotation, label, require, require_fits, require_match, REQUIRED_ANNOTATIONS,
    SITE_REQUIRED_LABELS,
};
use super::Reconciler;
use crate::constants::KIND_SITE;
use crate::crd::Site;
use crate::dispatch::{ControllerTask, Manager};
use crate::errors::{Error, Result};
use crate::labels::{
    Lineage, CREATED_BY_ANNOTATION, K8S_COMPONENT, K8S_INSTANCE, KIND_SITE_VALUE,
    TENANT_KIND_LABEL, TENANT_ORGANIZATION_LABEL, TENANT_PROJECT_LABEL, TENANT_SITE_LABEL,
};
use crate::names::{project_namespace, TenantKind};
use crate::status_reasons::{condition_status, REASON_ALL_SYNCED, REASON_SYNC_FAILED};
use crate::store::ObjectStore;
use crate::sync::{controller_reference, Component, ObjectSyncer, Syncer};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::debug;

/// Generated credentials of the site.
pub const CREDENTIALS: Component = Component::new("credentials", "site", "{parent}-credentials");

/// Web workload (deployment and service) of the site.
pub const WEB: Component = Component::new("web", "site", "{parent}-web");

/// Public routing of the site.
pub const INGRESS: Component = Component::new("ingress", "site", "{parent}");

/// A validated site.
#[derive(Clone, Debug)]
pub struct SiteTenant {
    site: Site,
    lineage: Lineage,
    owner: OwnerReference,
    created_by: String,
}

impl SiteTenant {
    /// Validate a site.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMetadata`] when required metadata is missing, or the
    /// site's namespace or name disagrees with its lineage labels.
    pub fn from_site(site: Site) -> Result<Self> {
        let meta = &site.metadata;
        require(meta, SITE_REQUIRED_LABELS, REQUIRED_ANNOTATIONS)?;
        require_match(
            meta,
            TENANT_KIND_LABEL,
            KIND_SITE_VALUE,
            label(meta, TENANT_KIND_LABEL)?,
        )?;
        let organization = label(meta, TENANT_ORGANIZATION_LABEL)?;
        let project = label(meta, TENANT_PROJECT_LABEL)?;
        let slug = label(meta, TENANT_SITE_LABEL)?;
        require_match(
            meta,
            "namespace",
            &project_namespace(project),
            meta.namespace.as_deref().unwrap_or_default(),
        )?;
        require_match(meta, "name", slug, &site.name_any())?;
        require_fits(meta, TenantKind::Site, slug)?;
        let lineage = Lineage::site(organization, project, slug);
        let created_by = annotation(meta, CREATED_BY_ANNOTATION)?.to_string();
        let owner = controller_reference(&site)?;

        Ok(Self {
            site,
            lineage,
            owner,
            created_by,
        })
    }

    /// The site as fetched at the start of the pass.
    #[must_use]
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Site slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.lineage.site.as_deref().unwrap_or_default()
    }

    /// Namespace of the site and its derived objects.
    #[must_use]
    pub fn namespace_name(&self) -> String {
        self.site.namespace().unwrap_or_default()
    }

    /// Lineage labels of the site's derived objects.
    #[must_use]
    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    /// Principal that created the site.
    #[must_use]
    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    /// Owner reference derived objects point at.
    #[must_use]
    pub fn owner(&self) -> &OwnerReference {
        &self.owner
    }

    /// Pod selector of the site's web workload.
    #[must_use]
    pub fn web_selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (K8S_INSTANCE.to_string(), self.slug().to_string()),
            (K8S_COMPONENT.to_string(), WEB.name.to_string()),
        ])
    }
}

/// Reconciler for sites.
#[derive(Clone, Copy, Debug, Default)]
pub struct SiteReconciler;

#[async_trait]
impl<S: ObjectStore> Reconciler<S> for SiteReconciler {
    type Parent = Site;
    type Tenant = SiteTenant;

    fn kind(&self) -> &'static str {
        KIND_SITE
    }

    fn namespaced(&self) -> bool {
        true
    }

    fn matches(&self, _: &Site) -> bool {
        true
    }

    fn validate(&self, parent: Site) -> Result<SiteTenant> {
        SiteTenant::from_site(parent)
    }

    fn syncers(&self, tenant: &SiteTenant) -> Vec<Box<dyn Syncer<S>>> {
        let namespace = tenant.namespace_name();
        let slug = tenant.slug();
        let secret_name = CREDENTIALS.object_name(slug);
        let service_name = WEB.object_name(slug);
        let selector = tenant.web_selector();
        let spec = tenant.site().spec.clone();

        let credentials_labels = CREDENTIALS.labels(tenant.lineage());
        let credentials = ObjectSyncer::new(
            CREDENTIALS.name,
            CREDENTIALS.object_key(&namespace, slug),
            tenant.owner().clone(),
            move |secret: &mut Secret| {
                site_credentials(secret, &credentials_labels);
                Ok(())
            },
        );

        let web_labels = WEB.labels(tenant.lineage());
        let deployment = {
            let labels = web_labels.clone();
            let selector = selector.clone();
            let spec = spec.clone();
            ObjectSyncer::new(
                WEB.name,
                WEB.object_key(&namespace, slug),
                tenant.owner().clone(),
                move |deployment: &mut Deployment| {
                    site_deployment(deployment, &labels, &selector, &spec, &secret_name);
                    Ok(())
                },
            )
        };

        let service = ObjectSyncer::new(
            WEB.name,
            WEB.object_key(&namespace, slug),
            tenant.owner().clone(),
            move |service: &mut Service| {
                site_service(service, &web_labels, &selector);
                Ok(())
            },
        );

        let mut syncers: Vec<Box<dyn Syncer<S>>> = vec![
            Box::new(credentials),
            Box::new(deployment),
            Box::new(service),
        ];

        if spec.domains.is_empty() {
            debug!(site = %tenant.site().name_any(), "Site has no domains, skipping ingress");
        } else {
            let ingress_labels = INGRESS.labels(tenant.lineage());
            let domains = spec.domains;
            syncers.push(Box::new(ObjectSyncer::new(
                INGRESS.name,
                INGRESS.object_key(&namespace, slug),
                tenant.owner().clone(),
                move |ingress: &mut Ingress| {
                    site_ingress(ingress, &ingress_labels, &service_name, &domains);
                    Ok(())
                },
            )));
        }

        syncers
    }

    async fn finalize(
        &self,
        store: &S,
        tenant: &SiteTenant,
        failure: Option<&Error>,
    ) -> Result<()> {
        let site = tenant.site();
        let (reason, message) = match failure {
            None => (REASON_ALL_SYNCED, "All derived objects are in sync".to_string()),
            Some(err) => (REASON_SYNC_FAILED, err.to_string()),
        };
        let Some(status) = next_site_status(
            site.status.as_ref(),
            site.metadata.generation,
            condition_status(failure.is_none()),
            reason,
            &message,
        ) else {
            return Ok(());
        };

        let mut updated = site.clone();
        updated.status = Some(status);
        store.update_status(&updated).await?;
        debug!(site = %site.name_any(), reason, "Updated site status");
        Ok(())
    }
}

/// Register the site controller.
pub fn register<S: ObjectStore>(manager: &Manager<S>) -> ControllerTask {
    manager
        .controller(SiteReconciler)
        .owns::<Secret>()
        .owns::<Deployment>()
        .owns::<Service>()
        .owns::<Ingress>()
        .run()
}

#[cfg(test)]
#[path = "site_tests.rs"]
mod site_tests;
