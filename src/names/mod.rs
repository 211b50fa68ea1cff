// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fully-qualified tenant names and their store coordinates.
//!
//! Callers address tenants with fixed-grammar paths:
//!
//! | Kind | FQN | Store object |
//! |------|-----|--------------|
//! | Organization | `orgs/<org>` | `Namespace` `org-<org>` |
//! | Project | `project/<project>` | `Namespace` `proj-<project>` |
//! | Site | `project/<project>/site/<site>` | `Site` `<site>` in `proj-<project>` |
//!
//! Every `<slug>` is a DNS-1123 label. Resolution is strict: a name that is
//! not already in canonical path form, or that does not match the kind's
//! pattern exactly, is rejected with [`Error::InvalidInput`]. Nothing is
//! trimmed or normalized on the caller's behalf.
//!
//! Store namespaces are always computed from resolved names and an ambient
//! organization ([`TenantScope`]), never taken from the caller.

pub mod slug;

pub use slug::generate_slug_name;

use crate::constants::{
    DNS_LABEL_MAX_LEN, ORGANIZATION_NAMESPACE_PREFIX, PROJECT_NAMESPACE_PREFIX,
    SITE_DERIVED_SUFFIX_MAX_LEN,
};
use crate::errors::{Error, Result};
use crate::store::ObjectKey;
use std::fmt;

/// First segment of organization FQNs.
pub const ORGANIZATION_SEGMENT: &str = "orgs";

/// First segment of project and site FQNs.
pub const PROJECT_SEGMENT: &str = "project";

/// Third segment of site FQNs.
pub const SITE_SEGMENT: &str = "site";

/// The three addressable tenant levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TenantKind {
    /// `orgs/<org>`
    Organization,
    /// `project/<project>`
    Project,
    /// `project/<project>/site/<site>`
    Site,
}

impl TenantKind {
    /// Lowercase kind name, as used in the `tenancy.dev/kind` label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TenantKind::Organization => crate::labels::KIND_ORGANIZATION_VALUE,
            TenantKind::Project => crate::labels::KIND_PROJECT_VALUE,
            TenantKind::Site => crate::labels::KIND_SITE_VALUE,
        }
    }

    /// Longest local name whose store names still fit a DNS label:
    /// `org-<org>`, `proj-<project>` and `<site>-credentials`.
    #[must_use]
    pub fn max_local_len(self) -> usize {
        match self {
            TenantKind::Organization => DNS_LABEL_MAX_LEN - ORGANIZATION_NAMESPACE_PREFIX.len(),
            TenantKind::Project => DNS_LABEL_MAX_LEN - PROJECT_NAMESPACE_PREFIX.len(),
            TenantKind::Site => DNS_LABEL_MAX_LEN - SITE_DERIVED_SUFFIX_MAX_LEN,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            TenantKind::Organization => "orgs/<org>",
            TenantKind::Project => "project/<project>",
            TenantKind::Site => "project/<project>/site/<site>",
        }
    }
}

impl fmt::Display for TenantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local name of a tenant and, for sites, its project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedName {
    /// Last slug of the FQN
    pub local_name: String,
    /// Project slug for sites, `None` otherwise
    pub parent_local_name: Option<String>,
}

/// Resolve an FQN of the given kind to its local name(s).
///
/// # Errors
///
/// [`Error::InvalidInput`] when `fqn` is not canonical, does not match the
/// kind's pattern, or carries a slug that is not a DNS label or is too long
/// for the store names built from it ([`TenantKind::max_local_len`]).
pub fn resolve(kind: TenantKind, fqn: &str) -> Result<ResolvedName> {
    if !is_clean_path(fqn) {
        return Err(invalid(kind, fqn, "not in canonical path form"));
    }

    let segments: Vec<&str> = fqn.split('/').collect();
    let (local, parent) = match (kind, segments.as_slice()) {
        (TenantKind::Organization, [ORGANIZATION_SEGMENT, org]) => (*org, None),
        (TenantKind::Project, [PROJECT_SEGMENT, project]) => (*project, None),
        (TenantKind::Site, [PROJECT_SEGMENT, project, SITE_SEGMENT, site]) => {
            (*site, Some(*project))
        }
        _ => return Err(invalid(kind, fqn, "does not match the expected pattern")),
    };

    let levels = std::iter::once((kind, local)).chain(parent.map(|p| (TenantKind::Project, p)));
    for (level, slug) in levels {
        if !is_dns_label(slug) {
            return Err(invalid(
                kind,
                fqn,
                &format!("'{slug}' is not a lowercase DNS label"),
            ));
        }
        if slug.len() > level.max_local_len() {
            return Err(invalid(
                kind,
                fqn,
                &format!(
                    "{level} name '{slug}' is longer than {} characters",
                    level.max_local_len()
                ),
            ));
        }
    }

    Ok(ResolvedName {
        local_name: local.to_string(),
        parent_local_name: parent.map(str::to_string),
    })
}

fn invalid(kind: TenantKind, fqn: &str, why: &str) -> Error {
    Error::InvalidInput(format!(
        "invalid {kind} name '{fqn}': {why} (expected {})",
        kind.pattern()
    ))
}

/// Resolve `orgs/<org>` to `<org>`.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_organization(fqn: &str) -> Result<String> {
    resolve(TenantKind::Organization, fqn).map(|r| r.local_name)
}

/// Resolve `project/<project>` to `<project>`.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_project(fqn: &str) -> Result<String> {
    resolve(TenantKind::Project, fqn).map(|r| r.local_name)
}

/// Resolve `project/<project>/site/<site>` to `(<site>, <project>)`.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_site(fqn: &str) -> Result<(String, String)> {
    let resolved = resolve(TenantKind::Site, fqn)?;
    let project = resolved
        .parent_local_name
        .ok_or_else(|| invalid(TenantKind::Site, fqn, "missing project"))?;
    Ok((resolved.local_name, project))
}

/// `orgs/<org>`
#[must_use]
pub fn organization_fq_name(organization: &str) -> String {
    format!("{ORGANIZATION_SEGMENT}/{organization}")
}

/// `project/<project>`
#[must_use]
pub fn project_fq_name(project: &str) -> String {
    format!("{PROJECT_SEGMENT}/{project}")
}

/// `project/<project>/site/<site>`
#[must_use]
pub fn site_fq_name(project: &str, site: &str) -> String {
    format!("{PROJECT_SEGMENT}/{project}/{SITE_SEGMENT}/{site}")
}

/// Whether `s` is a DNS-1123 label: 1 to 63 lowercase alphanumerics or
/// hyphens, starting and ending with an alphanumeric.
#[must_use]
pub fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    !bytes.is_empty()
        && bytes.len() <= DNS_LABEL_MAX_LEN
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes.first().is_some_and(edge_ok)
        && bytes.last().is_some_and(edge_ok)
}

/// Lexically clean a slash-separated path: collapse repeated slashes, drop
/// `.` segments, resolve `..` against preceding segments and strip any
/// trailing slash. The empty path cleans to `.`.
#[must_use]
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Whether `path` is non-empty and already equal to its cleaned form.
#[must_use]
pub fn is_clean_path(path: &str) -> bool {
    !path.is_empty() && clean_path(path) == path
}

/// Store namespace of an organization: `org-<org>`.
#[must_use]
pub fn organization_namespace(organization: &str) -> String {
    format!("{ORGANIZATION_NAMESPACE_PREFIX}{organization}")
}

/// Store namespace of a project: `proj-<project>`.
#[must_use]
pub fn project_namespace(project: &str) -> String {
    format!("{PROJECT_NAMESPACE_PREFIX}{project}")
}

/// Organization slug of an `org-<org>` namespace.
#[must_use]
pub fn organization_from_namespace(namespace: &str) -> Option<&str> {
    namespace
        .strip_prefix(ORGANIZATION_NAMESPACE_PREFIX)
        .filter(|slug| is_dns_label(slug))
}

/// Project slug of a `proj-<project>` namespace.
#[must_use]
pub fn project_from_namespace(namespace: &str) -> Option<&str> {
    namespace
        .strip_prefix(PROJECT_NAMESPACE_PREFIX)
        .filter(|slug| is_dns_label(slug))
}

/// Ambient organization under which caller-supplied FQNs are resolved to
/// store keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantScope {
    organization: String,
}

impl TenantScope {
    /// Scope for the organization named by `orgs/<org>`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for a malformed organization FQN.
    pub fn from_fq_name(organization_fqn: &str) -> Result<Self> {
        Ok(Self {
            organization: resolve_organization(organization_fqn)?,
        })
    }

    /// Organization slug.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Key of the organization namespace.
    #[must_use]
    pub fn organization_key(&self) -> ObjectKey {
        ObjectKey::cluster(&organization_namespace(&self.organization))
    }

    /// Key of the project namespace named by `project/<project>`.
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn project_key(&self, project_fqn: &str) -> Result<ObjectKey> {
        let project = resolve_project(project_fqn)?;
        Ok(ObjectKey::cluster(&project_namespace(&project)))
    }

    /// Key of the site named by `project/<project>/site/<site>`.
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn site_key(&self, site_fqn: &str) -> Result<ObjectKey> {
        let (site, project) = resolve_site(site_fqn)?;
        Ok(ObjectKey::namespaced(&project_namespace(&project), &site))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
