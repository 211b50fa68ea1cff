// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Required-metadata checks for parent resources.
//!
//! A parent missing any required label or annotation is invalid: every
//! reconciler skips it without writing anything and without retrying.

use crate::errors::{Error, Result};
use crate::labels::{
    CREATED_BY_ANNOTATION, TENANT_KIND_LABEL, TENANT_ORGANIZATION_LABEL, TENANT_PROJECT_LABEL,
    TENANT_SITE_LABEL,
};
use crate::names::TenantKind;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Labels every organization namespace must carry.
pub const ORGANIZATION_REQUIRED_LABELS: &[&str] = &[TENANT_KIND_LABEL, TENANT_ORGANIZATION_LABEL];

/// Labels every project namespace must carry.
pub const PROJECT_REQUIRED_LABELS: &[&str] = &[
    TENANT_KIND_LABEL,
    TENANT_ORGANIZATION_LABEL,
    TENANT_PROJECT_LABEL,
];

/// Labels every site must carry.
pub const SITE_REQUIRED_LABELS: &[&str] = &[
    TENANT_KIND_LABEL,
    TENANT_ORGANIZATION_LABEL,
    TENANT_PROJECT_LABEL,
    TENANT_SITE_LABEL,
];

/// Annotations every parent must carry.
pub const REQUIRED_ANNOTATIONS: &[&str] = &[CREATED_BY_ANNOTATION];

/// Non-empty value of a label.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] when the label is absent or empty.
pub fn label<'a>(meta: &'a ObjectMeta, key: &str) -> Result<&'a str> {
    lookup(meta.labels.as_ref(), key).ok_or_else(|| missing(meta, "label", key))
}

/// Non-empty value of an annotation.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] when the annotation is absent or empty.
pub fn annotation<'a>(meta: &'a ObjectMeta, key: &str) -> Result<&'a str> {
    lookup(meta.annotations.as_ref(), key).ok_or_else(|| missing(meta, "annotation", key))
}

/// Check every required label and annotation at once, reporting all that
/// are missing.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] naming each missing key.
pub fn require(meta: &ObjectMeta, labels: &[&str], annotations: &[&str]) -> Result<()> {
    let mut missing_keys: Vec<String> = labels
        .iter()
        .filter(|key| lookup(meta.labels.as_ref(), key).is_none())
        .map(|key| format!("label {key}"))
        .collect();
    missing_keys.extend(
        annotations
            .iter()
            .filter(|key| lookup(meta.annotations.as_ref(), key).is_none())
            .map(|key| format!("annotation {key}")),
    );

    if missing_keys.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidMetadata(format!(
            "{} is missing {}",
            describe(meta),
            missing_keys.join(", ")
        )))
    }
}

/// Check that a value derived from the parent's identity agrees with a
/// lineage label.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] on disagreement.
pub fn require_match(meta: &ObjectMeta, what: &str, expected: &str, actual: &str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::InvalidMetadata(format!(
            "{}: {what} is '{actual}', expected '{expected}'",
            describe(meta)
        )))
    }
}

/// Check that a `kind` slug leaves room for the names derived from it.
///
/// # Errors
///
/// [`Error::InvalidMetadata`] when `slug` is longer than
/// [`TenantKind::max_local_len`].
pub fn require_fits(meta: &ObjectMeta, kind: TenantKind, slug: &str) -> Result<()> {
    if slug.len() <= kind.max_local_len() {
        Ok(())
    } else {
        Err(Error::InvalidMetadata(format!(
            "{}: {kind} name '{slug}' is longer than {} characters",
            describe(meta),
            kind.max_local_len()
        )))
    }
}

fn lookup<'a>(
    map: Option<&'a std::collections::BTreeMap<String, String>>,
    key: &str,
) -> Option<&'a str> {
    map.and_then(|m| m.get(key))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn missing(meta: &ObjectMeta, what: &str, key: &str) -> Error {
    Error::InvalidMetadata(format!("{} is missing {what} {key}", describe(meta)))
}

fn describe(meta: &ObjectMeta) -> String {
    let name = meta.name.as_deref().unwrap_or("<unnamed>");
    match meta.namespace.as_deref() {
        Some(namespace) => format!("{namespace}/{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
