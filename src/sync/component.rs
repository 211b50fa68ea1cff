// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Static descriptors for derived objects.
//!
//! A [`Component`] knows how to name a derived object after its parent and
//! which labels it carries. It has no runtime state.

use crate::labels::{Lineage, K8S_COMPONENT, K8S_MANAGED_BY, K8S_NAME, MANAGED_BY_OPERATOR};
use crate::store::ObjectKey;
use std::collections::BTreeMap;

/// Placeholder replaced with the parent's name in [`Component::name_pattern`].
pub const PARENT_PLACEHOLDER: &str = "{parent}";

/// Compile-time description of one derived object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    /// Component name (`app.kubernetes.io/component`)
    pub name: &'static str,
    /// Application name (`app.kubernetes.io/name`)
    pub app: &'static str,
    /// Object name pattern, `{parent}` is replaced by the parent's name
    pub name_pattern: &'static str,
}

impl Component {
    /// Declare a component.
    #[must_use]
    pub const fn new(name: &'static str, app: &'static str, name_pattern: &'static str) -> Self {
        Self {
            name,
            app,
            name_pattern,
        }
    }

    /// Name of the derived object for a parent called `parent`.
    #[must_use]
    pub fn object_name(&self, parent: &str) -> String {
        self.name_pattern.replace(PARENT_PLACEHOLDER, parent)
    }

    /// Key of the derived object in `namespace`.
    #[must_use]
    pub fn object_key(&self, namespace: &str, parent: &str) -> ObjectKey {
        ObjectKey::namespaced(namespace, &self.object_name(parent))
    }

    /// Labels of the derived object: lineage plus the managed-by, name and
    /// component markers.
    #[must_use]
    pub fn labels(&self, lineage: &Lineage) -> BTreeMap<String, String> {
        let mut labels = lineage.labels();
        labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OPERATOR.into());
        labels.insert(K8S_NAME.into(), self.app.into());
        labels.insert(K8S_COMPONENT.into(), self.name.into());
        labels
    }
}

/// Write `labels` onto a label map, keeping keys owned by others.
pub fn apply_labels(
    target: &mut Option<BTreeMap<String, String>>,
    labels: &BTreeMap<String, String>,
) {
    let target = target.get_or_insert_with(BTreeMap::new);
    for (key, value) in labels {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod component_tests;
