// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label selector parsing and matching.
//!
//! Object stores accept selectors in the Kubernetes string form
//! (`tenancy.dev/kind=site,tenancy.dev/project=blog`). The in-memory store and
//! the watch dispatcher evaluate them locally with [`LabelSelector::matches`].
//!
//! Supported terms, comma separated and `AND`ed:
//!
//! - `key=value` and `key==value` (equality)
//! - `key!=value` (inequality, also matches when the key is absent)
//! - `key` (existence)
//! - `!key` (non-existence)
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use tenant_operator::selector::LabelSelector;
//!
//! let selector = LabelSelector::parse("tenancy.dev/kind=site,!legacy").unwrap();
//! let labels = BTreeMap::from([("tenancy.dev/kind".to_string(), "site".to_string())]);
//! assert!(selector.matches(&labels));
//! ```

use crate::errors::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// One term of a label selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// `key=value`
    Equals(String, String),
    /// `key!=value`
    NotEquals(String, String),
    /// `key`
    Exists(String),
    /// `!key`
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(key, value) => labels.get(key) == Some(value),
            Requirement::NotEquals(key, value) => labels.get(key) != Some(value),
            Requirement::Exists(key) => labels.contains_key(key),
            Requirement::DoesNotExist(key) => !labels.contains_key(key),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals(key, value) => write!(f, "{key}={value}"),
            Requirement::NotEquals(key, value) => write!(f, "{key}!={value}"),
            Requirement::Exists(key) => write!(f, "{key}"),
            Requirement::DoesNotExist(key) => write!(f, "!{key}"),
        }
    }
}

/// A parsed label selector. The empty selector matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Parse a selector string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when a term has an empty key.
    pub fn parse(selector: &str) -> Result<Self> {
        let mut requirements = Vec::new();
        for term in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let requirement = if let Some((key, value)) = term.split_once("!=") {
                Requirement::NotEquals(key.trim().to_string(), value.trim().to_string())
            } else if let Some((key, value)) = term.split_once("==") {
                Requirement::Equals(key.trim().to_string(), value.trim().to_string())
            } else if let Some((key, value)) = term.split_once('=') {
                Requirement::Equals(key.trim().to_string(), value.trim().to_string())
            } else if let Some(key) = term.strip_prefix('!') {
                Requirement::DoesNotExist(key.trim().to_string())
            } else {
                Requirement::Exists(term.to_string())
            };

            let key = match &requirement {
                Requirement::Equals(key, _)
                | Requirement::NotEquals(key, _)
                | Requirement::Exists(key)
                | Requirement::DoesNotExist(key) => key,
            };
            if key.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "label selector term '{term}' has an empty key"
                )));
            }
            requirements.push(requirement);
        }
        Ok(Self { requirements })
    }

    /// Parse an optional selector; `None` yields the match-everything selector.
    ///
    /// # Errors
    ///
    /// See [`LabelSelector::parse`].
    pub fn parse_optional(selector: Option<&str>) -> Result<Self> {
        selector.map_or_else(|| Ok(Self::default()), Self::parse)
    }

    /// Whether every requirement holds for `labels`.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    /// Parsed requirements, in input order.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.requirements.iter().map(ToString::to_string).collect();
        write!(f, "{}", terms.join(","))
    }
}

/// Render an equality selector from a label map (`k1=v1,k2=v2`, key order).
#[must_use]
pub fn format_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
