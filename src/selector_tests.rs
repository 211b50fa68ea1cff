// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `selector.rs`

use crate::labels::Lineage;
use crate::selector::{format_selector, LabelSelector, Requirement};
use std::collections::BTreeMap;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_parse_all_operators() {
    let selector = LabelSelector::parse("a=1, b==2,c!=3,d,!e").unwrap();
    assert_eq!(
        selector.requirements(),
        &[
            Requirement::Equals("a".into(), "1".into()),
            Requirement::Equals("b".into(), "2".into()),
            Requirement::NotEquals("c".into(), "3".into()),
            Requirement::Exists("d".into()),
            Requirement::DoesNotExist("e".into()),
        ]
    );
}

#[test]
fn test_empty_selector_matches_everything() {
    let selector = LabelSelector::parse("").unwrap();
    assert!(selector.matches(&BTreeMap::new()));
    assert!(LabelSelector::parse_optional(None)
        .unwrap()
        .matches(&labels(&[("x", "y")])));
}

#[test]
fn test_equality_requires_value() {
    let selector = LabelSelector::parse("tenancy.dev/kind=site").unwrap();
    assert!(selector.matches(&labels(&[("tenancy.dev/kind", "site")])));
    assert!(!selector.matches(&labels(&[("tenancy.dev/kind", "project")])));
    assert!(!selector.matches(&BTreeMap::new()));
}

#[test]
fn test_inequality_matches_missing_key() {
    let selector = LabelSelector::parse("tier!=db").unwrap();
    assert!(selector.matches(&BTreeMap::new()));
    assert!(selector.matches(&labels(&[("tier", "web")])));
    assert!(!selector.matches(&labels(&[("tier", "db")])));
}

#[test]
fn test_existence_terms() {
    let selector = LabelSelector::parse("owner,!legacy").unwrap();
    assert!(selector.matches(&labels(&[("owner", "")])));
    assert!(!selector.matches(&labels(&[("owner", "a"), ("legacy", "true")])));
    assert!(!selector.matches(&BTreeMap::new()));
}

#[test]
fn test_empty_key_rejected() {
    assert!(LabelSelector::parse("=value").is_err());
    assert!(LabelSelector::parse("!").is_err());
}

#[test]
fn test_format_selector_round_trips_lineage() {
    let lineage = Lineage::site("acme", "blog", "www");
    let rendered = lineage.selector();
    assert_eq!(
        rendered,
        "tenancy.dev/organization=acme,tenancy.dev/project=blog,tenancy.dev/site=www"
    );
    let parsed = LabelSelector::parse(&rendered).unwrap();
    assert!(parsed.matches(&lineage.labels()));
    assert_eq!(parsed.to_string(), rendered);
}

#[test]
fn test_format_selector_empty() {
    assert_eq!(format_selector(&BTreeMap::new()), "");
}
