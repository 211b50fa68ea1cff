// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Slug generation from display names.

use super::TenantKind;
use crate::constants::SLUG_HASH_LEN;
use sha2::{Digest, Sha256};

/// Derive a local name of a `kind` tenant from a display name.
///
/// The result is the slugified display name (lowercase, runs of anything
/// other than `[a-z0-9]` collapsed to one `-`, trimmed) followed by `-` and
/// the first six hex digits of the SHA-256 of the display name. The base is
/// shortened so the whole slug stays within [`TenantKind::max_local_len`].
/// It is a pure function of its inputs, so retried creates land on the same
/// name.
///
/// ```rust
/// use tenant_operator::names::{generate_slug_name, is_dns_label, TenantKind};
///
/// let slug = generate_slug_name(TenantKind::Site, "Blog");
/// assert!(slug.starts_with("blog-"));
/// assert_eq!(slug, generate_slug_name(TenantKind::Site, "Blog"));
/// assert!(is_dns_label(&slug));
/// ```
#[must_use]
pub fn generate_slug_name(kind: TenantKind, display_name: &str) -> String {
    let suffix = digest_prefix(display_name);
    let mut base = slugify(display_name);

    let max_base = kind.max_local_len() - SLUG_HASH_LEN - 1;
    if base.len() > max_base {
        base.truncate(max_base);
        base.truncate(base.trim_end_matches('-').len());
    }

    if base.is_empty() {
        suffix
    } else {
        format!("{base}-{suffix}")
    }
}

fn slugify(display_name: &str) -> String {
    let mut slug = String::with_capacity(display_name.len());
    for c in display_name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.truncate(slug.trim_end_matches('-').len());
    slug
}

fn digest_prefix(display_name: &str) -> String {
    let digest = Sha256::digest(display_name.as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(SLUG_HASH_LEN);
    hex
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod slug_tests;
