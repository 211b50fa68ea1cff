// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `slug.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::constants::DNS_LABEL_MAX_LEN;
    use crate::names::{
        is_dns_label, organization_namespace, project_namespace, resolve, resolve_site,
        site_fq_name,
    };

    const SITE: TenantKind = TenantKind::Site;

    #[test]
    fn test_slug_is_deterministic() {
        assert_eq!(generate_slug_name(SITE, "Blog"), generate_slug_name(SITE, "Blog"));
        assert_ne!(generate_slug_name(SITE, "Blog"), generate_slug_name(SITE, "blog"));
    }

    #[test]
    fn test_slug_shape() {
        let slug = generate_slug_name(SITE, "Blog");
        let (base, hash) = slug.split_at(slug.len() - SLUG_HASH_LEN);
        assert_eq!(base, "blog-");
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_short_names_do_not_depend_on_kind() {
        assert_eq!(
            generate_slug_name(TenantKind::Organization, "Big Corp"),
            generate_slug_name(TenantKind::Project, "Big Corp")
        );
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        let slug = generate_slug_name(SITE, "  My  Great -- Site!! ");
        assert!(slug.starts_with("my-great-site-"), "{slug}");
        assert!(is_dns_label(&slug));
    }

    #[test]
    fn test_slug_without_usable_characters_is_hash_only() {
        let slug = generate_slug_name(SITE, "日本語");
        assert_eq!(slug.len(), SLUG_HASH_LEN);
        assert!(is_dns_label(&slug));
        assert_eq!(generate_slug_name(SITE, "").len(), SLUG_HASH_LEN);
    }

    #[test]
    fn test_long_display_names_fit_every_derived_name() {
        let display = "Very Long Project Name ".repeat(5);

        let org = generate_slug_name(TenantKind::Organization, &display);
        assert_eq!(org.len(), TenantKind::Organization.max_local_len());
        let namespace = organization_namespace(&org);
        assert!(namespace.len() <= DNS_LABEL_MAX_LEN, "{namespace}");
        assert!(is_dns_label(&namespace));

        let project = generate_slug_name(TenantKind::Project, &display);
        let namespace = project_namespace(&project);
        assert!(namespace.len() <= DNS_LABEL_MAX_LEN, "{namespace}");
        assert!(is_dns_label(&namespace));

        let site = generate_slug_name(SITE, &display);
        for name in [format!("{site}-credentials"), format!("{site}-web"), site.clone()] {
            assert!(name.len() <= DNS_LABEL_MAX_LEN, "{name}");
            assert!(is_dns_label(&name), "{name}");
        }
    }

    #[test]
    fn test_long_generated_slugs_resolve() {
        let display = "Very Long Name ".repeat(10);
        let project = generate_slug_name(TenantKind::Project, &display);
        let site = generate_slug_name(SITE, &display);
        let resolved = resolve(SITE, &site_fq_name(&project, &site)).unwrap();
        assert_eq!(resolved.local_name, site);
        assert_eq!(resolved.parent_local_name, Some(project));
    }

    #[test]
    fn test_generated_slug_round_trips_through_fqn() {
        let slug = generate_slug_name(SITE, "Blog");
        let fqn = site_fq_name("acme", &slug);
        assert_eq!(resolve_site(&fqn).unwrap(), (slug, "acme".to_string()));
    }
}
