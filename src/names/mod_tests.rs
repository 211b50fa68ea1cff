// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the name resolver

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_resolve_each_kind() {
        assert_eq!(resolve_organization("orgs/wonder").unwrap(), "wonder");
        assert_eq!(resolve_project("project/acme").unwrap(), "acme");
        assert_eq!(
            resolve_site("project/acme/site/blog").unwrap(),
            ("blog".to_string(), "acme".to_string())
        );

        let resolved = resolve(TenantKind::Site, "project/acme/site/blog").unwrap();
        assert_eq!(resolved.local_name, "blog");
        assert_eq!(resolved.parent_local_name.as_deref(), Some("acme"));
        assert_eq!(
            resolve(TenantKind::Project, "project/acme")
                .unwrap()
                .parent_local_name,
            None
        );
    }

    #[test]
    fn test_grammar_rejection() {
        for fqn in [
            "not-fully-qualified",
            "project//site/x",
            "project/x/site/",
            "project/x/site",
            "/project/x",
            "project/./x",
            "project/a/../b",
            "",
        ] {
            let err = resolve(TenantKind::Site, fqn).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{fqn} should be rejected");
        }
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        assert!(resolve_organization("project/acme").is_err());
        assert!(resolve_project("orgs/wonder").is_err());
        assert!(resolve_project("project/acme/site/blog").is_err());
        assert!(resolve_site("project/acme").is_err());
        assert!(resolve_organization("org/wonder").is_err());
    }

    #[test]
    fn test_slugs_must_be_dns_labels() {
        assert!(resolve_project("project/Acme").is_err());
        assert!(resolve_project("project/-acme").is_err());
        assert!(resolve_project("project/acme-").is_err());
        assert!(resolve_project("project/ac_me").is_err());
        assert!(resolve_site("project/acme/site/Blog").is_err());
        assert!(resolve_project(&format!("project/{}", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_slugs_must_leave_room_for_derived_names() {
        assert_eq!(TenantKind::Organization.max_local_len(), 59);
        assert_eq!(TenantKind::Project.max_local_len(), 58);
        assert_eq!(TenantKind::Site.max_local_len(), 51);

        assert!(resolve_organization(&format!("orgs/{}", "a".repeat(59))).is_ok());
        let err = resolve_organization(&format!("orgs/{}", "a".repeat(60))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        assert!(resolve_project(&format!("project/{}", "a".repeat(58))).is_ok());
        let err = resolve_project(&format!("project/{}", "a".repeat(59))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("longer than 58"), "{err}");

        assert!(resolve_site(&site_fq_name("acme", &"b".repeat(51))).is_ok());
        let err = resolve_site(&site_fq_name("acme", &"b".repeat(52))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        // The project segment of a site FQN is held to the project limit.
        let err = resolve_site(&site_fq_name(&"a".repeat(59), "blog")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_names_at_the_limit_build_valid_labels() {
        let org = "a".repeat(TenantKind::Organization.max_local_len());
        assert!(is_dns_label(&organization_namespace(&org)));
        let project = "a".repeat(TenantKind::Project.max_local_len());
        assert!(is_dns_label(&project_namespace(&project)));
        let site = "a".repeat(TenantKind::Site.max_local_len());
        assert!(is_dns_label(&format!("{site}-credentials")));
    }

    #[test]
    fn test_fq_names_round_trip() {
        for local in ["a", "acme", "blog-1f2e3d", "9lives"] {
            assert_eq!(resolve_organization(&organization_fq_name(local)).unwrap(), local);
            assert_eq!(resolve_project(&project_fq_name(local)).unwrap(), local);
            assert_eq!(
                resolve_site(&site_fq_name("acme", local)).unwrap(),
                (local.to_string(), "acme".to_string())
            );
        }
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("a//b/"), "a/b");
        assert_eq!(clean_path("a/./b"), "a/b");
        assert_eq!(clean_path("a/b/../c"), "a/c");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("/"), "/");
        assert!(is_clean_path("project/acme/site/blog"));
        assert!(!is_clean_path("project/acme/"));
    }

    #[test]
    fn test_is_dns_label() {
        assert!(is_dns_label("a"));
        assert!(is_dns_label("blog-7c1e2a"));
        assert!(!is_dns_label(""));
        assert!(!is_dns_label("-a"));
        assert!(!is_dns_label("a.b"));
        assert!(!is_dns_label("ÄBC"));
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(organization_namespace("wonder"), "org-wonder");
        assert_eq!(project_namespace("acme"), "proj-acme");
        assert_eq!(organization_from_namespace("org-wonder"), Some("wonder"));
        assert_eq!(organization_from_namespace("proj-acme"), None);
        assert_eq!(project_from_namespace("proj-acme"), Some("acme"));
        assert_eq!(project_from_namespace("proj-"), None);
    }

    #[test]
    fn test_tenant_scope_keys() {
        let scope = TenantScope::from_fq_name("orgs/wonder").unwrap();
        assert_eq!(scope.organization(), "wonder");
        assert_eq!(scope.organization_key(), ObjectKey::cluster("org-wonder"));
        assert_eq!(
            scope.project_key("project/acme").unwrap(),
            ObjectKey::cluster("proj-acme")
        );
        assert_eq!(
            scope.site_key("project/acme/site/blog").unwrap(),
            ObjectKey::namespaced("proj-acme", "blog")
        );
        assert!(scope.site_key("project/acme/site/").is_err());
        let err = scope
            .project_key(&format!("project/{}", "a".repeat(59)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(scope
            .site_key(&format!("project/acme/site/{}", "b".repeat(52)))
            .is_err());
        assert!(TenantScope::from_fq_name("wonder").is_err());
    }

    #[test]
    fn test_tenant_kind_labels() {
        assert_eq!(TenantKind::Organization.as_str(), "organization");
        assert_eq!(TenantKind::Project.to_string(), "project");
        assert_eq!(TenantKind::Site.as_str(), "site");
    }
}
