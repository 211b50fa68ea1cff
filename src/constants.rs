// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the tenant operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the tenant CRDs
pub const API_GROUP: &str = "tenancy.dev";

/// API version for the tenant CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "tenancy.dev/v1alpha1";

/// Kind name for the `Site` custom resource
pub const KIND_SITE: &str = "Site";

/// Logical kind used in logs and metrics for organization namespaces
pub const KIND_ORGANIZATION: &str = "Organization";

/// Logical kind used in logs and metrics for project namespaces
pub const KIND_PROJECT: &str = "Project";

// ============================================================================
// Operator Identity
// ============================================================================

/// Name the operator reports as (events, managed-by label, field manager)
pub const OPERATOR_NAME: &str = "tenant-operator";

// ============================================================================
// Tenant Addressing
// ============================================================================

/// Store namespace prefix for organizations (`org-<slug>`)
pub const ORGANIZATION_NAMESPACE_PREFIX: &str = "org-";

/// Store namespace prefix for projects (`proj-<slug>`)
pub const PROJECT_NAMESPACE_PREFIX: &str = "proj-";

/// Maximum length of a DNS-1123 label
pub const DNS_LABEL_MAX_LEN: usize = 63;

/// Longest suffix appended to a site name for its derived objects (`-credentials`)
pub const SITE_DERIVED_SUFFIX_MAX_LEN: usize = 12;

/// Number of hex characters of the display-name digest appended to generated slugs
pub const SLUG_HASH_LEN: usize = 6;

// ============================================================================
// Controller Timing Defaults
// ============================================================================

/// Default number of reconcile workers per controller
pub const DEFAULT_WORKERS: usize = 2;

/// Default debounce window for collapsing bursts of notifications (milliseconds)
pub const DEFAULT_DEBOUNCE_MILLIS: u64 = 250;

/// Default number of retries before a failing key is dropped
pub const DEFAULT_MAX_RETRIES: u32 = 12;

/// Default requeue delay after the first failure of a key (milliseconds)
pub const DEFAULT_INITIAL_BACKOFF_MILLIS: u64 = 500;

/// Default ceiling on the requeue delay of a failing key (seconds)
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 300;

/// Default timeout for a single object store call (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default listen address of the metrics and health endpoint
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// RBAC
// ============================================================================

/// API group of RBAC roles
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Cluster role granted to organization owners
pub const CLUSTER_ROLE_ORGANIZATION_OWNER: &str = "tenant-operator:organization:owner";

/// Cluster role granted to organization members
pub const CLUSTER_ROLE_ORGANIZATION_MEMBER: &str = "tenant-operator:organization:member";

/// Cluster role granted to project owners
pub const CLUSTER_ROLE_PROJECT_OWNER: &str = "tenant-operator:project:owner";

// ============================================================================
// Project Defaults
// ============================================================================

/// Default CPU request applied to containers without one
pub const PROJECT_DEFAULT_CPU_REQUEST: &str = "100m";

/// Default memory request applied to containers without one
pub const PROJECT_DEFAULT_MEMORY_REQUEST: &str = "128Mi";

/// Default CPU limit applied to containers without one
pub const PROJECT_DEFAULT_CPU_LIMIT: &str = "1";

/// Default memory limit applied to containers without one
pub const PROJECT_DEFAULT_MEMORY_LIMIT: &str = "512Mi";

/// Maximum number of pods in a project
pub const PROJECT_QUOTA_PODS: &str = "50";

/// Maximum total CPU requests in a project
pub const PROJECT_QUOTA_CPU: &str = "8";

/// Maximum total memory requests in a project
pub const PROJECT_QUOTA_MEMORY: &str = "16Gi";

// ============================================================================
// Site Defaults
// ============================================================================

/// Container image used when a site does not pin one
pub const DEFAULT_SITE_IMAGE: &str = "docker.io/library/wordpress:6.6-apache";

/// Replica count used when a site does not set one
pub const DEFAULT_SITE_REPLICAS: i32 = 1;

/// Port the site web container listens on
pub const SITE_HTTP_PORT: i32 = 80;

/// Name of the web container in site deployments
pub const SITE_CONTAINER_NAME: &str = "web";

/// Length of generated site credentials
pub const SITE_CREDENTIAL_LENGTH: usize = 32;

/// Keys of the generated site credentials secret
pub const SITE_CREDENTIAL_KEYS: &[&str] = &["DB_PASSWORD", "AUTH_KEY", "SECURE_AUTH_KEY"];
