// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Tenant Operator - multi-tenant site hosting on Kubernetes
//!
//! The tenant operator turns three tenancy levels into Kubernetes objects:
//!
//! - an **organization** is a namespace labelled `tenancy.dev/kind=organization`
//! - a **project** is a namespace labelled `tenancy.dev/kind=project` that
//!   belongs to one organization
//! - a **site** is a [`crd::Site`] custom resource inside a project namespace
//!
//! Each level owns derived objects (role bindings, quotas, deployments,
//! services, ingresses and secrets). Controllers keep the derived objects in
//! sync with their parent, recreate them when they are deleted, and leave
//! garbage collection to owner references.
//!
//! ## Modules
//!
//! - [`api`] - Tenant-facing create, read, update, delete and list operations
//! - [`names`] - Fully-qualified names and generated slugs
//! - [`reconcilers`] - Per-level reconcilers and the shared reconcile flow
//! - [`sync`] - Create-or-update of a single derived object
//! - [`dispatch`] - Watches, work queue and worker pool
//! - [`store`] - Object store abstraction over the API server
//! - [`config`] - Command-line and environment configuration
//!
//! ## Example
//!
//! ```rust
//! use tenant_operator::names::{project_fq_name, resolve_project};
//!
//! let fq = project_fq_name("acme");
//! assert_eq!(fq, "project/acme");
//! assert_eq!(resolve_project(&fq).unwrap(), "acme");
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod crd;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod labels;
pub mod metrics;
pub mod names;
pub mod reconcilers;
pub mod retry;
pub mod selector;
pub mod status_reasons;
pub mod store;
pub mod sync;
