// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration from flags and environment variables.
//!
//! Every flag can also be set through the environment variable named in its
//! help text, which is how the deployment manifests configure the operator.

use crate::constants::{
    DEFAULT_DEBOUNCE_MILLIS, DEFAULT_INITIAL_BACKOFF_MILLIS, DEFAULT_MAX_BACKOFF_SECS,
    DEFAULT_MAX_RETRIES, DEFAULT_METRICS_ADDR, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use crate::dispatch::{ControllerConfig, QueueConfig, Registration};
use crate::errors::{Error, Result};
use crate::reconcilers::{organization, project, site};
use crate::store::ObjectStore;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// A controller that can be switched on or off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum ControllerKind {
    /// Organization namespaces
    Organization,
    /// Project namespaces
    Project,
    /// Sites
    Site,
}

impl ControllerKind {
    /// Registration function starting this controller.
    #[must_use]
    pub fn registration<S: ObjectStore>(self) -> Registration<S> {
        match self {
            ControllerKind::Organization => organization::register::<S>,
            ControllerKind::Project => project::register::<S>,
            ControllerKind::Site => site::register::<S>,
        }
    }
}

/// Multi-tenant hosting operator: organizations, projects and sites.
#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(name = "tenant-operator", version, about, long_about = None)]
pub struct OperatorConfig {
    /// Concurrent reconcile passes per controller
    #[arg(long, env = "TENANT_OPERATOR_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Window in which repeated notifications for one key collapse (ms)
    #[arg(long, env = "TENANT_OPERATOR_DEBOUNCE_MS", default_value_t = DEFAULT_DEBOUNCE_MILLIS)]
    pub debounce_ms: u64,

    /// Failures tolerated before a key is dropped
    #[arg(long, env = "TENANT_OPERATOR_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Requeue delay after the first failure (ms)
    #[arg(
        long,
        env = "TENANT_OPERATOR_INITIAL_BACKOFF_MS",
        default_value_t = DEFAULT_INITIAL_BACKOFF_MILLIS
    )]
    pub initial_backoff_ms: u64,

    /// Ceiling on the requeue delay (s)
    #[arg(
        long,
        env = "TENANT_OPERATOR_MAX_BACKOFF_SECS",
        default_value_t = DEFAULT_MAX_BACKOFF_SECS
    )]
    pub max_backoff_secs: u64,

    /// Timeout of a single store call (s)
    #[arg(
        long,
        env = "TENANT_OPERATOR_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    pub request_timeout_secs: u64,

    /// Listen address of the metrics and health endpoint
    #[arg(long, env = "TENANT_OPERATOR_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Log format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, ignore_case = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Controllers to run, comma separated
    #[arg(
        long,
        env = "TENANT_OPERATOR_CONTROLLERS",
        value_enum,
        value_delimiter = ',',
        default_value = "organization,project,site"
    )]
    pub controllers: Vec<ControllerKind>,
}

impl OperatorConfig {
    /// Check values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidInput(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.controllers.is_empty() {
            return Err(Error::InvalidInput(
                "at least one controller must be enabled".to_string(),
            ));
        }
        if self.initial_backoff() > self.max_backoff() {
            return Err(Error::InvalidInput(format!(
                "initial backoff {:?} exceeds maximum backoff {:?}",
                self.initial_backoff(),
                self.max_backoff()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Queue policy for every controller.
    #[must_use]
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            max_retries: self.max_retries,
            initial_backoff: self.initial_backoff(),
            max_backoff: self.max_backoff(),
        }
    }

    /// Worker pool and queue settings for every controller.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            workers: self.workers,
            queue: self.queue_config(),
        }
    }

    /// Registrations of the enabled controllers, each at most once, in
    /// organization, project, site order.
    #[must_use]
    pub fn registrations<S: ObjectStore>(&self) -> Vec<Registration<S>> {
        let mut kinds = self.controllers.clone();
        kinds.sort();
        kinds.dedup();
        kinds.into_iter().map(ControllerKind::registration).collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
