// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Watch dispatch: from store changes to reconcile passes.
//!
//! The [`Manager`] owns what all controllers share (the reconcile context,
//! worker settings and the shutdown signal) and runs a set of controller
//! registrations side by side until shutdown.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tenant_operator::dispatch::{ControllerConfig, Manager};
//! use tenant_operator::events::NoopEventRecorder;
//! use tenant_operator::reconcilers::{organization, project, site, Context};
//! use tenant_operator::store::MemoryStore;
//!
//! # async fn example() {
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! let ctx = Context::new(MemoryStore::new(), Arc::new(NoopEventRecorder));
//! let manager = Manager::new(ctx, ControllerConfig::default(), shutdown);
//! manager
//!     .run(&[organization::register, project::register, site::register])
//!     .await;
//! # }
//! ```

pub mod controller;
pub mod queue;
pub mod watch;

pub use controller::{Controller, ControllerConfig, ControllerTask};
pub use queue::{QueueConfig, WorkQueue};

use crate::reconcilers::{Context, Reconciler};
use crate::store::ObjectStore;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Builds one controller from the shared manager.
pub type Registration<S> = fn(&Manager<S>) -> ControllerTask;

/// Runs controllers over a shared context until shutdown.
pub struct Manager<S> {
    ctx: Arc<Context<S>>,
    config: ControllerConfig,
    shutdown: tokio::sync::watch::Receiver<bool>,
}

impl<S: ObjectStore> Manager<S> {
    /// Manager over `ctx`. Controllers stop once `shutdown` turns `true` or
    /// its sender is dropped.
    pub fn new(
        ctx: Context<S>,
        config: ControllerConfig,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Self {
        Self {
            ctx: Arc::new(ctx),
            config,
            shutdown,
        }
    }

    /// Shared reconcile context.
    #[must_use]
    pub fn context(&self) -> &Arc<Context<S>> {
        &self.ctx
    }

    /// Start building a controller for `reconciler`.
    pub fn controller<R: Reconciler<S>>(&self, reconciler: R) -> Controller<S, R> {
        Controller::new(
            reconciler,
            Arc::clone(&self.ctx),
            self.config.clone(),
            self.shutdown.clone(),
        )
    }

    /// Run every registration to completion.
    pub async fn run(&self, registrations: &[Registration<S>]) {
        info!(controllers = registrations.len(), "Starting controllers");
        let mut tasks = JoinSet::new();
        for register in registrations {
            tasks.spawn(register(self));
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "Controller terminated abnormally");
            }
        }
        info!("All controllers stopped");
    }
}
