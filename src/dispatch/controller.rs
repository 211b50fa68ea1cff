// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! One running controller: watch feeds, a work queue and a worker pool.
//!
//! ```text
//! parent watch ──┐
//! owned watch  ──┼──► WorkQueue ──► worker 0..n ──► reconcile()
//! owned watch  ──┘        ▲                            │
//!                         └──── retry with backoff ◄───┘
//! ```
//!
//! Workers pull keys until the queue is shut down. A pass that fails with a
//! retryable error is requeued with backoff; anything else is forgotten.

use super::queue::{QueueConfig, WorkQueue};
use super::watch::{owned_keys, parent_keys, KeyStream};
use crate::constants::DEFAULT_WORKERS;
use crate::labels::MANAGED_BY_SELECTOR;
use crate::metrics;
use crate::reconcilers::{reconcile, Context, Reconciler};
use crate::store::{ObjectStore, StoreObject};
use futures::future::BoxFuture;
use futures::stream;
use futures::StreamExt;
use kube::Resource;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A controller ready to be awaited. Completes after shutdown.
pub type ControllerTask = BoxFuture<'static, ()>;

/// Worker pool and queue settings shared by all controllers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Concurrent reconcile passes per controller
    pub workers: usize,
    /// Debounce and retry policy
    pub queue: QueueConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue: QueueConfig::default(),
        }
    }
}

/// Builder and runner for one reconciler.
pub struct Controller<S, R> {
    reconciler: Arc<R>,
    ctx: Arc<Context<S>>,
    config: ControllerConfig,
    shutdown: watch::Receiver<bool>,
    queue: Arc<WorkQueue>,
    feeds: Vec<KeyStream>,
    _store: PhantomData<fn() -> S>,
}

impl<S, R> Controller<S, R>
where
    S: ObjectStore,
    R: Reconciler<S>,
{
    /// Controller watching the reconciler's parent kind.
    pub fn new(
        reconciler: R,
        ctx: Arc<Context<S>>,
        config: ControllerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let reconciler = Arc::new(reconciler);
        let events = ctx
            .store
            .watch::<R::Parent>(None, reconciler.parent_selector());
        let predicate = Arc::clone(&reconciler);
        let parents = parent_keys(events, move |parent: &R::Parent| predicate.matches(parent));
        let queue = Arc::new(WorkQueue::new(config.queue.clone()));

        Self {
            reconciler,
            ctx,
            config,
            shutdown,
            queue,
            feeds: vec![parents],
            _store: PhantomData,
        }
    }

    /// Also reconcile the parent when an owned object of kind `K` changes.
    ///
    /// Only objects carrying the operator's managed-by label are watched.
    #[must_use]
    pub fn owns<K: StoreObject>(mut self) -> Self {
        let events = self.ctx.store.watch::<K>(None, Some(MANAGED_BY_SELECTOR));
        self.feeds.push(owned_keys(
            events,
            R::Parent::api_version(&()).to_string(),
            R::Parent::kind(&()).to_string(),
            self.reconciler.namespaced(),
        ));
        self
    }

    /// Queue this controller pulls from.
    #[must_use]
    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    /// Run until shutdown is signalled.
    pub fn run(self) -> ControllerTask {
        Box::pin(self.execute())
    }

    async fn execute(self) {
        let Self {
            reconciler,
            ctx,
            config,
            mut shutdown,
            queue,
            feeds,
            ..
        } = self;
        let kind = reconciler.kind();
        let workers = config.workers.max(1);
        info!(kind, workers, "Starting controller");

        let mut pool = JoinSet::new();
        for id in 0..workers {
            pool.spawn(work(
                id,
                Arc::clone(&reconciler),
                Arc::clone(&ctx),
                Arc::clone(&queue),
            ));
        }

        let mut keys = stream::select_all(feeds);
        let mut feeds_open = true;
        loop {
            tokio::select! {
                key = keys.next(), if feeds_open => match key {
                    Some(key) => {
                        queue.enqueue(key);
                        metrics::set_queue_depth(kind, queue.len());
                    }
                    None => {
                        warn!(kind, "All watch feeds ended, waiting for shutdown");
                        feeds_open = false;
                    }
                },
                () = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!(kind, "Shutting down controller");
        queue.shut_down();
        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                error!(kind, error = %err, "Worker terminated abnormally");
            }
        }
        info!(kind, "Controller stopped");
    }
}

/// Resolves once shutdown is requested. A closed channel counts as a request.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn work<S, R>(id: usize, reconciler: Arc<R>, ctx: Arc<Context<S>>, queue: Arc<WorkQueue>)
where
    S: ObjectStore,
    R: Reconciler<S>,
{
    let kind = reconciler.kind();
    debug!(kind, worker = id, "Worker started");

    while let Some(key) = queue.next().await {
        metrics::set_queue_depth(kind, queue.len());
        match reconcile(reconciler.as_ref(), &ctx, &key).await {
            Ok(outcome) => {
                debug!(kind, worker = id, key = %key, outcome = outcome.as_str(), "Pass finished");
                queue.forget(&key);
            }
            Err(err) if err.is_retryable() => {
                if queue.retry(&key) {
                    metrics::record_requeue(kind, err.category());
                    warn!(
                        kind,
                        key = %key,
                        failures = queue.failures(&key),
                        error = %err,
                        "Reconcile failed, requeued"
                    );
                } else {
                    metrics::record_dropped_key(kind);
                    error!(kind, key = %key, error = %err, "Reconcile kept failing, dropping key");
                }
            }
            Err(err) => {
                queue.forget(&key);
                error!(kind, key = %key, error = %err, "Reconcile failed permanently");
            }
        }
        queue.done(&key);
    }

    debug!(kind, worker = id, "Worker stopped");
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
