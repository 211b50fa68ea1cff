// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tenant_operator::{
    api::{CallerContext, NewOrganization, NewProject, TenantApi},
    dispatch::{ControllerConfig, Manager, QueueConfig, Registration},
    events::CollectingEventRecorder,
    reconcilers::{organization, project, site, Context},
    store::MemoryStore,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

pub const ORGANIZATION: &str = "orgs/wonder";
pub const PROJECT: &str = "project/acme";

/// How long [`eventually`] waits before failing a test.
const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// A running operator over an in-memory store.
pub struct TestOperator {
    pub store: MemoryStore,
    pub recorder: Arc<CollectingEventRecorder>,
    pub api: TenantApi<MemoryStore>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TestOperator {
    /// Start all three controllers with short queue delays.
    pub fn start() -> Self {
        let store = MemoryStore::new();
        let recorder = Arc::new(CollectingEventRecorder::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let manager = Manager::new(
            Context::new(store.clone(), recorder.clone()),
            fast_config(),
            shutdown_rx,
        );
        let registrations: Vec<Registration<MemoryStore>> = vec![
            organization::register::<MemoryStore>,
            project::register::<MemoryStore>,
            site::register::<MemoryStore>,
        ];
        let handle = tokio::spawn(async move { manager.run(&registrations).await });

        Self {
            api: TenantApi::new(store.clone()),
            store,
            recorder,
            shutdown,
            handle,
        }
    }

    /// Ask the controllers to stop and wait for them.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("operator did not stop in time")
            .expect("operator task panicked");
    }
}

/// Queue settings that keep tests quick.
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        workers: 2,
        queue: QueueConfig {
            debounce: Duration::from_millis(10),
            max_retries: 5,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
        },
    }
}

/// Alice, working in the wonder organization.
pub fn alice() -> CallerContext {
    CallerContext::new("alice", ORGANIZATION)
}

/// Create the wonder organization and the acme project as alice.
pub async fn seed_tenancy(api: &TenantApi<MemoryStore>) {
    api.create_organization(&alice(), NewOrganization::named(ORGANIZATION))
        .await
        .expect("create organization");
    api.create_project(&alice(), NewProject::named(PROJECT))
        .await
        .expect("create project");
}

/// Poll `check` until it holds, failing the test after a few seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + CONVERGENCE_TIMEOUT;
    loop {
        if check().await {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until the store has seen no writes for a few queue cycles.
pub async fn settle(store: &MemoryStore) {
    let mut last = store.writes();
    let mut quiet = 0;
    let deadline = Instant::now() + CONVERGENCE_TIMEOUT;
    while quiet < 5 {
        assert!(Instant::now() < deadline, "store never settled");
        sleep(Duration::from_millis(50)).await;
        let now = store.writes();
        if now == last {
            quiet += 1;
        } else {
            quiet = 0;
            last = now;
        }
    }
}
