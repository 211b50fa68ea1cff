// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deduplicating, rate-limited work queue of reconcile keys.
//!
//! Semantics:
//!
//! - a key is queued at most once; adding a queued key is a no-op
//! - a key handed out by [`WorkQueue::next`] is *processing* until
//!   [`WorkQueue::done`]; adding it meanwhile marks it dirty, and it is
//!   queued again exactly once when the pass completes. Two workers never
//!   hold the same key
//! - [`WorkQueue::enqueue`] delays by the debounce window, so a burst of
//!   notifications collapses into one pass
//! - [`WorkQueue::retry`] delays by the per-key backoff and gives up after
//!   the configured number of failures; notifications arriving during the
//!   backoff do not shorten it
//! - after [`WorkQueue::shut_down`], `next` returns `None`

use crate::constants::{
    DEFAULT_DEBOUNCE_MILLIS, DEFAULT_INITIAL_BACKOFF_MILLIS, DEFAULT_MAX_BACKOFF_SECS,
    DEFAULT_MAX_RETRIES,
};
use crate::retry::backoff_delay;
use crate::store::ObjectKey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Timing and retry policy of a [`WorkQueue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Window within which repeated notifications collapse into one pass
    pub debounce: Duration,
    /// Failures tolerated before a key is dropped
    pub max_retries: u32,
    /// Delay after the first failure
    pub initial_backoff: Duration,
    /// Ceiling on the failure delay
    pub max_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MILLIS),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MILLIS),
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
        }
    }
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    delayed: HashMap<ObjectKey, Instant>,
    failures: HashMap<ObjectKey, u32>,
    shutting_down: bool,
}

impl QueueState {
    fn add(&mut self, key: ObjectKey) -> bool {
        if self.shutting_down {
            return false;
        }
        if self.processing.contains(&key) {
            self.dirty.insert(key);
            return false;
        }
        if self.queued.insert(key.clone()) {
            self.ready.push_back(key);
            return true;
        }
        false
    }

    fn promote_due(&mut self, now: Instant) {
        let due: Vec<ObjectKey> = self
            .delayed
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in due {
            self.delayed.remove(&key);
            self.add(key);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.delayed.values().min().copied()
    }
}

/// Work queue shared by a controller's watch feeds and workers.
pub struct WorkQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    /// Empty queue.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `key` now.
    pub fn add(&self, key: ObjectKey) {
        if self.lock().add(key) {
            self.notify.notify_waiters();
        }
    }

    /// Queue `key` after the debounce window. Further notifications inside
    /// the window are absorbed.
    pub fn enqueue(&self, key: ObjectKey) {
        self.add_after(key, self.config.debounce);
    }

    /// Queue `key` once `delay` has elapsed. An earlier pending deadline for
    /// the same key wins, except while the key is backing off after a
    /// failure: then the later deadline wins, so a notification never cuts
    /// a backoff short.
    pub fn add_after(&self, key: ObjectKey, delay: Duration) {
        let deadline = Instant::now() + delay;
        {
            let mut state = self.lock();
            if state.shutting_down || state.queued.contains(&key) {
                return;
            }
            let backing_off = state.failures.get(&key).is_some_and(|f| *f > 0);
            if let Some(current) = state.delayed.get_mut(&key) {
                *current = if backing_off {
                    (*current).max(deadline)
                } else {
                    (*current).min(deadline)
                };
            } else if delay.is_zero() {
                state.add(key);
            } else {
                state.delayed.insert(key, deadline);
            }
        }
        self.notify.notify_waiters();
    }

    /// Wait for the next key to process. `None` once the queue is shut down.
    pub async fn next(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wake_at = {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                state.promote_due(Instant::now());
                if let Some(key) = state.ready.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                state.next_deadline()
            };

            match wake_at {
                Some(deadline) => {
                    tokio::select! {
                        () = &mut notified => {}
                        () = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark a pass over `key` as finished. A key added while it was being
    /// processed is queued again.
    pub fn done(&self, key: &ObjectKey) {
        let requeued = {
            let mut state = self.lock();
            state.processing.remove(key);
            state.dirty.remove(key) && state.add(key.clone())
        };
        if requeued {
            self.notify.notify_waiters();
        }
    }

    /// Schedule `key` again after its backoff delay.
    ///
    /// Returns `false`, and forgets the key, once it has failed more than
    /// `max_retries` times.
    pub fn retry(&self, key: &ObjectKey) -> bool {
        let failures = {
            let mut state = self.lock();
            let failures = state.failures.entry(key.clone()).or_insert(0);
            *failures += 1;
            let failures = *failures;
            if failures > self.config.max_retries {
                state.failures.remove(key);
                return false;
            }
            failures
        };
        let delay = backoff_delay(
            failures,
            self.config.initial_backoff,
            self.config.max_backoff,
        );
        debug!(key = %key, failures, delay = ?delay, "Requeueing with backoff");
        self.add_after(key.clone(), delay);
        true
    }

    /// Clear the failure count of `key`.
    pub fn forget(&self, key: &ObjectKey) {
        self.lock().failures.remove(key);
    }

    /// Consecutive failures recorded for `key`.
    #[must_use]
    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.lock().failures.get(key).copied().unwrap_or(0)
    }

    /// Keys waiting, ready or delayed.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.ready.len() + state.delayed.len()
    }

    /// Whether no key is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop handing out keys. Passes already in progress are unaffected.
    pub fn shut_down(&self) {
        self.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    /// Whether [`WorkQueue::shut_down`] was called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod queue_tests;
