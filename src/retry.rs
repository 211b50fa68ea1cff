// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff.
//!
//! Two users share the same curve:
//!
//! - the tenant API wraps every store call in [`retry_transient`] so callers
//!   never observe transient failures while the budget lasts
//! - the work queue computes per-key requeue delays with [`backoff_delay`]

use crate::errors::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    /// Start time for tracking total elapsed time
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with specified parameters.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = jitter(interval, self.randomization_factor);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    /// Restart the schedule from the initial interval.
    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.start_time = Instant::now();
    }
}

/// Apply ±`factor` randomization to an interval.
fn jitter(interval: Duration, factor: f64) -> Duration {
    if factor == 0.0 {
        return interval;
    }

    let secs = interval.as_secs_f64();
    let delta = secs * factor;
    let mut rng = rand::thread_rng();
    let jittered = rng.gen_range((secs - delta)..=(secs + delta));

    Duration::from_secs_f64(jittered.max(0.0))
}

/// Create default exponential backoff configuration for store retries.
///
/// # Configuration
///
/// - **Initial interval**: 100ms
/// - **Max interval**: 30 seconds
/// - **Max elapsed time**: 5 minutes total
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
///
/// # Retry Schedule
///
/// 100ms, 200ms, 400ms, 800ms, 1.6s, 3.2s, 6.4s, 12.8s, 25.6s, then 30s
/// intervals until 5 minutes have elapsed.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Requeue delay after `failures` consecutive failures of one key.
///
/// `initial * 2^(failures-1)`, capped at `max`, with ±10% jitter.
/// `failures == 0` yields no delay.
#[must_use]
pub fn backoff_delay(failures: u32, initial: Duration, max: Duration) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let exponent = i32::try_from(failures - 1).unwrap_or(i32::MAX).min(30);
    let raw = initial.as_secs_f64() * BACKOFF_MULTIPLIER.powi(exponent);
    let capped = Duration::from_secs_f64(raw.min(max.as_secs_f64()));
    jitter(capped, RANDOMIZATION_FACTOR).min(max)
}

/// Retry an object store call while it fails with [`Error::Transient`].
///
/// Any other error is returned immediately. When the backoff budget runs
/// out, a generic retryable [`Error::Transient`] is returned.
///
/// # Errors
///
/// The first non-transient error, or `Transient` once the budget is spent.
///
/// # Example
///
/// ```no_run
/// use k8s_openapi::api::core::v1::Namespace;
/// use tenant_operator::retry::retry_transient;
/// use tenant_operator::store::{MemoryStore, ObjectKey, ObjectStore};
///
/// # async fn example(store: MemoryStore) -> tenant_operator::errors::Result<()> {
/// let key = ObjectKey::cluster("proj-acme");
/// let ns: Namespace = retry_transient(|| store.get(&key), "get project namespace").await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_transient<T, F, Fut>(operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_transient_with(default_backoff(), operation, operation_name).await
}

/// [`retry_transient`] with an explicit backoff schedule.
///
/// # Errors
///
/// See [`retry_transient`].
pub async fn retry_transient_with<T, F, Fut>(
    mut backoff: ExponentialBackoff,
    mut operation: F,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Store call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Transient store error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Retry budget exhausted, giving up"
                    );
                    return Err(Error::Transient(format!(
                        "{operation_name}: store unavailable after {attempt} attempts"
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
