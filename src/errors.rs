// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy shared by the store clients, the sync primitive, the
//! reconcilers and the caller-facing tenant API.
//!
//! Every store failure is classified into one of these variants before it
//! leaves the store layer, so reconcilers and API handlers never inspect
//! store-specific error details.
//!
//! | Variant | Meaning | Reconciler | Caller |
//! |---------|---------|------------|--------|
//! | `InvalidInput` | Malformed FQN, missing field | not retried | 400 |
//! | `NotFound` | Resource absent | terminal success | 404 |
//! | `Conflict` | Duplicate create, stale version | retried via re-fetch | 409 |
//! | `Transient` | Store unreachable, timeout | retried with backoff | 503 after budget |
//! | `InvalidMetadata` | Required labels/annotations missing | skipped, logged | 412 |
//! | `Forbidden` | Principal lacks access | not retried | 403 |
//! | `Internal` | Anything else | retried with backoff | 500 |

use thiserror::Error;

/// Errors produced anywhere in the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller-supplied input is malformed (bad FQN, missing required field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate create, or an update carrying a stale resource version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store is unreachable or did not answer in time.
    #[error("transient store error: {0}")]
    Transient(String),

    /// A parent resource exists but lacks required labels or annotations.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The acting principal is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unexpected failure (serialization, unknown store error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a reconcile pass that failed with this error should be requeued.
    ///
    /// Data problems the operator will not fix by itself (`InvalidInput`,
    /// `InvalidMetadata`, `Forbidden`) are never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Conflict(_) | Error::Transient(_) | Error::NotFound(_) | Error::Internal(_)
        )
    }

    /// Whether this error reports a missing resource.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether this error reports a version conflict or duplicate create.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Whether this error is a transient store failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }

    /// Short, stable category name used for metrics labels and event reasons.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Transient(_) => "transient",
            Error::InvalidMetadata(_) => "invalid_metadata",
            Error::Forbidden(_) => "forbidden",
            Error::Internal(_) => "internal",
        }
    }

    /// Classify a Kubernetes API error, prefixing the message with `context`
    /// (typically `"<Kind> <namespace>/<name>"`).
    #[must_use]
    pub fn from_kube(err: &kube::Error, context: &str) -> Self {
        match err {
            kube::Error::Api(response) => {
                let message = format!("{context}: {}", response.message);
                match response.code {
                    404 => Error::NotFound(message),
                    409 => Error::Conflict(message),
                    400 | 422 => Error::InvalidInput(message),
                    401 | 403 => Error::Forbidden(message),
                    429 | 500..=599 => Error::Transient(message),
                    _ => Error::Internal(message),
                }
            }
            kube::Error::Service(_) => Error::Transient(format!("{context}: {err}")),
            _ => Error::Internal(format!("{context}: {err}")),
        }
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Error::from_kube(&err, "kubernetes api")
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("serialization failed: {err}"))
    }
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
