// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Caller-visible status for tenant API errors.
//!
//! Every [`Error`] maps to one status, whichever operation produced it, so a
//! transport layer can translate failures uniformly.
//!
//! # Usage
//!
//! ```rust
//! use tenant_operator::api::status::{map_error, StatusCode};
//! use tenant_operator::errors::Error;
//!
//! let status = map_error(&Error::NotFound("project acme".into()));
//! assert_eq!(status.code, StatusCode::NotFound);
//! assert_eq!(status.http_status, 404);
//! ```

use crate::errors::Error;
use std::fmt;

/// Message shown for transient failures; store details are not exposed.
pub const UNAVAILABLE_MESSAGE: &str = "the service is temporarily unavailable, please retry";

/// Caller-visible status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Malformed name or missing field
    InvalidArgument,
    /// The addressed tenant does not exist, or is outside the caller's organization
    NotFound,
    /// Duplicate create or stale update
    AlreadyExists,
    /// The caller may not perform the operation
    PermissionDenied,
    /// The tenant exists but its metadata is unusable
    FailedPrecondition,
    /// Retry later
    Unavailable,
    /// Anything else
    Internal,
}

impl StatusCode {
    /// Name of the code, e.g. `InvalidArgument`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::InvalidArgument => "InvalidArgument",
            StatusCode::NotFound => "NotFound",
            StatusCode::AlreadyExists => "AlreadyExists",
            StatusCode::PermissionDenied => "PermissionDenied",
            StatusCode::FailedPrecondition => "FailedPrecondition",
            StatusCode::Unavailable => "Unavailable",
            StatusCode::Internal => "Internal",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller sees for a failed operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiStatus {
    /// Status code
    pub code: StatusCode,
    /// HTTP equivalent of `code`
    pub http_status: u16,
    /// Human-readable message
    pub message: String,
}

/// Map an error to its caller-visible status.
///
/// | Error | Code | HTTP |
/// |-------|------|------|
/// | `InvalidInput` | `InvalidArgument` | 400 |
/// | `NotFound` | `NotFound` | 404 |
/// | `Conflict` | `AlreadyExists` | 409 |
/// | `Forbidden` | `PermissionDenied` | 403 |
/// | `InvalidMetadata` | `FailedPrecondition` | 412 |
/// | `Transient` | `Unavailable` | 503 |
/// | `Internal` | `Internal` | 500 |
#[must_use]
pub fn map_error(err: &Error) -> ApiStatus {
    let (code, http_status, message) = match err {
        Error::InvalidInput(msg) => (StatusCode::InvalidArgument, 400, msg.clone()),
        Error::NotFound(msg) => (StatusCode::NotFound, 404, msg.clone()),
        Error::Conflict(msg) => (StatusCode::AlreadyExists, 409, msg.clone()),
        Error::Forbidden(msg) => (StatusCode::PermissionDenied, 403, msg.clone()),
        Error::InvalidMetadata(msg) => (StatusCode::FailedPrecondition, 412, msg.clone()),
        Error::Transient(_) => (
            StatusCode::Unavailable,
            503,
            UNAVAILABLE_MESSAGE.to_string(),
        ),
        Error::Internal(msg) => (StatusCode::Internal, 500, msg.clone()),
    };
    ApiStatus {
        code,
        http_status,
        message,
    }
}

impl From<&Error> for ApiStatus {
    fn from(err: &Error) -> Self {
        map_error(err)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
