// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Condition types and reasons for tenant resources, and the reasons attached
//! to the events recorded for each derived object.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a
//! condition has a particular status, following Kubernetes conventions.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   observedGeneration: 3
//!   conditions:
//!     - type: Ready
//!       status: "True"
//!       reason: AllSynced
//!       message: "4 derived objects in sync"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Encompassing readiness condition written by the site reconciler.
pub const CONDITION_TYPE_READY: &str = "Ready";

// ============================================================================
// Condition Reasons
// ============================================================================

/// Every derived object was converged in the last pass.
pub const REASON_ALL_SYNCED: &str = "AllSynced";

/// A derived object could not be converged; the pass will be retried.
pub const REASON_SYNC_FAILED: &str = "SyncFailed";

// ============================================================================
// Event Reasons (one event per derived object per pass)
// ============================================================================

/// A derived object did not exist and was created.
pub const REASON_CREATED: &str = "Created";

/// A derived object drifted from its desired state and was updated.
pub const REASON_UPDATED: &str = "Updated";

/// A derived object already matched its desired state.
pub const REASON_UNCHANGED: &str = "Unchanged";

/// Map a condition status boolean to the Kubernetes string form.
#[must_use]
pub fn condition_status(ok: bool) -> &'static str {
    if ok {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
