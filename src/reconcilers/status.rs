// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for tenant resources.
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last flipped
//!
//! # Example
//!
//! ```rust
//! use tenant_operator::reconcilers::status::{create_condition, find_condition};
//!
//! let condition = create_condition("Ready", "True", "AllSynced", "4 derived objects in sync");
//! let conditions = vec![condition];
//! assert!(find_condition(&conditions, "Ready").is_some());
//! ```

use crate::crd::{Condition, SiteStatus};
use crate::status_reasons::CONDITION_TYPE_READY;
use chrono::Utc;

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in place.
///
/// `lastTransitionTime` is preserved when the status value does not change.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr| {
            curr.status == new_cond.status
                && curr.reason == new_cond.reason
                && curr.message == new_cond.message
        })
    })
}

/// Compute the site status to write after a pass, or `None` when the
/// current status already says the same thing.
#[must_use]
pub fn next_site_status(
    current: Option<&SiteStatus>,
    generation: Option<i64>,
    status: &str,
    reason: &str,
    message: &str,
) -> Option<SiteStatus> {
    let mut next = current.cloned().unwrap_or_default();
    set_condition(
        &mut next.conditions,
        CONDITION_TYPE_READY,
        status,
        reason,
        message,
    );
    next.observed_generation = generation;

    let unchanged = current.is_some_and(|current| {
        current.observed_generation == next.observed_generation
            && conditions_equal(&current.conditions, &next.conditions)
    });
    if unchanged {
        None
    } else {
        Some(next)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
