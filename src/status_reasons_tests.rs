// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons` module

#[cfg(test)]
mod tests {
    use crate::status_reasons::*;

    #[test]
    fn test_condition_type_ready() {
        assert_eq!(CONDITION_TYPE_READY, "Ready");
    }

    #[test]
    fn test_event_reasons_are_camel_case() {
        for reason in [
            REASON_CREATED,
            REASON_UPDATED,
            REASON_UNCHANGED,
            REASON_SYNC_FAILED,
            REASON_ALL_SYNCED,
        ] {
            assert!(reason.chars().next().is_some_and(char::is_uppercase));
            assert!(!reason.contains(' '));
        }
    }

    #[test]
    fn test_condition_status() {
        assert_eq!(condition_status(true), "True");
        assert_eq!(condition_status(false), "False");
    }
}
