// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_every_error_maps_to_a_fixed_code() {
        let cases = [
            (Error::InvalidInput("x".into()), StatusCode::InvalidArgument, 400),
            (Error::NotFound("x".into()), StatusCode::NotFound, 404),
            (Error::Conflict("x".into()), StatusCode::AlreadyExists, 409),
            (Error::Forbidden("x".into()), StatusCode::PermissionDenied, 403),
            (Error::InvalidMetadata("x".into()), StatusCode::FailedPrecondition, 412),
            (Error::Transient("x".into()), StatusCode::Unavailable, 503),
            (Error::Internal("x".into()), StatusCode::Internal, 500),
        ];
        for (err, code, http) in cases {
            let status = map_error(&err);
            assert_eq!(status.code, code, "{err}");
            assert_eq!(status.http_status, http, "{err}");
        }
    }

    #[test]
    fn test_transient_details_are_hidden() {
        let status = map_error(&Error::Transient("dial tcp 10.0.0.1:443: i/o timeout".into()));
        assert_eq!(status.message, UNAVAILABLE_MESSAGE);
        assert!(!status.message.contains("10.0.0.1"));
    }

    #[test]
    fn test_specific_errors_keep_their_message() {
        let status = ApiStatus::from(&Error::InvalidInput("bad name 'x'".into()));
        assert_eq!(status.message, "bad name 'x'");
        assert_eq!(status.code.to_string(), "InvalidArgument");
    }
}
