// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::store::MemoryStore;

    fn parse(args: &[&str]) -> OperatorConfig {
        OperatorConfig::try_parse_from(std::iter::once("tenant-operator").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(
            config.controllers,
            vec![
                ControllerKind::Organization,
                ControllerKind::Project,
                ControllerKind::Site
            ]
        );
        assert_eq!(config.metrics_addr.port(), 8080);
        assert_eq!(config.queue_config(), QueueConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--workers",
            "8",
            "--debounce-ms",
            "50",
            "--max-retries",
            "3",
            "--log-format",
            "JSON",
            "--controllers",
            "site,project",
        ]);
        let controller = config.controller_config();
        assert_eq!(controller.workers, 8);
        assert_eq!(controller.queue.debounce, Duration::from_millis(50));
        assert_eq!(controller.queue.max_retries, 3);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.registrations::<MemoryStore>().len(), 2);
    }

    #[test]
    fn test_registrations_are_deduplicated() {
        let config = parse(&["--controllers", "site,site,organization"]);
        assert_eq!(config.registrations::<MemoryStore>().len(), 2);
    }

    #[test]
    fn test_unknown_controller_is_rejected() {
        let result = OperatorConfig::try_parse_from(["tenant-operator", "--controllers", "dns"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(parse(&["--workers", "0"]).validate().is_err());
        assert!(parse(&[
            "--initial-backoff-ms",
            "60000",
            "--max-backoff-secs",
            "1"
        ])
        .validate()
        .is_err());
        assert!(parse(&["--request-timeout-secs", "0"]).validate().is_err());
    }
}
