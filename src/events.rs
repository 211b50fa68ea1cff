// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes Event recording for tenant reconcilers.
//!
//! Reconcilers record one event per derived-object outcome on the parent
//! resource. Recording is fire-and-forget: [`EventRecorder::record`] is
//! synchronous, never fails, and never waits on the API server. Publishing
//! failures are only logged.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Event severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Routine progress
    Normal,
    /// Something went wrong
    Warning,
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Normal => EventType::Normal,
            EventKind::Warning => EventType::Warning,
        }
    }
}

/// Records events against parent resources.
pub trait EventRecorder: Send + Sync {
    /// Record an event. Must return immediately and never fail the caller.
    fn record(&self, reference: &ObjectReference, kind: EventKind, reason: &str, message: String);
}

/// Production recorder wrapping `kube::runtime::events::Recorder`.
///
/// Each event is published from its own task so reconcilers never wait on
/// the events API.
pub struct KubeEventRecorder {
    recorder: Recorder,
}

impl KubeEventRecorder {
    /// Create a recorder reporting as `controller_name`.
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

impl EventRecorder for KubeEventRecorder {
    fn record(&self, reference: &ObjectReference, kind: EventKind, reason: &str, message: String) {
        let recorder = self.recorder.clone();
        let reference = reference.clone();
        let event = Event {
            type_: kind.into(),
            reason: reason.to_string(),
            note: Some(message),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        tokio::spawn(async move {
            if let Err(e) = recorder.publish(&event, &reference).await {
                warn!(
                    reason = %event.reason,
                    object = ?reference.name,
                    error = %e,
                    "Failed to publish Kubernetes event"
                );
            }
        });
    }
}

/// Recorder that drops everything.
pub struct NoopEventRecorder;

impl EventRecorder for NoopEventRecorder {
    fn record(&self, _: &ObjectReference, _: EventKind, _: &str, _: String) {}
}

/// An event captured by [`CollectingEventRecorder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Kind of the object the event was recorded on
    pub object_kind: Option<String>,
    /// Namespace of the object the event was recorded on
    pub object_namespace: Option<String>,
    /// Name of the object the event was recorded on
    pub object_name: Option<String>,
    /// Severity
    pub kind: EventKind,
    /// Machine-readable reason
    pub reason: String,
    /// Human-readable message
    pub message: String,
}

/// Recorder that keeps events in memory, for tests and dry runs.
#[derive(Default)]
pub struct CollectingEventRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventRecorder {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events recorded on the object named `name`.
    #[must_use]
    pub fn events_for(&self, name: &str) -> Vec<RecordedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.object_name.as_deref() == Some(name))
            .collect()
    }
}

impl EventRecorder for CollectingEventRecorder {
    fn record(&self, reference: &ObjectReference, kind: EventKind, reason: &str, message: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                object_kind: reference.kind.clone(),
                object_namespace: reference.namespace.clone(),
                object_name: reference.name.clone(),
                kind,
                reason: reason.to_string(),
                message,
            });
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
